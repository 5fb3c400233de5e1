use std::fmt;
use std::mem;

use bytes::{Bytes, BytesMut};
use http_body::Body;
use http_body_util::combinators::BoxBody;
use http_body_util::BodyExt;
use tracing::warn;

use crate::ensure;
use crate::error::{BodyDecodeError, BoxError};

/// ByteSource owns the raw payload of one request.
///
/// # Design Goals
///
/// 1. Hold the payload exactly once, whether it arrives buffered or as a
///    stream, and hand out zero-copy views afterwards
/// 2. Make the observed byte count authoritative: the transport's declared
///    length is advisory and never trusted for allocation or truncation
/// 3. Bound the drain so a lying or hostile peer cannot balloon memory
///
/// # Draining
///
/// [`read_all`](ByteSource::read_all) pulls the remaining frames from the
/// transport at most once. Later calls return the already materialized
/// bytes. A source whose drain failed stays failed; re-reading it reports
/// [`BodyDecodeError::SourceFailed`] instead of resuming mid-stream.
pub struct ByteSource {
    state: State,
    declared_len: Option<u64>,
}

enum State {
    /// Payload fully in memory.
    Ready(Bytes),
    /// Still to be pulled from the transport.
    Pending(BoxBody<Bytes, BoxError>),
    /// A drain was started and did not complete.
    Failed,
}

impl ByteSource {
    /// Wraps an already buffered payload. The declared length is the
    /// buffer's own length.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let declared_len = Some(bytes.len() as u64);
        Self { state: State::Ready(bytes), declared_len }
    }

    /// A source with no payload at all.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Wraps a streaming body, typically with the transport's
    /// `Content-Length` claim as `declared_len`.
    pub fn from_body<B>(body: B, declared_len: Option<u64>) -> Self
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self { state: State::Pending(BoxBody::new(body.map_err(Into::into))), declared_len }
    }

    /// Materializes the payload, pulling from the transport at most once.
    ///
    /// `max_bytes` caps the total drained size; crossing it aborts with
    /// [`BodyDecodeError::LimitExceeded`]. On success the full payload
    /// is returned and every later call is free.
    pub async fn read_all(&mut self, max_bytes: usize) -> Result<&Bytes, BodyDecodeError> {
        if matches!(self.state, State::Pending(_)) {
            let state = mem::replace(&mut self.state, State::Failed);
            if let State::Pending(body) = state {
                let observed = drain(body, self.declared_len, max_bytes).await?;
                if let Some(declared) = self.declared_len {
                    if declared != observed.len() as u64 {
                        warn!(declared, observed = observed.len(), "content-length disagrees with observed body");
                    }
                }
                self.state = State::Ready(observed);
            }
        }

        match &self.state {
            State::Ready(bytes) => Ok(bytes),
            State::Pending(_) | State::Failed => Err(BodyDecodeError::SourceFailed),
        }
    }

    /// Number of payload bytes actually observed. `None` until the
    /// source has been drained; never derived from the declared length.
    pub fn size(&self) -> Option<usize> {
        match &self.state {
            State::Ready(bytes) => Some(bytes.len()),
            State::Pending(_) | State::Failed => None,
        }
    }

    /// The transport's length claim, if it made one.
    pub fn declared_len(&self) -> Option<u64> {
        self.declared_len
    }

    /// The materialized payload, if [`read_all`](ByteSource::read_all)
    /// has completed.
    pub fn bytes(&self) -> Option<&Bytes> {
        match &self.state {
            State::Ready(bytes) => Some(bytes),
            State::Pending(_) | State::Failed => None,
        }
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Ready(bytes) => format!("ready({} bytes)", bytes.len()),
            State::Pending(_) => "pending".to_owned(),
            State::Failed => "failed".to_owned(),
        };
        f.debug_struct("ByteSource").field("state", &state).field("declared_len", &self.declared_len).finish()
    }
}

async fn drain(
    mut body: BoxBody<Bytes, BoxError>,
    declared_len: Option<u64>,
    max_bytes: usize,
) -> Result<Bytes, BodyDecodeError> {
    let capacity = declared_len.map_or(1024, |len| len.min(max_bytes as u64) as usize);
    let mut buffer = BytesMut::with_capacity(capacity);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(BodyDecodeError::read)?;
        if let Ok(data) = frame.into_data() {
            ensure!(
                buffer.len() + data.len() <= max_bytes,
                BodyDecodeError::limit_exceeded("max_body_bytes", max_bytes)
            );
            buffer.extend_from_slice(&data);
        }
    }

    Ok(buffer.freeze())
}
