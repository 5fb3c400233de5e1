//! `application/x-www-form-urlencoded` decoding.

use crate::ensure;
use crate::error::BodyDecodeError;
use crate::form::{FieldValue, Fields};
use crate::limits::DecodeLimits;

/// Decodes an urlencoded payload into [`Fields`], keeping wire order.
///
/// Percent escapes and `+` for space are resolved; a key without `=`
/// decodes to an empty value. Following the form-urlencoded processing
/// model, a stray `%` stays literal and escape sequences that are not
/// valid UTF-8 decode with replacement characters.
///
/// # Errors
///
/// Returns [`BodyDecodeError::LimitExceeded`] if the pair count exceeds
/// [`DecodeLimits::get_max_fields`], or
/// [`BodyDecodeError::MalformedUrlencoded`] if the payload does not
/// deserialize into pairs.
pub fn decode_urlencoded(payload: &[u8], limits: &DecodeLimits) -> Result<Fields, BodyDecodeError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(payload).map_err(BodyDecodeError::malformed_urlencoded)?;
    ensure!(
        pairs.len() <= limits.get_max_fields(),
        BodyDecodeError::limit_exceeded("max_fields", limits.get_max_fields())
    );

    let mut fields = Fields::default();
    for (name, value) in pairs {
        fields.push(name, FieldValue::Text(value));
    }
    Ok(fields)
}
