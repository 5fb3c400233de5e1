//! Caps applied while materializing and decoding request bodies.
//!
//! Every length that an attacker controls is checked against one of
//! these limits before it is trusted: the whole payload, the number of
//! multipart parts, a single part's payload and header block, and the
//! number of urlencoded pairs.

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_MAX_PARTS: usize = 128;
const DEFAULT_MAX_PART_BYTES: usize = 1024 * 1024;
const DEFAULT_MAX_PART_HEADER_BYTES: usize = 8 * 1024;
const DEFAULT_MAX_FIELDS: usize = 256;

/// Decode-time caps, builder style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    max_body_bytes: usize,
    max_parts: usize,
    max_part_bytes: usize,
    max_part_header_bytes: usize,
    max_fields: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_parts: DEFAULT_MAX_PARTS,
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            max_part_header_bytes: DEFAULT_MAX_PART_HEADER_BYTES,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl DecodeLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on the materialized payload as a whole.
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Cap on the number of multipart parts.
    pub fn max_parts(mut self, max: usize) -> Self {
        self.max_parts = max;
        self
    }

    /// Cap on a single part's payload.
    pub fn max_part_bytes(mut self, max: usize) -> Self {
        self.max_part_bytes = max;
        self
    }

    /// Cap on a single part's header block.
    pub fn max_part_header_bytes(mut self, max: usize) -> Self {
        self.max_part_header_bytes = max;
        self
    }

    /// Cap on the number of urlencoded pairs.
    pub fn max_fields(mut self, max: usize) -> Self {
        self.max_fields = max;
        self
    }

    pub fn get_max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn get_max_parts(&self) -> usize {
        self.max_parts
    }

    pub fn get_max_part_bytes(&self) -> usize {
        self.max_part_bytes
    }

    pub fn get_max_part_header_bytes(&self) -> usize {
        self.max_part_header_bytes
    }

    pub fn get_max_fields(&self) -> usize {
        self.max_fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_one_cap_at_a_time() {
        let limits = DecodeLimits::new().max_parts(2).max_part_bytes(64);
        assert_eq!(limits.get_max_parts(), 2);
        assert_eq!(limits.get_max_part_bytes(), 64);
        assert_eq!(limits.get_max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
    }
}
