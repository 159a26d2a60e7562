//! Heavy decompression stage for large embedded payloads.
//!
//! Packed payloads start with [`PACKED_MAGIC`] followed by a flag byte that
//! says how the rest is stored. Anything without the magic is a raw payload.

use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use photon_config::HeavyDecoderConfig;

use crate::error::DecodeError;

/// Marks a packed payload.
pub const PACKED_MAGIC: [u8; 4] = *b"PHZ\0";

/// Packing flag: the rest of the payload is stored as-is.
pub const PACKED_FLAG_NONE: u8 = 0x00;

/// Packing flag: the rest of the payload is a size-prepended LZ4 block.
pub const PACKED_FLAG_LZ4: u8 = 0x01;

const HEADER_LEN: usize = PACKED_MAGIC.len() + 1;

/// Decompresses embedded payloads of files above the heavy-decode threshold.
pub trait HeavyDecoder: Send + Sync {
    /// Point the decoder at its resources before first use.
    fn configure(&self, locations: &HeavyDecoderConfig);

    /// Expand `payload` to its declared `expected_len` bytes.
    fn decode_payload(&self, payload: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError>;
}

/// Wrap `data` in a packed header, LZ4-compressing it when `compress` is set.
pub fn pack_payload(data: &[u8], compress: bool) -> Vec<u8> {
    let body = if compress {
        compress_prepend_size(data)
    } else {
        data.to_vec()
    };
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&PACKED_MAGIC);
    out.push(if compress {
        PACKED_FLAG_LZ4
    } else {
        PACKED_FLAG_NONE
    });
    out.extend_from_slice(&body);
    out
}

/// LZ4 heavy decoder for packed payloads.
///
/// Raw payloads pass through unchanged; their length is checked later when
/// they are merged and assembled.
#[derive(Debug, Default)]
pub struct Lz4HeavyDecoder;

impl HeavyDecoder for Lz4HeavyDecoder {
    fn configure(&self, locations: &HeavyDecoderConfig) {
        tracing::debug!(
            module = %locations.module_location,
            binary = %locations.binary_location,
            fallback = %locations.fallback_location,
            "heavy decoder configured"
        );
    }

    fn decode_payload(&self, payload: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
        let Some(rest) = payload.strip_prefix(&PACKED_MAGIC) else {
            return Ok(payload.to_vec());
        };
        let Some((&flag, body)) = rest.split_first() else {
            return Err(DecodeError::Heavy("packed payload has no flag byte".into()));
        };
        let decoded = match flag {
            PACKED_FLAG_NONE => body.to_vec(),
            PACKED_FLAG_LZ4 => decompress_size_prepended(body)
                .map_err(|e| DecodeError::Heavy(e.to_string()))?,
            flag => return Err(DecodeError::Heavy(format!("unknown packing flag {flag:#04x}"))),
        };
        if decoded.len() != expected_len {
            return Err(DecodeError::Truncated {
                expected: expected_len,
                actual: decoded.len(),
            });
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bytes LZ4 cannot shrink.
    fn noise(len: usize) -> Vec<u8> {
        let mut state = 0x9e37_79b9_u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as u8
            })
            .collect()
    }

    #[test]
    fn test_compressed_payload_expands() {
        let raw = vec![7u8; 4096];
        let packed = pack_payload(&raw, true);
        assert!(packed.len() < raw.len());
        assert_eq!(Lz4HeavyDecoder.decode_payload(&packed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn test_incompressible_payload_is_still_decoded() {
        let raw = noise(256);
        let packed = pack_payload(&raw, true);
        assert!(packed.len() > raw.len());
        assert_eq!(Lz4HeavyDecoder.decode_payload(&packed, raw.len()).unwrap(), raw);
    }

    #[test]
    fn test_stored_payload_is_unwrapped() {
        let raw = noise(64);
        let packed = pack_payload(&raw, false);
        assert_eq!(Lz4HeavyDecoder.decode_payload(&packed, 64).unwrap(), raw);
    }

    #[test]
    fn test_raw_payload_passes_through() {
        let raw = b"already plain".to_vec();
        assert_eq!(Lz4HeavyDecoder.decode_payload(&raw, raw.len()).unwrap(), raw);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let packed = pack_payload(&[1u8; 32], true);
        assert!(matches!(
            Lz4HeavyDecoder.decode_payload(&packed, 40),
            Err(DecodeError::Truncated { expected: 40, actual: 32 })
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let mut packed = PACKED_MAGIC.to_vec();
        packed.extend_from_slice(&[PACKED_FLAG_LZ4, 16, 0, 0, 0, 0xff]);
        assert!(matches!(
            Lz4HeavyDecoder.decode_payload(&packed, 16),
            Err(DecodeError::Heavy(_))
        ));
    }

    #[test]
    fn test_unknown_flag_and_missing_flag_are_rejected() {
        let mut packed = PACKED_MAGIC.to_vec();
        assert!(Lz4HeavyDecoder.decode_payload(&packed, 0).is_err());
        packed.push(0x7f);
        assert!(matches!(
            Lz4HeavyDecoder.decode_payload(&packed, 0),
            Err(DecodeError::Heavy(_))
        ));
    }
}
