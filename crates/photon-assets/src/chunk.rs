//! Fixed-size payload slicing.

use photon_config::ConfigError;

/// Split `buffer` into consecutive slices of `chunk_size` bytes.
///
/// The last slice may be shorter. An empty buffer yields no chunks.
pub fn split_chunks(buffer: &[u8], chunk_size: usize) -> Result<Vec<&[u8]>, ConfigError> {
    if chunk_size == 0 {
        return Err(ConfigError::invalid(
            "loader.chunk_size_bytes",
            "chunk size must be greater than zero",
        ));
    }
    Ok(buffer.chunks(chunk_size).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_reassemble_to_input() {
        let buffer: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        for size in [1, 7, 256, 999, 1000, 4096] {
            let chunks = split_chunks(&buffer, size).unwrap();
            assert_eq!(chunks.len(), buffer.len().div_ceil(size));
            assert_eq!(chunks.concat(), buffer);
        }
    }

    #[test]
    fn test_final_chunk_is_shorter() {
        let chunks = split_chunks(&[0u8; 10], 4).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_empty_buffer_has_no_chunks() {
        assert!(split_chunks(&[], 512).unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunk_size_is_config_error() {
        assert!(matches!(
            split_chunks(b"abc", 0),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
