//! Tensor codec: conversions between raw little-endian byte buffers and
//! typed arrays, and between text and protocol command bytes.
//!
//! All functions are pure and hold no state; they are safe to call from
//! any number of threads.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Decode a little-endian buffer into `i32` values.
///
/// The buffer length must be a multiple of 4; anything else is rejected
/// with [`Error::InvalidLength`] rather than silently truncated.
pub fn bytes_to_i32_le(bytes: &[u8]) -> Result<Vec<i32>> {
    check_width(bytes, 4)?;
    Ok(bytes.chunks_exact(4).map(LittleEndian::read_i32).collect())
}

/// Decode a little-endian buffer into IEEE-754 single-precision values.
///
/// Same length contract as [`bytes_to_i32_le`].
pub fn bytes_to_f32_le(bytes: &[u8]) -> Result<Vec<f32>> {
    check_width(bytes, 4)?;
    Ok(bytes.chunks_exact(4).map(LittleEndian::read_f32).collect())
}

/// Encode `i32` values as little-endian bytes.
pub fn i32_to_bytes_le(values: &[i32]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * 4];
    LittleEndian::write_i32_into(values, &mut buf);
    buf
}

/// Encode `f32` values as little-endian bytes.
pub fn f32_to_bytes_le(values: &[f32]) -> Vec<u8> {
    let mut buf = vec![0u8; values.len() * 4];
    LittleEndian::write_f32_into(values, &mut buf);
    buf
}

/// Encode text as one byte per Unicode code point (low byte only).
///
/// This is not UTF-8: code points above U+00FF are truncated, so the
/// function is only safe for ASCII/Latin-1 input. It exists for the
/// protocol's command sentinels ("START"/"STOP"), which are ASCII.
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

fn check_width(bytes: &[u8], width: usize) -> Result<()> {
    if bytes.len() % width != 0 {
        return Err(Error::InvalidLength {
            len: bytes.len(),
            width,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_round_trip() {
        let values = vec![0, 1, -1, i32::MAX, i32::MIN, 42_000_000];
        let bytes = i32_to_bytes_le(&values);
        assert_eq!(bytes.len(), values.len() * 4);
        assert_eq!(bytes_to_i32_le(&bytes).unwrap(), values);
    }

    #[test]
    fn test_f32_round_trip_bit_exact() {
        let values = vec![0.0f32, -0.0, 0.87, 1.5e-30, f32::MAX, f32::MIN_POSITIVE];
        let decoded = bytes_to_f32_le(&f32_to_bytes_le(&values)).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (a, b) in values.iter().zip(&decoded) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_known_little_endian_layout() {
        // 1.0f32 is 0x3F800000
        assert_eq!(f32_to_bytes_le(&[1.0]), vec![0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(bytes_to_i32_le(&[0x01, 0x00, 0x00, 0x00]).unwrap(), vec![1]);
    }

    #[test]
    fn test_invalid_length_is_an_error_not_truncation() {
        for len in [1, 2, 3, 5, 7] {
            let err = bytes_to_f32_le(&vec![0u8; len]).unwrap_err();
            match err {
                Error::InvalidLength { len: l, width } => {
                    assert_eq!(l, len);
                    assert_eq!(width, 4);
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(bytes_to_i32_le(&vec![0u8; len]).is_err());
        }
    }

    #[test]
    fn test_empty_buffer_decodes_to_empty() {
        assert!(bytes_to_i32_le(&[]).unwrap().is_empty());
        assert!(bytes_to_f32_le(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_text_to_bytes_is_deterministic() {
        assert_eq!(text_to_bytes("AB"), vec![65, 66]);
        assert_eq!(text_to_bytes("START"), b"START".to_vec());
        assert_eq!(text_to_bytes(""), Vec::<u8>::new());
    }
}
