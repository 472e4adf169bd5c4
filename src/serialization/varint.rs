//! VarInt encoding/decoding
//!
//! Compact 1–9 byte encoding for unsigned counts and lengths:
//! - value < 0xfd: single byte
//! - value <= 0xffff: 0xfd prefix + 2 bytes little-endian
//! - value <= 0xffffffff: 0xfe prefix + 4 bytes little-endian
//! - otherwise: 0xff prefix + 8 bytes little-endian
//!
//! Decoding rejects non-minimal encodings so every value has exactly one
//! byte representation.

use crate::error::{LedgerError, Result};

/// Encode a u64 as a VarInt
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(value as u16).to_le_bytes());
        out
    } else if value <= 0xffff_ffff {
        let mut out = vec![0xfe];
        out.extend_from_slice(&(value as u32).to_le_bytes());
        out
    } else {
        let mut out = vec![0xff];
        out.extend_from_slice(&value.to_le_bytes());
        out
    }
}

/// Decode a VarInt from the front of `bytes`, returning the value and the
/// number of bytes consumed
pub fn decode_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| LedgerError::Serialization("empty varint".into()))?;

    let (value, consumed, minimum) = match first {
        0xfd => {
            let raw = take::<2>(bytes)?;
            (u16::from_le_bytes(raw) as u64, 3, 0xfd)
        }
        0xfe => {
            let raw = take::<4>(bytes)?;
            (u32::from_le_bytes(raw) as u64, 5, 0x1_0000)
        }
        0xff => {
            let raw = take::<8>(bytes)?;
            (u64::from_le_bytes(raw), 9, 0x1_0000_0000)
        }
        b => (b as u64, 1, 0),
    };

    if value < minimum {
        return Err(LedgerError::Serialization(format!(
            "non-minimal varint encoding for {value}"
        )));
    }
    Ok((value, consumed))
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    let payload = bytes
        .get(1..1 + N)
        .ok_or_else(|| LedgerError::Serialization("truncated varint".into()))?;
    let mut out = [0u8; N];
    out.copy_from_slice(payload);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_boundaries() {
        assert_eq!(encode_varint(0), vec![0]);
        assert_eq!(encode_varint(252), vec![252]);
        assert_eq!(encode_varint(253), vec![0xfd, 253, 0]);
        assert_eq!(encode_varint(65535), vec![0xfd, 255, 255]);
        assert_eq!(encode_varint(65536), vec![0xfe, 0, 0, 1, 0]);
        assert_eq!(
            encode_varint(u64::MAX),
            vec![0xff, 255, 255, 255, 255, 255, 255, 255, 255]
        );
    }

    #[test]
    fn test_decode_rejects_truncation() {
        assert!(decode_varint(&[]).is_err());
        assert!(decode_varint(&[0xfd, 1]).is_err());
        assert!(decode_varint(&[0xfe, 1, 2, 3]).is_err());
    }

    #[test]
    fn test_decode_rejects_non_minimal() {
        // 5 encoded with a 0xfd prefix
        assert!(decode_varint(&[0xfd, 5, 0]).is_err());
        // 300 encoded with a 0xfe prefix
        assert!(decode_varint(&[0xfe, 44, 1, 0, 0]).is_err());
    }
}
