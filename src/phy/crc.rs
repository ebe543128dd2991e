// CRC32 (IEEE) for frame integrity checking, plus MSB-first bit helpers

use crc32fast::Hasher;

/// Calculate the CRC32-IEEE checksum of the given payload
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verify CRC32 checksum
pub fn verify_crc32(data: &[u8], expected_crc: u32) -> bool {
    calculate_crc32(data) == expected_crc
}

/// Convert byte to bit array (MSB first)
pub fn byte_to_bits(byte: u8) -> [bool; 8] {
    let mut bits = [false; 8];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> (7 - i)) & 1 == 1;
    }
    bits
}

/// Convert bytes to an MSB-first bit stream
pub fn bytes_to_bits(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    bytes
        .iter()
        .flat_map(|&byte| byte_to_bits(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_values() {
        // Standard check value for CRC-32/ISO-HDLC
        assert_eq!(calculate_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(calculate_crc32(b"HELLO WORLD"), 2279966299);
        assert_eq!(calculate_crc32(&[]), 0);
    }

    #[test]
    fn test_crc32_detects_modification() {
        let data = b"Hello, World!";
        let crc = calculate_crc32(data);
        assert!(verify_crc32(data, crc));

        let mut modified = data.to_vec();
        modified[0] = b'h';
        assert!(!verify_crc32(&modified, crc));
    }

    #[test]
    fn test_bit_conversion() {
        let bits = byte_to_bits(0b1011_0011);
        assert_eq!(bits, [true, false, true, true, false, false, true, true]);
    }

    #[test]
    fn test_bytes_to_bits_order() {
        let bits: Vec<bool> = bytes_to_bits(&[0x80, 0x01]).collect();
        assert_eq!(bits.len(), 16);
        assert!(bits[0]);
        assert!(bits[1..15].iter().all(|b| !b));
        assert!(bits[15]);
    }
}
