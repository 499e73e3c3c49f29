//! CRC-32 as used by the compressed-RTF header.
//!
//! Same polynomial as IEEE 802.3 (reflected `0xEDB88320`) but with a zero
//! initial value and no final inversion, so general-purpose CRC crates give
//! different results.

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

/// Compute the checksum of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &b| {
        TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_known_payload() {
        // Payload of the "WXYZ" example stream, CRC 0x514BD4E2.
        let payload = [
            0x41, 0x00, 0x04, 0x20, 0x57, 0x58, 0x59, 0x5A, 0x0D, 0x6E, 0x7D, 0x01, 0x0E, 0xB0,
        ];
        assert_eq!(checksum(&payload), 0x514B_D4E2);
    }
}
