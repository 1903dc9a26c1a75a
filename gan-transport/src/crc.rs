//! CRC-16/CCITT-FALSE, as used by the smart timer's state and time frames.

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT-FALSE: poly 0x1021, init 0xFFFF, no reflection, no final XOR.
static CRC16_CCITT_FALSE: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Compute the checksum over `data`.
pub fn checksum(data: &[u8]) -> u16 {
    CRC16_CCITT_FALSE.checksum(data)
}

/// Verify that `data` checksums to `expected`.
pub fn verify(data: &[u8], expected: u16) -> bool {
    checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value_matches_spec() {
        assert_eq!(checksum(b"123456789"), 0x29B1);
    }

    #[test]
    fn empty_input_is_the_init_value() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }
}
