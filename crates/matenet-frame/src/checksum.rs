/// Additive frame checksum: the port byte plus every payload byte, modulo 2^16.
///
/// The same function serves the encoder and the receiver. It catches
/// dropped or duplicated bytes and most single-bit flips, but a pair of
/// errors that cancel out in the sum goes unnoticed.
pub fn checksum(port: u8, payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(u16::from(port), |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_port() {
        assert_eq!(checksum(0x0A, &[]), 0x000A);
    }

    #[test]
    fn sums_port_and_payload() {
        assert_eq!(checksum(0x01, &[0x00, 0x08, 0x00, 0x00]), 0x0009);
        assert_eq!(checksum(0xFF, &[0xFF, 0xFF]), 0x02FD);
    }

    #[test]
    fn wraps_instead_of_saturating() {
        let payload = vec![0xFF; 300];
        let expected = (0x10u32 + 300 * 0xFF) % 65536;
        assert_eq!(checksum(0x10, &payload), expected as u16);

        let long = vec![0xFF; 258];
        // 0xFF * 258 + 0xFF = 0x101FD, wraps to 0x01FD
        assert_eq!(checksum(0xFF, &long), 0x01FD);
    }

    #[test]
    fn offsetting_errors_are_a_blind_spot() {
        // +1 on one byte and -1 on another leaves the sum unchanged.
        assert_eq!(checksum(0, &[0x10, 0x20]), checksum(0, &[0x11, 0x1F]));
    }
}
