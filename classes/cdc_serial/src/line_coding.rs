//! Serial port settings exchanged through the CDC class requests
use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Size of the line coding structure on the wire
pub const LINE_CODING_SIZE: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum StopBits {
    One = 0,
    OnePointFive = 1,
    Two = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum Parity {
    None = 0,
    Odd = 1,
    Even = 2,
    Mark = 3,
    Space = 4,
}

/// Data rate and character framing of the emulated port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCoding {
    /// Bits per second
    pub data_rate: u32,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub data_bits: u8,
}

impl Default for LineCoding {
    fn default() -> Self {
        Self {
            data_rate: 115_200,
            stop_bits: StopBits::One,
            parity: Parity::None,
            data_bits: 8,
        }
    }
}

impl LineCoding {
    /// `None` unless `bytes` is a complete structure with known codes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < LINE_CODING_SIZE {
            return None;
        }
        let data_bits = bytes[6];
        if !matches!(data_bits, 5..=8 | 16) {
            return None;
        }
        Some(Self {
            data_rate: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            stop_bits: StopBits::from_u8(bytes[4])?,
            parity: Parity::from_u8(bytes[5])?,
            data_bits,
        })
    }

    pub fn to_bytes(&self) -> [u8; LINE_CODING_SIZE] {
        let rate = self.data_rate.to_le_bytes();
        [
            rate[0],
            rate[1],
            rate[2],
            rate[3],
            self.stop_bits as u8,
            self.parity as u8,
            self.data_bits,
        ]
    }
}

bitflags! {
    /// Modem control signals set by SET_CONTROL_LINE_STATE
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ControlLineState: u16 {
        const DTR = 1 << 0;
        const RTS = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_115200_8n1() {
        assert_eq!(LineCoding::default().to_bytes(), [0x00, 0xC2, 0x01, 0x00, 0, 0, 8]);
    }

    #[test]
    fn parses_host_settings() {
        let coding = LineCoding::from_bytes(&[0x80, 0x25, 0x00, 0x00, 2, 2, 7]).unwrap();
        assert_eq!(coding.data_rate, 9600);
        assert_eq!(coding.stop_bits, StopBits::Two);
        assert_eq!(coding.parity, Parity::Even);
        assert_eq!(coding.data_bits, 7);
    }

    #[test]
    fn rejects_short_and_unknown_settings() {
        assert_eq!(LineCoding::from_bytes(&[0x80, 0x25, 0x00, 0x00, 0, 0]), None);
        assert_eq!(LineCoding::from_bytes(&[0x80, 0x25, 0x00, 0x00, 3, 0, 8]), None);
        assert_eq!(LineCoding::from_bytes(&[0x80, 0x25, 0x00, 0x00, 0, 5, 8]), None);
        assert_eq!(LineCoding::from_bytes(&[0x80, 0x25, 0x00, 0x00, 0, 0, 9]), None);
    }

    #[test]
    fn control_lines_ignore_reserved_bits() {
        assert_eq!(
            ControlLineState::from_bits_truncate(0xFF03),
            ControlLineState::DTR | ControlLineState::RTS
        );
    }
}
