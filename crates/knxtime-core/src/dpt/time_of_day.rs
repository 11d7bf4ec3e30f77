use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// DPT 10.001 time of day: three octets, the weekday in the top three bits
/// of the first (0 = no day, 1 = Monday .. 7 = Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DptTimeOfDay {
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DptTimeOfDay {
    pub const WIRE_LEN: usize = 3;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.weekday > 7 || self.hour > 23 || self.minute > 59 || self.second > 59 {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_all(&[self.weekday << 5 | self.hour, self.minute, self.second])
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.read_exact(Self::WIRE_LEN)?;
        let out = Self {
            weekday: bytes[0] >> 5,
            hour: bytes[0] & 0x1F,
            minute: bytes[1],
            second: bytes[2],
        };
        if out.hour > 23 || out.minute > 59 || out.second > 59 {
            return Err(DecodeError::InvalidValue);
        }
        Ok(out)
    }
}
