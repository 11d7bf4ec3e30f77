use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// Status bits of DPT 19.001, octet 7 of the wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const FAULT: u8 = 0x80;
    pub const WORKING_DAY: u8 = 0x40;
    pub const NO_WORKING_DAY: u8 = 0x20;
    pub const NO_YEAR: u8 = 0x10;
    pub const NO_DATE: u8 = 0x08;
    pub const NO_DAY_OF_WEEK: u8 = 0x04;
    pub const NO_TIME: u8 = 0x02;
    pub const SUMMERTIME: u8 = 0x01;

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    pub const fn with(self, mask: u8) -> Self {
        Self(self.0 | mask)
    }

    pub const fn without(self, mask: u8) -> Self {
        Self(self.0 & !mask)
    }

    /// Whether the frame carries no usable timestamp: faulted, or missing
    /// its year, date, or time.
    pub const fn is_unusable(self) -> bool {
        self.contains(Self::FAULT | Self::NO_YEAR | Self::NO_DATE | Self::NO_TIME)
    }
}

/// DPT 19.001 date-time: eight octets carrying a full timestamp plus the
/// status byte and a clock-quality byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DptDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 0 = any day, 1 = Monday .. 7 = Sunday.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub flags: StatusFlags,
    /// Octet 8 verbatim: clock quality and synchronisation source bits.
    pub quality: u8,
}

impl DptDateTime {
    pub const WIRE_LEN: usize = 8;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if !(1900..=2155).contains(&self.year)
            || !(1..=12).contains(&self.month)
            || !(1..=31).contains(&self.day)
            || self.weekday > 7
            || self.hour > 23
            || self.minute > 59
            || self.second > 59
        {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_all(&[
            (self.year - 1900) as u8,
            self.month,
            self.day,
            self.weekday << 5 | self.hour,
            self.minute,
            self.second,
            self.flags.bits(),
            self.quality,
        ])
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.read_exact(Self::WIRE_LEN)?;
        let out = Self {
            year: 1900 + bytes[0] as u16,
            month: bytes[1] & 0x0F,
            day: bytes[2] & 0x1F,
            weekday: bytes[3] >> 5,
            hour: bytes[3] & 0x1F,
            minute: bytes[4],
            second: bytes[5],
            flags: StatusFlags::new(bytes[6]),
            quality: bytes[7],
        };
        // Field ranges are validated only when the flags claim the fields are
        // present; an unusable frame still decodes so the flags can be seen.
        if out.flags.is_unusable() {
            return Ok(out);
        }
        if !(1..=12).contains(&out.month)
            || !(1..=31).contains(&out.day)
            || out.hour > 23
            || out.minute > 59
            || out.second > 59
        {
            return Err(DecodeError::InvalidValue);
        }
        Ok(out)
    }
}
