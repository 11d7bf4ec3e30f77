use crate::encoding::{Reader, Writer};
use crate::{DecodeError, EncodeError};

/// DPT 11.001 date: three octets day/month/year, the year windowed to two
/// digits over 1990–2089.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DptDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl DptDate {
    pub const WIRE_LEN: usize = 3;

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if !(1990..=2089).contains(&self.year)
            || !(1..=12).contains(&self.month)
            || !(1..=31).contains(&self.day)
        {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_all(&[self.day, self.month, (self.year % 100) as u8])
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.read_exact(Self::WIRE_LEN)?;
        let day = bytes[0] & 0x1F;
        let month = bytes[1] & 0x0F;
        let year = (bytes[2] & 0x7F) as u16;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) || year > 99 {
            return Err(DecodeError::InvalidValue);
        }
        let year = if year >= 90 { 1900 + year } else { 2000 + year };
        Ok(Self { year, month, day })
    }
}

#[cfg(test)]
mod tests {
    use super::DptDate;
    use crate::encoding::{Reader, Writer};
    use crate::DecodeError;

    #[test]
    fn roundtrips_and_windows_the_year() {
        let date = DptDate {
            year: 2024,
            month: 7,
            day: 1,
        };
        let mut buf = [0u8; 3];
        let mut w = Writer::new(&mut buf);
        date.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[1, 7, 24]);
        assert_eq!(DptDate::decode(&mut Reader::new(&buf)).unwrap(), date);

        // Two-digit years 90..99 belong to the twentieth century.
        let decoded = DptDate::decode(&mut Reader::new(&[15, 6, 95])).unwrap();
        assert_eq!(decoded.year, 1995);
    }

    #[test]
    fn rejects_zero_day_and_month() {
        assert_eq!(
            DptDate::decode(&mut Reader::new(&[0, 7, 24])).unwrap_err(),
            DecodeError::InvalidValue
        );
        assert_eq!(
            DptDate::decode(&mut Reader::new(&[1, 0, 24])).unwrap_err(),
            DecodeError::InvalidValue
        );
    }
}
