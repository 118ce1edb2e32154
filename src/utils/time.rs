use jiff::civil::DateTime;
use log::debug;

use crate::err::DeserializationResult;
use crate::utils::ByteCursor;

/// An 8-byte BCD timestamp, as stored in the Private Header and Extended User Header.
///
/// Layout: year (2 bytes BCD), month, day, hour, minutes, seconds, hundredths (1 byte BCD each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BcdTime {
    raw: [u8; 8],
}

fn from_bcd(b: u8) -> Option<u8> {
    let (hi, lo) = (b >> 4, b & 0x0F);
    if hi > 9 || lo > 9 {
        return None;
    }
    Some(hi * 10 + lo)
}

impl BcdTime {
    pub fn from_bytes(raw: [u8; 8]) -> Self {
        BcdTime { raw }
    }

    pub(crate) fn read(cursor: &mut ByteCursor<'_>, what: &'static str) -> DeserializationResult<Self> {
        Ok(BcdTime::from_bytes(cursor.array::<8>(what)?))
    }

    pub fn raw(&self) -> [u8; 8] {
        self.raw
    }

    /// The timestamp as a calendar date time, if the BCD digits form a valid one.
    pub fn to_datetime(&self) -> Option<DateTime> {
        let century = from_bcd(self.raw[0])?;
        let year = from_bcd(self.raw[1])?;
        let hundredths = from_bcd(self.raw[7])?;

        DateTime::new(
            i16::from(century) * 100 + i16::from(year),
            from_bcd(self.raw[2])? as i8,
            from_bcd(self.raw[3])? as i8,
            from_bcd(self.raw[4])? as i8,
            from_bcd(self.raw[5])? as i8,
            from_bcd(self.raw[6])? as i8,
            i32::from(hundredths) * 10_000_000,
        )
        .ok()
    }
}

/// Renders as `MM/DD/YYYY HH:MM:SS`.
///
/// Firmware occasionally writes zeroed or garbage timestamps; those are rendered from the raw
/// BCD nibbles instead of failing the record.
impl std::fmt::Display for BcdTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.strftime("%m/%d/%Y %H:%M:%S")),
            None => {
                debug!("timestamp {:02X?} is not a valid calendar date", self.raw);
                let r = &self.raw;
                write!(
                    f,
                    "{:02X}/{:02X}/{:02X}{:02X} {:02X}:{:02X}:{:02X}",
                    r[2], r[3], r[0], r[1], r[4], r[5], r[6]
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formats_valid_timestamp() {
        let t = BcdTime::from_bytes([0x20, 0x23, 0x06, 0x14, 0x09, 0x41, 0x27, 0x50]);
        assert_eq!(t.to_string(), "06/14/2023 09:41:27");
        assert_eq!(t.to_datetime().unwrap().year(), 2023);
    }

    #[test]
    fn test_formats_zeroed_timestamp_from_raw_digits() {
        let t = BcdTime::from_bytes([0; 8]);
        assert!(t.to_datetime().is_none());
        assert_eq!(t.to_string(), "00/00/0000 00:00:00");
    }
}
