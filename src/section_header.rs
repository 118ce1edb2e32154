use std::fmt;

use log::trace;

use crate::err::{DeserializationError, DeserializationResult};
use crate::utils::ByteCursor;

pub const SECTION_HEADER_SIZE: usize = 8;

/// A section tag: two ASCII characters packed big-endian into 16 bits (`PH` == `0x5048`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(pub u16);

impl SectionId {
    pub const PRIVATE_HEADER: SectionId = SectionId::from_tag(*b"PH");
    pub const USER_HEADER: SectionId = SectionId::from_tag(*b"UH");
    pub const PRIMARY_SRC: SectionId = SectionId::from_tag(*b"PS");
    pub const SECONDARY_SRC: SectionId = SectionId::from_tag(*b"SS");
    pub const EXTENDED_USER_HEADER: SectionId = SectionId::from_tag(*b"EH");
    pub const FAILING_MTMS: SectionId = SectionId::from_tag(*b"MT");
    pub const DUMP_LOCATION: SectionId = SectionId::from_tag(*b"DH");
    pub const FIRMWARE_ERROR: SectionId = SectionId::from_tag(*b"SW");
    pub const IMPACTED_PARTITION: SectionId = SectionId::from_tag(*b"LP");
    pub const LOGICAL_RESOURCE: SectionId = SectionId::from_tag(*b"LR");
    pub const HMC_ID: SectionId = SectionId::from_tag(*b"HM");
    pub const EPOW: SectionId = SectionId::from_tag(*b"EP");
    pub const IO_EVENT: SectionId = SectionId::from_tag(*b"IE");
    pub const MFG_INFO: SectionId = SectionId::from_tag(*b"MI");
    pub const CALL_HOME: SectionId = SectionId::from_tag(*b"CH");
    pub const USER_DATA: SectionId = SectionId::from_tag(*b"UD");
    pub const ENV_INFO: SectionId = SectionId::from_tag(*b"EI");
    pub const EXT_USER_DATA: SectionId = SectionId::from_tag(*b"ED");

    pub const fn from_tag(tag: [u8; 2]) -> Self {
        SectionId(u16::from_be_bytes(tag))
    }

    pub fn tag(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// The display name used as the section's key in the decoded document.
    pub fn name(self) -> &'static str {
        match &self.tag() {
            b"PH" => "Private Header",
            b"UH" => "User Header",
            b"PS" => "Primary SRC",
            b"SS" => "Secondary SRC",
            b"EH" => "Extended User Header",
            b"MT" => "Failing MTMS",
            b"DH" => "Dump Location",
            b"SW" => "Firmware Error",
            b"LP" => "Impacted Partition",
            b"LR" => "Logical Resource",
            b"HM" => "HMC ID",
            b"EP" => "EPOW",
            b"IE" => "IO Event",
            b"MI" => "MFG Info",
            b"CH" => "Call Home",
            b"UD" => "User Data",
            b"EI" => "Env Info",
            b"ED" => "Extended User Data",
            _ => "Unknown",
        }
    }
}

impl fmt::Debug for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b] = self.tag();
        if a.is_ascii_graphic() && b.is_ascii_graphic() {
            write!(f, "SectionId({}{})", a as char, b as char)
        } else {
            write!(f, "SectionId(0x{:04X})", self.0)
        }
    }
}

/// The 8-byte header present at the start of every section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub id: SectionId,
    /// Total section length, including this header.
    pub length: u16,
    pub version: u8,
    pub sub_type: u8,
    pub component_id: u16,
}

impl SectionHeader {
    pub(crate) fn read(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        let offset = cursor.position();
        let id = SectionId(cursor.u16_named("section id")?);
        let length = cursor.u16_named("section length")?;
        let version = cursor.u8_named("section version")?;
        let sub_type = cursor.u8_named("section sub type")?;
        let component_id = cursor.u16_named("section component id")?;

        if usize::from(length) < SECTION_HEADER_SIZE {
            return Err(DeserializationError::InvalidSectionLength { offset, length });
        }

        trace!(
            "Offset {}: section {:?}, {} bytes, version {}, sub type {}, component 0x{:04X}",
            offset, id, length, version, sub_type, component_id
        );

        Ok(SectionHeader {
            id,
            length,
            version,
            sub_type,
            component_id,
        })
    }

    /// Read the header and slice out its `length - 8` payload bytes.
    pub(crate) fn read_with_payload<'a>(
        cursor: &mut ByteCursor<'a>,
    ) -> DeserializationResult<(Self, &'a [u8])> {
        let header = Self::read(cursor)?;
        let payload = cursor.take_bytes(header.payload_len(), "section payload")?;
        Ok((header, payload))
    }

    /// Like [`SectionHeader::read_with_payload`], but the section must carry `expected`.
    pub(crate) fn read_expected<'a>(
        cursor: &mut ByteCursor<'a>,
        expected: SectionId,
    ) -> DeserializationResult<(Self, &'a [u8])> {
        let (header, payload) = Self::read_with_payload(cursor)?;
        if header.id != expected {
            return Err(DeserializationError::UnexpectedSection {
                what: if expected == SectionId::PRIVATE_HEADER {
                    "first"
                } else {
                    "second"
                },
                expected: expected.name(),
                found: header.id.0,
            });
        }
        Ok((header, payload))
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length).saturating_sub(SECTION_HEADER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_pack_big_endian() {
        assert_eq!(SectionId::PRIVATE_HEADER.0, 0x5048);
        assert_eq!(SectionId::EXT_USER_DATA.0, 0x4544);
        assert_eq!(SectionId(0x4D54).name(), "Failing MTMS");
        assert_eq!(SectionId(0x1234).name(), "Unknown");
    }

    #[test]
    fn test_reads_header_and_payload() {
        let data = [0x55, 0x44, 0x00, 0x0C, 0x01, 0x03, 0x20, 0x00, 0xde, 0xad, 0xbe, 0xef, 0xff];
        let mut cursor = ByteCursor::new(&data);

        let (header, payload) = SectionHeader::read_with_payload(&mut cursor).unwrap();
        assert_eq!(
            header,
            SectionHeader {
                id: SectionId::USER_DATA,
                length: 12,
                version: 1,
                sub_type: 3,
                component_id: 0x2000,
            }
        );
        assert_eq!(payload, &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_rejects_length_below_header_size() {
        let data = [0x55, 0x44, 0x00, 0x04, 0x01, 0x01, 0x00, 0x00];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            SectionHeader::read(&mut cursor),
            Err(DeserializationError::InvalidSectionLength { length: 4, .. })
        ));
    }

    #[test]
    fn test_payload_len_of_undersized_header_is_zero() {
        let header = SectionHeader {
            id: SectionId::USER_DATA,
            length: 4,
            version: 1,
            sub_type: 1,
            component_id: 0x2000,
        };
        assert_eq!(header.payload_len(), 0);
    }

    #[test]
    fn test_short_buffer_is_truncated() {
        let data = [0x50, 0x48, 0x00, 0x30, 0x01];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            SectionHeader::read(&mut cursor),
            Err(DeserializationError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unexpected_mandatory_section() {
        let data = [0x55, 0x48, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00];
        let mut cursor = ByteCursor::new(&data);
        assert!(matches!(
            SectionHeader::read_expected(&mut cursor, SectionId::PRIVATE_HEADER),
            Err(DeserializationError::UnexpectedSection { found: 0x5548, .. })
        ));
    }
}
