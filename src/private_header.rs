use serde_json::{Map, Value};

use crate::component_names::ComponentNames;
use crate::err::{DeserializationError, DeserializationResult};
use crate::pel_values::creator_name;
use crate::section_header::SectionHeader;
use crate::utils::{BcdTime, ByteCursor, ascii_field};

pub const PRIVATE_HEADER_PAYLOAD_SIZE: usize = 40;

/// The first section of every PEL: record identity and the number of sections that follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateHeader {
    pub header: SectionHeader,
    pub created_at: BcdTime,
    pub committed_at: BcdTime,
    pub creator_id: char,
    pub log_type: u8,
    /// Total number of sections in the PEL, including this one.
    pub section_count: u8,
    pub bmc_log_id: u32,
    pub creator_version: [u8; 8],
    pub platform_log_id: u32,
    pub entry_id: u32,
}

impl PrivateHeader {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);

        let created_at = BcdTime::read(&mut cursor, "create timestamp")?;
        let committed_at = BcdTime::read(&mut cursor, "commit timestamp")?;
        let creator_id = cursor.u8_named("creator id")? as char;
        let log_type = cursor.u8_named("log type")?;
        let _reserved = cursor.u8_named("private header reserved")?;
        let section_count = cursor.u8_named("section count")?;
        let bmc_log_id = cursor.u32_named("bmc log id")?;
        let creator_version = cursor.array::<8>("creator version")?;
        let platform_log_id = cursor.u32_named("platform log id")?;
        let entry_id = cursor.u32_named("entry id")?;

        if section_count < 2 {
            return Err(DeserializationError::InvalidSectionCount {
                count: section_count,
            });
        }

        Ok(PrivateHeader {
            header,
            created_at,
            committed_at,
            creator_id,
            log_type,
            section_count,
            bmc_log_id,
            creator_version,
            platform_log_id,
            entry_id,
        })
    }

    pub fn creator_version(&self) -> String {
        ascii_field(&self.creator_version)
    }

    pub fn to_json(&self, names: &ComponentNames) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("Section Version".into(), self.header.version.into());
        out.insert("Sub-section type".into(), self.header.sub_type.into());
        out.insert(
            "Created by".into(),
            names
                .display_name(self.header.component_id, self.creator_id)
                .into(),
        );
        out.insert("Created at".into(), self.created_at.to_string().into());
        out.insert("Committed at".into(), self.committed_at.to_string().into());
        out.insert(
            "Creator Subsystem".into(),
            creator_name(self.creator_id).into(),
        );
        out.insert("CSSVER".into(), self.creator_version().into());
        out.insert(
            "Platform Log Id".into(),
            format!("0x{:08X}", self.platform_log_id).into(),
        );
        out.insert("Entry Id".into(), format!("0x{:08X}", self.entry_id).into());
        out.insert("BMC Event Log Id".into(), self.bmc_log_id.to_string().into());
        out
    }
}
