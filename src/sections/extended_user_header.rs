use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::err::DeserializationResult;
use crate::section_header::SectionHeader;
use crate::utils::{BcdTime, ByteCursor};

/// Firmware levels and symptom id of the system that reported the PEL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedUserHeader {
    pub header: SectionHeader,
    pub machine_type_model: String,
    pub serial_number: String,
    pub server_fw_version: String,
    pub subsystem_fw_version: String,
    pub reference_time: BcdTime,
    pub symptom_id_size: u8,
    pub symptom_id: String,
}

impl ExtendedUserHeader {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);

        let machine_type_model = cursor.ascii(8, "machine type model")?;
        let serial_number = cursor.ascii(12, "serial number")?;
        let server_fw_version = cursor.ascii(16, "server firmware version")?;
        let subsystem_fw_version = cursor.ascii(16, "subsystem firmware version")?;
        cursor.advance(4, "extended user header reserved")?;
        let reference_time = BcdTime::read(&mut cursor, "reference time")?;
        cursor.advance(3, "extended user header reserved")?;
        let symptom_id_size = cursor.u8_named("symptom id size")?;
        let symptom_id = cursor.ascii(usize::from(symptom_id_size), "symptom id")?;

        Ok(ExtendedUserHeader {
            header,
            machine_type_model,
            serial_number,
            server_fw_version,
            subsystem_fw_version,
            reference_time,
            symptom_id_size,
            symptom_id,
        })
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        out.insert(
            "Reporting Machine Type".into(),
            self.machine_type_model.as_str().into(),
        );
        out.insert(
            "Reporting Serial Number".into(),
            self.serial_number.trim().into(),
        );
        out.insert(
            "FW Released Ver".into(),
            self.server_fw_version.as_str().into(),
        );
        out.insert(
            "FW SubSys Version".into(),
            self.subsystem_fw_version.as_str().into(),
        );
        out.insert(
            "Common Ref Time".into(),
            self.reference_time.to_string().into(),
        );
        out.insert("Symptom Id Len".into(), self.symptom_id_size.into());
        out.insert("Symptom Id".into(), self.symptom_id.as_str().into());
        out
    }
}
