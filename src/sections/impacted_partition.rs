use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::err::DeserializationResult;
use crate::section_header::SectionHeader;
use crate::utils::ByteCursor;

/// Logical partitions affected by the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactedPartition {
    pub header: SectionHeader,
    pub primary_partition_id: u16,
    pub name_length: u8,
    pub target_count: u8,
    pub log_id: u32,
    pub primary_partition_name: String,
    pub target_partitions: Vec<u16>,
}

impl ImpactedPartition {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);

        let primary_partition_id = cursor.u16_named("primary partition id")?;
        let name_length = cursor.u8_named("partition name length")?;
        let target_count = cursor.u8_named("target partition count")?;
        let log_id = cursor.u32_named("partition log id")?;
        let primary_partition_name = cursor.ascii(usize::from(name_length), "partition name")?;

        let target_partitions = (0..target_count)
            .map(|_| cursor.u16_named("target partition id"))
            .collect::<DeserializationResult<Vec<_>>>()?;

        Ok(ImpactedPartition {
            header,
            primary_partition_id,
            name_length,
            target_count,
            log_id,
            primary_partition_name,
            target_partitions,
        })
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        out.insert(
            "Primary Partition ID".into(),
            format!("0x{:04X}", self.primary_partition_id).into(),
        );
        out.insert("Length of LP Name".into(), self.name_length.into());
        out.insert("Target LP Count".into(), self.target_count.into());
        out.insert(
            "Logical Partition Log ID".into(),
            format!("0x{:08X}", self.log_id).into(),
        );
        out.insert(
            "Primary Partition Name".into(),
            self.primary_partition_name.as_str().into(),
        );
        out.insert(
            "Target LP".into(),
            self.target_partitions
                .iter()
                .map(|id| Value::from(format!("0x{:04X}", id)))
                .collect(),
        );
        out
    }
}
