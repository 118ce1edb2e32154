use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::section_header::SectionHeader;
use crate::utils::hexdump_json;

/// A section without a dedicated decoder, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opaque {
    pub header: SectionHeader,
    pub data: Vec<u8>,
}

impl Opaque {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> Self {
        Opaque {
            header,
            data: payload.to_vec(),
        }
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        out.insert("Data".into(), hexdump_json(&self.data));
        out
    }
}
