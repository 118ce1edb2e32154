use serde_json::{Map, Value};

use super::user_data::merge_user_data;
use super::{DecodeContext, common_fields};
use crate::err::DeserializationResult;
use crate::section_header::SectionHeader;
use crate::utils::ByteCursor;

/// User data carrying its own creator id, for sections added by a subsystem other than the
/// creator of the PEL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtUserData {
    pub header: SectionHeader,
    pub creator_id: char,
    pub data: Vec<u8>,
}

impl ExtUserData {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);
        let creator_id = char::from(cursor.u8_named("extended user data creator")?);
        cursor.advance(3, "extended user data reserved")?;

        Ok(ExtUserData {
            header,
            creator_id,
            data: cursor.rest().to_vec(),
        })
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, self.creator_id, ctx);
        merge_user_data(&mut out, &self.header, self.creator_id, &self.data, ctx);
        out
    }
}
