use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::err::DeserializationResult;
use crate::section_header::SectionHeader;
use crate::utils::ByteCursor;

/// Machine type/model and serial number of the enclosure that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailingMtms {
    pub header: SectionHeader,
    pub machine_type_model: String,
    pub serial_number: String,
}

impl FailingMtms {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);
        let machine_type_model = cursor.ascii(8, "machine type model")?;
        let serial_number = cursor.ascii(12, "serial number")?;

        Ok(FailingMtms {
            header,
            machine_type_model,
            serial_number,
        })
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        out.insert(
            "Machine Type Model".into(),
            self.machine_type_model.as_str().into(),
        );
        out.insert("Serial Number".into(), self.serial_number.as_str().into());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, header};
    use super::*;
    use crate::component_names::ComponentNames;
    use crate::plugins::PluginCache;
    use crate::section_header::SectionId;

    #[test]
    fn test_failing_mtms() {
        let mut payload = b"9105-22A".to_vec();
        payload.extend_from_slice(b"1322ABC\0\0\0\0\0");
        let mtms =
            FailingMtms::from_payload(header(SectionId::FAILING_MTMS, 20, 0, 0x2000), &payload)
                .unwrap();

        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let json = mtms.to_json(&context('O', &plugins, &names));
        assert_eq!(json["Machine Type Model"], "9105-22A");
        assert_eq!(json["Serial Number"], "1322ABC");
    }

    #[test]
    fn test_short_payload_is_truncated() {
        let payload = b"9105-22A1322".to_vec();
        assert!(
            FailingMtms::from_payload(header(SectionId::FAILING_MTMS, 12, 0, 0x2000), &payload)
                .is_err()
        );
    }
}
