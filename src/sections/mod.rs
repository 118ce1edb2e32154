//! Decoders for the sections following the two mandatory headers.

mod default;
mod ext_user_data;
mod extended_user_header;
mod failing_mtms;
mod impacted_partition;
mod src;
mod user_data;

pub use self::default::Opaque;
pub use self::ext_user_data::ExtUserData;
pub use self::extended_user_header::ExtendedUserHeader;
pub use self::failing_mtms::FailingMtms;
pub use self::impacted_partition::ImpactedPartition;
pub use self::src::{Callout, FruIdentity, Src};
pub use self::user_data::{UserData, UserDataFormat};

use serde_json::{Map, Value};

use crate::component_names::ComponentNames;
use crate::err::DeserializationResult;
use crate::message_registry::MessageRegistry;
use crate::plugins::PluginCache;
use crate::private_header::PrivateHeader;
use crate::section_header::{SectionHeader, SectionId};
use crate::user_header::UserHeader;

/// Everything a section decoder may consult besides its own bytes.
#[derive(Clone, Copy)]
pub struct DecodeContext<'p> {
    /// Creator of the PEL, from the Private Header.
    pub creator_id: char,
    pub allow_plugins: bool,
    pub plugins: &'p PluginCache,
    pub names: &'p ComponentNames,
    pub registry: Option<&'p MessageRegistry>,
}

impl DecodeContext<'_> {
    pub(crate) fn component_name(&self, component_id: u16, creator_id: char) -> String {
        self.names.display_name(component_id, creator_id)
    }
}

/// The leading fields shared by every non-header fragment.
pub(crate) fn common_fields(
    header: &SectionHeader,
    creator_id: char,
    ctx: &DecodeContext<'_>,
) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("Section Version".into(), header.version.into());
    out.insert("Sub-section type".into(), header.sub_type.into());
    out.insert(
        "Created by".into(),
        ctx.component_name(header.component_id, creator_id).into(),
    );
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedSection {
    PrivateHeader(PrivateHeader),
    UserHeader(UserHeader),
    PrimarySrc(Src),
    SecondarySrc(Src),
    ExtendedUserHeader(ExtendedUserHeader),
    FailingMtms(FailingMtms),
    UserData(UserData),
    ExtUserData(ExtUserData),
    ImpactedPartition(ImpactedPartition),
    Default(Opaque),
}

impl DecodedSection {
    pub fn header(&self) -> &SectionHeader {
        match self {
            DecodedSection::PrivateHeader(s) => &s.header,
            DecodedSection::UserHeader(s) => &s.header,
            DecodedSection::PrimarySrc(s) | DecodedSection::SecondarySrc(s) => &s.header,
            DecodedSection::ExtendedUserHeader(s) => &s.header,
            DecodedSection::FailingMtms(s) => &s.header,
            DecodedSection::UserData(s) => &s.header,
            DecodedSection::ExtUserData(s) => &s.header,
            DecodedSection::ImpactedPartition(s) => &s.header,
            DecodedSection::Default(s) => &s.header,
        }
    }

    /// Fragment name, the key of this section in the decoded document.
    pub fn name(&self) -> &'static str {
        self.header().id.name()
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        match self {
            DecodedSection::PrivateHeader(s) => s.to_json(ctx.names),
            DecodedSection::UserHeader(s) => s.to_json(ctx.creator_id, ctx.names),
            DecodedSection::PrimarySrc(s) | DecodedSection::SecondarySrc(s) => s.to_json(ctx),
            DecodedSection::ExtendedUserHeader(s) => s.to_json(ctx),
            DecodedSection::FailingMtms(s) => s.to_json(ctx),
            DecodedSection::UserData(s) => s.to_json(ctx),
            DecodedSection::ExtUserData(s) => s.to_json(ctx),
            DecodedSection::ImpactedPartition(s) => s.to_json(ctx),
            DecodedSection::Default(s) => s.to_json(ctx),
        }
    }
}

/// Dispatch a section to its decoder by id.
///
/// Unknown ids are never an error: they decode to an opaque hex dump so that PELs carrying
/// newer section types still render.
pub fn decode_section(header: SectionHeader, payload: &[u8]) -> DeserializationResult<DecodedSection> {
    let section = match header.id {
        SectionId::PRIMARY_SRC => DecodedSection::PrimarySrc(Src::from_payload(header, payload)?),
        SectionId::SECONDARY_SRC => {
            DecodedSection::SecondarySrc(Src::from_payload(header, payload)?)
        }
        SectionId::EXTENDED_USER_HEADER => DecodedSection::ExtendedUserHeader(
            ExtendedUserHeader::from_payload(header, payload)?,
        ),
        SectionId::FAILING_MTMS => {
            DecodedSection::FailingMtms(FailingMtms::from_payload(header, payload)?)
        }
        SectionId::EXT_USER_DATA => {
            DecodedSection::ExtUserData(ExtUserData::from_payload(header, payload)?)
        }
        SectionId::USER_DATA => DecodedSection::UserData(UserData::from_payload(header, payload)),
        SectionId::IMPACTED_PARTITION => {
            DecodedSection::ImpactedPartition(ImpactedPartition::from_payload(header, payload)?)
        }
        _ => DecodedSection::Default(Opaque::from_payload(header, payload)),
    };
    Ok(section)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn header(id: SectionId, payload_len: usize, sub_type: u8, component_id: u16) -> SectionHeader {
        SectionHeader {
            id,
            length: (payload_len + crate::section_header::SECTION_HEADER_SIZE) as u16,
            version: 1,
            sub_type,
            component_id,
        }
    }

    pub(crate) fn context<'p>(
        creator_id: char,
        plugins: &'p PluginCache,
        names: &'p ComponentNames,
    ) -> DecodeContext<'p> {
        DecodeContext {
            creator_id,
            allow_plugins: true,
            plugins,
            names,
            registry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_unknown_ids_use_default_decoder() {
        let payload = [0xca, 0xfe];
        for id in [SectionId::DUMP_LOCATION, SectionId(0x7A7A)] {
            let section = decode_section(header(id, payload.len(), 0, 0x1000), &payload).unwrap();
            assert!(matches!(section, DecodedSection::Default(_)));
        }
    }

    #[test]
    fn test_dispatches_known_ids() {
        let payload = vec![0_u8; 20];
        let section =
            decode_section(header(SectionId::FAILING_MTMS, 20, 0, 0x2000), &payload).unwrap();
        assert_eq!(section.name(), "Failing MTMS");

        let section = decode_section(header(SectionId::USER_DATA, 20, 1, 0x2000), &payload).unwrap();
        assert!(matches!(section, DecodedSection::UserData(_)));
    }

    #[test]
    fn test_fragments_start_with_common_fields() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let section = decode_section(header(SectionId::CALL_HOME, 4, 7, 0x2A00), &[1, 2, 3, 4]).unwrap();
        let json = section.to_json(&ctx);
        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(keys[..3], ["Section Version", "Sub-section type", "Created by"]);
        assert_eq!(json["Sub-section type"], 7);
        assert_eq!(json["Created by"], "2A00");
    }
}
