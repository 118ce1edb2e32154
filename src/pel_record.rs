use hashbrown::HashMap;
use log::trace;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::err::DeserializationResult;
use crate::private_header::PrivateHeader;
use crate::section_header::{SectionHeader, SectionId};
use crate::sections::{DecodeContext, DecodedSection, Src, decode_section};
use crate::user_header::UserHeader;
use crate::utils::{BcdTime, ByteCursor};

/// The ids a PEL can be looked up by, available without decoding past the Private Header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PelIdentity {
    pub entry_id: u32,
    pub platform_log_id: u32,
    pub bmc_log_id: u32,
    pub creator_id: char,
    #[serde(serialize_with = "serialize_display")]
    pub committed_at: BcdTime,
    pub section_count: u8,
}

fn serialize_display<S: serde::Serializer>(
    value: &impl std::fmt::Display,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

impl From<&PrivateHeader> for PelIdentity {
    fn from(ph: &PrivateHeader) -> Self {
        PelIdentity {
            entry_id: ph.entry_id,
            platform_log_id: ph.platform_log_id,
            bmc_log_id: ph.bmc_log_id,
            creator_id: ph.creator_id,
            committed_at: ph.committed_at,
            section_count: ph.section_count,
        }
    }
}

/// A fully decoded PEL.
#[derive(Debug, Clone, PartialEq)]
pub struct PelRecord {
    pub private_header: PrivateHeader,
    pub user_header: UserHeader,
    /// Every section after the User Header, in stream order.
    pub sections: Vec<DecodedSection>,
    /// The rendered document, keyed by (possibly suffixed) section name.
    pub data: Map<String, Value>,
}

impl PelRecord {
    pub fn identity(&self) -> PelIdentity {
        PelIdentity::from(&self.private_header)
    }

    pub fn primary_src(&self) -> Option<&Src> {
        self.sections.iter().find_map(|section| match section {
            DecodedSection::PrimarySrc(src) => Some(src),
            _ => None,
        })
    }

    pub fn to_json_string(&self, indent: bool) -> serde_json::Result<String> {
        if indent {
            serde_json::to_string_pretty(&self.data)
        } else {
            serde_json::to_string(&self.data)
        }
    }

    pub fn into_json_value(self) -> Value {
        Value::Object(self.data)
    }
}

/// Read the mandatory Private Header and User Header from the start of a record.
pub(crate) fn read_headers(
    cursor: &mut ByteCursor<'_>,
) -> DeserializationResult<(PrivateHeader, UserHeader)> {
    let private_header = read_private_header(cursor)?;
    let (header, payload) = SectionHeader::read_expected(cursor, SectionId::USER_HEADER)?;
    let user_header = UserHeader::from_payload(header, payload)?;
    Ok((private_header, user_header))
}

pub(crate) fn read_private_header(cursor: &mut ByteCursor<'_>) -> DeserializationResult<PrivateHeader> {
    let (header, payload) = SectionHeader::read_expected(cursor, SectionId::PRIVATE_HEADER)?;
    PrivateHeader::from_payload(header, payload)
}

/// Decode the `section_count - 2` sections following the User Header.
pub(crate) fn read_sections(
    cursor: &mut ByteCursor<'_>,
    private_header: &PrivateHeader,
) -> DeserializationResult<Vec<DecodedSection>> {
    let remaining = usize::from(private_header.section_count).saturating_sub(2);
    let mut sections = Vec::with_capacity(remaining);

    for _ in 0..remaining {
        let (header, payload) = SectionHeader::read_with_payload(cursor)?;
        sections.push(decode_section(header, payload)?);
    }

    if !cursor.is_empty() {
        trace!("{} trailing bytes after the last section", cursor.remaining());
    }

    Ok(sections)
}

/// Build the ordered document of a record.
///
/// A name that occurs more than once gets every occurrence suffixed with its index among
/// the sections of that name, `User Data 0`, `User Data 1` and so on.
pub fn assemble(fragments: Vec<(&'static str, Map<String, Value>)>) -> Map<String, Value> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for (name, _) in &fragments {
        *totals.entry(*name).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Map::new();
    for (name, fragment) in fragments {
        let key = if totals[name] > 1 {
            let index = seen.entry(name).or_default();
            let key = format!("{} {}", name, index);
            *index += 1;
            key
        } else {
            name.to_string()
        };
        out.insert(key, Value::Object(fragment));
    }
    out
}

pub(crate) fn render(
    private_header: PrivateHeader,
    user_header: UserHeader,
    sections: Vec<DecodedSection>,
    ctx: &DecodeContext<'_>,
) -> PelRecord {
    let mut fragments = Vec::with_capacity(sections.len() + 2);
    fragments.push(("Private Header", private_header.to_json(ctx.names)));
    fragments.push((
        "User Header",
        user_header.to_json(ctx.creator_id, ctx.names),
    ));
    fragments.extend(
        sections
            .iter()
            .map(|section| (section.name(), section.to_json(ctx))),
    );

    PelRecord {
        private_header,
        user_header,
        sections,
        data: assemble(fragments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fragment(n: u64) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("n".into(), n.into());
        m
    }

    #[test]
    fn test_duplicate_names_are_all_suffixed() {
        let doc = assemble(vec![
            ("Private Header", fragment(0)),
            ("User Header", fragment(1)),
            ("User Data", fragment(2)),
            ("Primary SRC", fragment(3)),
            ("User Data", fragment(4)),
            ("User Data", fragment(5)),
        ]);

        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "Private Header",
                "User Header",
                "User Data 0",
                "Primary SRC",
                "User Data 1",
                "User Data 2"
            ]
        );
        assert_eq!(doc["User Data 2"], json!({"n": 5}));
    }

    #[test]
    fn test_unique_names_are_not_suffixed() {
        let doc = assemble(vec![("Private Header", fragment(0)), ("User Header", fragment(1))]);
        assert!(doc.contains_key("Private Header"));
        assert!(doc.contains_key("User Header"));
    }
}
