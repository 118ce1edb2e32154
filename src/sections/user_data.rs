use log::{debug, warn};
use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::pel_values::BMC_CREATOR_ID;
use crate::plugins::user_data_plugin_name;
use crate::section_header::SectionHeader;
use crate::utils::hexdump_json;

/// Component id of BMC user data sections whose format the decoder knows natively.
pub const BMC_USER_DATA_COMPONENT: u16 = 0x2000;

/// Encodings of BMC user data, selected by the section sub type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDataFormat {
    Json,
    Cbor,
    Text,
}

impl UserDataFormat {
    pub fn from_sub_type(sub_type: u8) -> Option<Self> {
        match sub_type {
            1 => Some(UserDataFormat::Json),
            2 => Some(UserDataFormat::Cbor),
            3 => Some(UserDataFormat::Text),
            _ => None,
        }
    }
}

/// Free-form data attached by the creator of the PEL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData {
    pub header: SectionHeader,
    pub data: Vec<u8>,
}

impl UserData {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> Self {
        UserData {
            header,
            data: payload.to_vec(),
        }
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        merge_user_data(&mut out, &self.header, ctx.creator_id, &self.data, ctx);
        out
    }
}

fn trim_payload(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let start = data[..end]
        .iter()
        .position(|&b| !b.is_ascii_whitespace())
        .unwrap_or(end);
    &data[start..end]
}

fn printable_lines(data: &[u8]) -> Value {
    trim_payload(data)
        .split(|&b| b == b'\n')
        .map(|line| {
            line.iter()
                .map(|&b| if (0x20..=0x7E).contains(&b) { b as char } else { '.' })
                .collect::<String>()
        })
        .map(Value::from)
        .collect()
}

fn builtin_bmc_value(format: UserDataFormat, data: &[u8]) -> Value {
    match format {
        UserDataFormat::Json => match serde_json::from_slice::<Value>(trim_payload(data)) {
            Ok(value) => value,
            Err(e) => {
                warn!("BMC JSON user data does not parse, dumping it: {}", e);
                hexdump_json(data)
            }
        },
        UserDataFormat::Cbor => {
            debug!("CBOR user data is rendered as a hex dump");
            hexdump_json(data)
        }
        UserDataFormat::Text => printable_lines(data),
    }
}

/// Decode a user data payload and merge the result into `out`.
///
/// `creator_id` selects the plugin and is the embedded creator for extended user data.
/// Object results are merged field by field, anything else is stored under `Data`.
pub(crate) fn merge_user_data(
    out: &mut Map<String, Value>,
    header: &SectionHeader,
    creator_id: char,
    data: &[u8],
    ctx: &DecodeContext<'_>,
) {
    let builtin = (creator_id == BMC_CREATOR_ID && header.component_id == BMC_USER_DATA_COMPONENT)
        .then(|| UserDataFormat::from_sub_type(header.sub_type))
        .flatten();

    let value = match builtin {
        Some(format) => builtin_bmc_value(format, data),
        None => {
            let decoded = if ctx.allow_plugins {
                let name = user_data_plugin_name(creator_id, header.component_id);
                ctx.plugins
                    .decode_user_data(&name, header.sub_type, header.version, data)
            } else {
                None
            };
            decoded.unwrap_or_else(|| hexdump_json(data))
        }
    };

    match value {
        Value::Object(fields) => out.extend(fields),
        other => {
            out.insert("Data".into(), other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, header};
    use super::*;
    use crate::component_names::ComponentNames;
    use crate::err::PluginResult;
    use crate::plugins::{PluginCache, PluginRegistry};
    use crate::section_header::SectionId;
    use serde_json::json;
    use std::sync::Arc;

    fn decode(creator_id: char, sub_type: u8, component_id: u16, data: &[u8], ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let ud = UserData::from_payload(header(SectionId::USER_DATA, data.len(), sub_type, component_id), data);
        ud.to_json(&DecodeContext { creator_id, ..*ctx })
    }

    #[test]
    fn test_bmc_json_is_merged() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 1, 0x2000, b"{\"PID\": \"1234\", \"Callouts\": 2}\n\0\0\0", &ctx);
        assert_eq!(json["PID"], "1234");
        assert_eq!(json["Callouts"], 2);
        assert!(!json.contains_key("Data"));
    }

    #[test]
    fn test_bmc_json_array_goes_under_data() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 1, 0x2000, b"[1, 2]\0", &ctx);
        assert_eq!(json["Data"], json!([1, 2]));
    }

    #[test]
    fn test_bmc_invalid_json_falls_back_to_hexdump() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 1, 0x2000, b"{not json", &ctx);
        assert_eq!(json["Data"], hexdump_json(b"{not json"));
    }

    #[test]
    fn test_bmc_text_lines() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 3, 0x2000, b"journal line 1\nbell\x07 line\ttwo\n\0\0", &ctx);
        assert_eq!(json["Data"], json!(["journal line 1", "bell. line.two"]));
    }

    #[test]
    fn test_bmc_cbor_is_hexdumped() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 2, 0x2000, &[0xA1, 0x61, 0x61, 0x01], &ctx);
        assert_eq!(json["Data"], hexdump_json(&[0xA1, 0x61, 0x61, 0x01]));
    }

    #[test]
    fn test_plugin_result_is_merged() {
        let registry = PluginRegistry::new().with_user_data_parser(
            "oe500",
            |sub_type: u8, _version: u8, data: &[u8]| -> PluginResult<String> {
                Ok(format!(r#"{{"Sub": {}, "Size": {}}}"#, sub_type, data.len()))
            },
        );
        let plugins = PluginCache::new(Arc::new(registry));
        let names = ComponentNames::new();
        let mut ctx = context('O', &plugins, &names);

        let json = decode('O', 4, 0xE500, &[1, 2, 3], &ctx);
        assert_eq!(json["Sub"], 4);
        assert_eq!(json["Size"], 3);

        ctx.allow_plugins = false;
        let json = decode('O', 4, 0xE500, &[1, 2, 3], &ctx);
        assert_eq!(json["Data"], hexdump_json(&[1, 2, 3]));
    }

    #[test]
    fn test_unknown_bmc_sub_type_uses_plugin_path() {
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let ctx = context('O', &plugins, &names);

        let json = decode('O', 9, 0x2000, &[0xFF], &ctx);
        assert_eq!(json["Data"], hexdump_json(&[0xFF]));
        assert_eq!(plugins.load_attempts(), 1);
    }
}
