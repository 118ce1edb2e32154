//! Creator/component specific payload decoders.
//!
//! Vendor payloads (user data, BMC SRC words) are opaque to the core decoder. A plugin is
//! resolved by a string key derived from the creator and component that produced the
//! section; the key is looked up in a [`PluginSource`] and the result, positive or negative,
//! is cached by a [`PluginCache`] for the lifetime of the parser.
//!
//! A missing plugin is the common case, not an error: the section is rendered opaquely
//! (a hex dump for user data, nothing for SRCs).

mod cache;
mod registry;

pub use self::cache::PluginCache;
pub use self::registry::PluginRegistry;

use std::sync::Arc;

use crate::err::PluginResult;

/// Decoder for a user data payload.
pub trait UserDataParser: Send + Sync {
    /// Returns the payload as a JSON document string.
    ///
    /// A JSON object is merged into the section; any other value is stored under `Data`.
    fn parse(&self, sub_type: u8, version: u8, data: &[u8]) -> PluginResult<String>;
}

/// Decoder for the words of a BMC created SRC.
pub trait SrcParser: Send + Sync {
    /// `words` holds hex words 2 through 9, each rendered as 8 upper-case hex digits.
    ///
    /// Returns a JSON string whose object members are appended to the SRC section, or `None`
    /// when there is nothing to add.
    fn parse(&self, reference_code: &str, words: &[String; 8]) -> PluginResult<Option<String>>;
}

impl<F> UserDataParser for F
where
    F: Fn(u8, u8, &[u8]) -> PluginResult<String> + Send + Sync,
{
    fn parse(&self, sub_type: u8, version: u8, data: &[u8]) -> PluginResult<String> {
        self(sub_type, version, data)
    }
}

impl<F> SrcParser for F
where
    F: Fn(&str, &[String; 8]) -> PluginResult<Option<String>> + Send + Sync,
{
    fn parse(&self, reference_code: &str, words: &[String; 8]) -> PluginResult<Option<String>> {
        self(reference_code, words)
    }
}

/// Where plugins are loaded from.
///
/// Loading must be pure: two loads of the same name are interchangeable, so concurrent
/// redundant loads are harmless.
pub trait PluginSource: Send + Sync {
    fn load_user_data_parser(&self, name: &str) -> PluginResult<Arc<dyn UserDataParser>>;
    fn load_src_parser(&self, name: &str) -> PluginResult<Arc<dyn SrcParser>>;
}

/// Key of the user data plugin for `creator_id` and `component_id`, e.g. `oe500`.
pub fn user_data_plugin_name(creator_id: char, component_id: u16) -> String {
    format!("{}{:04x}", creator_id.to_ascii_lowercase(), component_id)
}

/// Key of the SRC plugin for a BMC created reference code.
///
/// The component is the third byte of the reference code (`BD8D1002` -> `o1000`). Hostboot
/// termination SRCs (`BC...`) created by the BMC are routed to the hostboot parser, `bsrc`.
pub fn src_plugin_name(reference_code: &str) -> Option<String> {
    if reference_code.starts_with("BC") {
        return Some("bsrc".to_string());
    }
    let component = reference_code.get(4..6)?;
    Some(format!("o{}00", component.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_plugin_names() {
        assert_eq!(user_data_plugin_name('O', 0xE500), "oe500");
        assert_eq!(user_data_plugin_name('M', 0x2C00), "m2c00");
        assert_eq!(user_data_plugin_name('B', 0x0005), "b0005");
    }

    #[test]
    fn test_src_plugin_names() {
        assert_eq!(src_plugin_name("BD8D1002").as_deref(), Some("o1000"));
        assert_eq!(src_plugin_name("BD50E510").as_deref(), Some("oe500"));
        assert_eq!(src_plugin_name("BC8A090F").as_deref(), Some("bsrc"));
        assert_eq!(src_plugin_name("BD8D"), None);
    }
}
