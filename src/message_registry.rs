use std::path::Path;

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::err::{PelError, Result};

#[derive(Debug, Clone, Deserialize)]
struct RegistryFile {
    #[serde(rename = "PELs", default)]
    pels: Vec<RegistryEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistryEntry {
    #[serde(rename = "SRC")]
    src: RegistrySrc,
    #[serde(rename = "Documentation")]
    documentation: RegistryDocumentation,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistrySrc {
    #[serde(rename = "ReasonCode")]
    reason_code: Option<String>,
    #[serde(rename = "Type")]
    src_type: Option<String>,
    #[serde(rename = "Words6To9", default)]
    words_6_to_9: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct RegistryDocumentation {
    #[serde(rename = "Message")]
    message: String,
    #[serde(rename = "MessageArgSources")]
    message_arg_sources: Option<Value>,
}

/// The BMC message registry, used to explain the reason code of BMC created SRCs.
#[derive(Debug, Clone, Default)]
pub struct MessageRegistry {
    entries: Vec<RegistryEntry>,
}

impl MessageRegistry {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json(&text).map_err(|source| PelError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "Loaded {} message registry entries from {}",
            registry.entries.len(),
            path.display()
        );
        Ok(registry)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let file: RegistryFile = serde_json::from_str(text)?;
        Ok(MessageRegistry { entries: file.pels })
    }

    /// Look up `reason_code` (e.g. `0x2030`) among entries of SRC type `src_type` (e.g. `BD`).
    ///
    /// Entries without a `Type` are `BD` entries. Returns `None` if nothing matches.
    pub fn error_details(&self, reason_code: &str, src_type: &str) -> Option<Map<String, Value>> {
        let entry = self.entries.iter().find(|entry| {
            let Some(code) = entry.src.reason_code.as_deref() else {
                return false;
            };
            let entry_type = entry.src.src_type.as_deref().unwrap_or("BD");
            entry_type == src_type && code.eq_ignore_ascii_case(reason_code)
        })?;

        let mut out = Map::new();
        out.insert(
            "Message".to_string(),
            Value::from(entry.documentation.message.clone()),
        );
        if let Some(sources) = &entry.documentation.message_arg_sources {
            out.insert("MessageArgSources".to_string(), sources.clone());
        }
        if let Some(words) = entry.src.words_6_to_9.as_ref().filter(|w| !is_empty(w)) {
            out.insert("Words6To9".to_string(), words.clone());
        }
        Some(out)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REGISTRY: &str = r#"{
        "PELs": [
            {
                "Name": "xyz.openbmc_project.Sensor.Error.Fan",
                "SRC": { "ReasonCode": "0x2030", "Words6To9": {} },
                "Documentation": { "Message": "Fan failed", "MessageArgSources": ["SRCWord6"] }
            },
            {
                "Name": "xyz.openbmc_project.Power.Error.Fault",
                "SRC": { "ReasonCode": "0x2030", "Type": "11" },
                "Documentation": { "Message": "Power fault" }
            },
            {
                "Name": "no.reason.code",
                "SRC": {},
                "Documentation": { "Message": "unused" }
            }
        ]
    }"#;

    #[test]
    fn test_matches_code_and_type() {
        let registry = MessageRegistry::from_json(REGISTRY).unwrap();

        let details = registry.error_details("0x2030", "BD").unwrap();
        assert_eq!(
            Value::Object(details),
            json!({"Message": "Fan failed", "MessageArgSources": ["SRCWord6"]})
        );

        let details = registry.error_details("0x2030", "11").unwrap();
        assert_eq!(details["Message"], json!("Power fault"));

        assert!(registry.error_details("0x9999", "BD").is_none());
    }
}
