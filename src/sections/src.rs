use log::trace;
use serde_json::{Map, Value};

use super::{DecodeContext, common_fields};
use crate::err::DeserializationResult;
use crate::pel_values::{BMC_CREATOR_ID, callout_priority_name, failing_component_type_name};
use crate::plugins::src_plugin_name;
use crate::section_header::SectionHeader;
use crate::utils::{ByteCursor, ascii_field};

const ADDITIONAL_SECTIONS: u8 = 0x01;
const HYP_DUMP_INIT: u8 = 0x04;
const I5OS_SERVICE_EVENT: u8 = 0x10;
const VIRTUAL_PROGRESS_SRC: u8 = 0x80;

const TERMINATE_FW_ERROR: u32 = 0x2000_0000;
const DECONFIGURED: u32 = 0x0200_0000;
const GUARDED: u32 = 0x0100_0000;

const CALLOUT_HAS_FRU_IDENTITY: u8 = 0x08;

const FRU_PART_NUMBER: u8 = 0x08;
const FRU_CCIN: u8 = 0x04;
const FRU_PROCEDURE: u8 = 0x02;
const FRU_SERIAL_NUMBER: u8 = 0x01;

const REFERENCE_CODE_SIZE: usize = 32;

fn bool_string(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Field replaceable unit identity of a callout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FruIdentity {
    pub flags: u8,
    pub part_number: Option<String>,
    pub procedure: Option<String>,
    pub ccin: Option<String>,
    pub serial_number: Option<String>,
}

impl FruIdentity {
    fn read(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        let _type = cursor.u16_named("FRU identity type")?;
        let size = cursor.u8_named("FRU identity size")?;
        let flags = cursor.u8_named("FRU identity flags")?;

        let body = cursor.take_bytes(usize::from(size).saturating_sub(4), "FRU identity")?;
        let mut body = ByteCursor::new(body);

        let mut fru = FruIdentity {
            flags,
            ..FruIdentity::default()
        };
        if flags & FRU_PART_NUMBER != 0 {
            fru.part_number = Some(body.ascii(8, "FRU part number")?);
        } else if flags & FRU_PROCEDURE != 0 {
            fru.procedure = Some(body.ascii(8, "FRU procedure")?);
        }
        if flags & FRU_CCIN != 0 {
            fru.ccin = Some(body.ascii(4, "FRU CCIN")?);
        }
        if flags & FRU_SERIAL_NUMBER != 0 {
            fru.serial_number = Some(body.ascii(12, "FRU serial number")?);
        }
        Ok(fru)
    }

    fn insert_json(&self, out: &mut Map<String, Value>) {
        out.insert(
            "FRU Type".into(),
            failing_component_type_name(self.flags).into(),
        );
        if let Some(pn) = &self.part_number {
            out.insert("Part Number".into(), pn.as_str().into());
        }
        if let Some(procedure) = &self.procedure {
            out.insert("Procedure".into(), procedure.as_str().into());
        }
        if let Some(ccin) = &self.ccin {
            out.insert("CCIN".into(), ccin.as_str().into());
        }
        if let Some(sn) = &self.serial_number {
            out.insert("Serial Number".into(), sn.as_str().into());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callout {
    pub priority: u8,
    pub location_code: String,
    pub fru_identity: Option<FruIdentity>,
}

impl Callout {
    /// Reads one callout, always consuming exactly its declared size.
    fn read(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Self> {
        let size = cursor.u8_named("callout size")?;
        let window = cursor.take_bytes(usize::from(size).saturating_sub(1), "callout")?;
        let mut window = ByteCursor::new(window);

        let flags = window.u8_named("callout flags")?;
        let priority = window.u8_named("callout priority")?;
        let location_code_size = window.u8_named("location code size")?;
        let location_code = window.ascii(usize::from(location_code_size), "location code")?;

        let fru_identity = if flags & CALLOUT_HAS_FRU_IDENTITY != 0 {
            Some(FruIdentity::read(&mut window)?)
        } else {
            None
        };

        if !window.is_empty() {
            trace!("skipping {} bytes of callout substructures", window.remaining());
        }

        Ok(Callout {
            priority,
            location_code,
            fru_identity,
        })
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(fru) = &self.fru_identity {
            fru.insert_json(&mut out);
        }
        out.insert(
            "Priority".into(),
            callout_priority_name(self.priority).into(),
        );
        if !self.location_code.is_empty() {
            out.insert("Location Code".into(), self.location_code.as_str().into());
        }
        Value::Object(out)
    }
}

fn read_callouts(cursor: &mut ByteCursor<'_>) -> DeserializationResult<Vec<Callout>> {
    let _id = cursor.u8_named("callouts id")?;
    let _flags = cursor.u8_named("callouts flags")?;
    let words = cursor.u16_named("callouts length")?;

    let len = (usize::from(words) * 4)
        .saturating_sub(4)
        .min(cursor.remaining());
    let mut window = ByteCursor::new(cursor.take_bytes(len, "callouts")?);

    let mut callouts = Vec::new();
    while !window.is_empty() {
        callouts.push(Callout::read(&mut window)?);
    }
    Ok(callouts)
}

/// A primary or secondary System Reference Code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Src {
    pub header: SectionHeader,
    pub version: u8,
    pub flags: u8,
    pub word_count: u8,
    pub size: u16,
    /// Hex words 2 through 9.
    pub words: [u32; 8],
    pub reference_code: String,
    pub callouts: Option<Vec<Callout>>,
}

impl Src {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);

        let version = cursor.u8_named("SRC version")?;
        let flags = cursor.u8_named("SRC flags")?;
        let _reserved = cursor.u8_named("SRC reserved")?;
        let word_count = cursor.u8_named("SRC word count")?;
        let _reserved = cursor.u16_named("SRC reserved")?;
        let size = cursor.u16_named("SRC size")?;

        let mut words = [0_u32; 8];
        for word in words.iter_mut() {
            *word = cursor.u32_named("SRC hex word")?;
        }

        let raw = cursor.take_bytes(REFERENCE_CODE_SIZE, "reference code")?;
        let reference_code = ascii_field(raw).trim().to_string();

        let callouts = if flags & ADDITIONAL_SECTIONS != 0 {
            Some(read_callouts(&mut cursor)?)
        } else {
            None
        };

        Ok(Src {
            header,
            version,
            flags,
            word_count,
            size,
            words,
            reference_code,
            callouts,
        })
    }

    pub fn hex_words(&self) -> [String; 8] {
        std::array::from_fn(|i| format!("{:08X}", self.words[i]))
    }

    /// Backplane CCIN, from the upper half of hex word 3.
    pub fn backplane_ccin(&self) -> String {
        format!("{:04X}", self.words[1] >> 16)
    }

    fn error_status(&self, mask: u32) -> bool {
        self.words[3] & mask != 0
    }

    pub fn is_deconfigured(&self) -> bool {
        self.error_status(DECONFIGURED)
    }

    pub fn is_guarded(&self) -> bool {
        self.error_status(GUARDED)
    }

    pub fn to_json(&self, ctx: &DecodeContext<'_>) -> Map<String, Value> {
        let mut out = common_fields(&self.header, ctx.creator_id, ctx);
        out.insert("SRC Version".into(), format!("0x{:02X}", self.version).into());
        out.insert(
            "SRC Format".into(),
            format!("0x{:02X}", self.words[0] & 0xFF).into(),
        );
        out.insert(
            "Virtual Progress SRC".into(),
            bool_string(self.flags & VIRTUAL_PROGRESS_SRC != 0).into(),
        );
        out.insert(
            "I5/OS Service Event Bit".into(),
            bool_string(self.flags & I5OS_SERVICE_EVENT != 0).into(),
        );
        out.insert(
            "Hypervisor Dump Initiated".into(),
            bool_string(self.flags & HYP_DUMP_INIT != 0).into(),
        );
        out.insert("Backplane CCIN".into(), self.backplane_ccin().into());
        out.insert(
            "Terminate FW Error".into(),
            bool_string(self.error_status(TERMINATE_FW_ERROR)).into(),
        );
        out.insert("Deconfigured".into(), bool_string(self.is_deconfigured()).into());
        out.insert("Guarded".into(), bool_string(self.is_guarded()).into());

        let is_bmc = ctx.creator_id == BMC_CREATOR_ID;
        if is_bmc {
            if let Some(details) = self.error_details(ctx) {
                out.insert("Error Details".into(), Value::Object(details));
            }
        }

        out.insert("Valid Word Count".into(), format!("0x{:02X}", self.word_count).into());
        out.insert("Reference Code".into(), self.reference_code.as_str().into());

        let hex_words = self.hex_words();
        for (i, word) in hex_words.iter().enumerate() {
            out.insert(format!("Hex Word {}", i + 2), word.as_str().into());
        }

        if let Some(callouts) = &self.callouts {
            let mut section = Map::new();
            section.insert("Callout Count".into(), callouts.len().into());
            section.insert(
                "Callouts".into(),
                callouts.iter().map(Callout::to_json).collect(),
            );
            out.insert("Callout Section".into(), Value::Object(section));
        }

        if is_bmc && ctx.allow_plugins {
            if let Some(name) = src_plugin_name(&self.reference_code) {
                if let Some(fields) = ctx.plugins.decode_src(&name, &self.reference_code, &hex_words)
                {
                    out.extend(fields);
                }
            }
        }

        out
    }

    fn error_details(&self, ctx: &DecodeContext<'_>) -> Option<Map<String, Value>> {
        let registry = ctx.registry?;
        let reason_code = self.reference_code.get(4..8)?;
        let src_type = self.reference_code.get(0..2)?;
        registry.error_details(&format!("0x{}", reason_code), src_type)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context, header};
    use super::*;
    use crate::message_registry::MessageRegistry;
    use crate::plugins::{PluginCache, PluginRegistry};
    use crate::component_names::ComponentNames;
    use crate::err::PluginResult;
    use crate::section_header::SectionId;
    use serde_json::json;
    use std::sync::Arc;

    fn src_payload(flags: u8, reference_code: &str, callouts: &[u8]) -> Vec<u8> {
        let mut p = vec![0x02, flags, 0x00, 0x09, 0x00, 0x00, 0x00, 0x48];
        let words: [u32; 8] = [
            0x0003_0055,
            0x2E2D_0010,
            0,
            0x0300_0000,
            0,
            0,
            0,
            0xDEAD_BEEF,
        ];
        for w in words {
            p.extend_from_slice(&w.to_be_bytes());
        }
        let mut code = [b' '; 32];
        code[..reference_code.len()].copy_from_slice(reference_code.as_bytes());
        p.extend_from_slice(&code);
        p.extend_from_slice(callouts);
        p
    }

    fn callout_section() -> Vec<u8> {
        // One callout: location code "U78DA-P1" (8 bytes), FRU identity with PN and SN.
        let mut callout = vec![0x00, CALLOUT_HAS_FRU_IDENTITY, b'H', 8];
        callout.extend_from_slice(b"U78DA-P1");
        let mut fru = vec![b'I', b'D', 24, 0x10 | FRU_PART_NUMBER | FRU_SERIAL_NUMBER];
        fru.extend_from_slice(b"01DH123\0");
        fru.extend_from_slice(b"YL10UF8AB001");
        callout.extend_from_slice(&fru);
        // Trailing PCE/MRU bytes inside the callout window are skipped.
        callout.extend_from_slice(&[0xEE; 4]);
        callout[0] = callout.len() as u8;

        let mut section = vec![0xC0, 0x00];
        section.extend_from_slice(&(((callout.len() + 4) / 4) as u16).to_be_bytes());
        section.extend_from_slice(&callout);
        section
    }

    #[test]
    fn test_src_fields_in_order() {
        let payload = src_payload(0x00, "BD8D1002", &[]);
        let src = Src::from_payload(header(SectionId::PRIMARY_SRC, payload.len(), 1, 0x2000), &payload)
            .unwrap();
        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let json = src.to_json(&context('O', &plugins, &names));

        let keys: Vec<&str> = json.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "Section Version",
                "Sub-section type",
                "Created by",
                "SRC Version",
                "SRC Format",
                "Virtual Progress SRC",
                "I5/OS Service Event Bit",
                "Hypervisor Dump Initiated",
                "Backplane CCIN",
                "Terminate FW Error",
                "Deconfigured",
                "Guarded",
                "Valid Word Count",
                "Reference Code",
                "Hex Word 2",
                "Hex Word 3",
                "Hex Word 4",
                "Hex Word 5",
                "Hex Word 6",
                "Hex Word 7",
                "Hex Word 8",
                "Hex Word 9",
            ]
        );
        assert_eq!(json["SRC Format"], "0x55");
        assert_eq!(json["Backplane CCIN"], "2E2D");
        assert_eq!(json["Deconfigured"], "True");
        assert_eq!(json["Guarded"], "True");
        assert_eq!(json["Terminate FW Error"], "False");
        assert_eq!(json["Reference Code"], "BD8D1002");
        assert_eq!(json["Hex Word 9"], "DEADBEEF");
    }

    #[test]
    fn test_callouts_are_decoded_within_their_window() {
        let payload = src_payload(ADDITIONAL_SECTIONS, "BD8D1002", &callout_section());
        let src = Src::from_payload(header(SectionId::PRIMARY_SRC, payload.len(), 1, 0x2000), &payload)
            .unwrap();

        let callouts = src.callouts.as_ref().unwrap();
        assert_eq!(callouts.len(), 1);
        assert_eq!(callouts[0].location_code, "U78DA-P1");

        let plugins = PluginCache::default();
        let names = ComponentNames::new();
        let json = src.to_json(&context('O', &plugins, &names));
        assert_eq!(
            json["Callout Section"],
            json!({
                "Callout Count": 1,
                "Callouts": [{
                    "FRU Type": "Normal Hardware FRU",
                    "Part Number": "01DH123",
                    "Serial Number": "YL10UF8AB001",
                    "Priority": "Mandatory, replace all with this type as a unit",
                    "Location Code": "U78DA-P1"
                }]
            })
        );
    }

    #[test]
    fn test_bmc_src_gets_error_details_and_plugin_fields() {
        let payload = src_payload(0x00, "BD8D1002", &[]);
        let src = Src::from_payload(header(SectionId::PRIMARY_SRC, payload.len(), 1, 0x2000), &payload)
            .unwrap();

        let registry = MessageRegistry::from_json(
            r#"{"PELs": [{"Name": "x", "SRC": {"ReasonCode": "0x1002"},
                "Documentation": {"Message": "A test error"}}]}"#,
        )
        .unwrap();
        let plugins = PluginCache::new(Arc::new(PluginRegistry::new().with_src_parser(
            "o1000",
            |code: &str, _: &[String; 8]| -> PluginResult<Option<String>> {
                Ok(Some(format!(r#"{{"Decoded": "{}"}}"#, code)))
            },
        )));
        let names = ComponentNames::new();
        let mut ctx = context('O', &plugins, &names);
        ctx.registry = Some(&registry);

        let json = src.to_json(&ctx);
        assert_eq!(json["Error Details"], json!({"Message": "A test error"}));
        assert_eq!(json.keys().last().map(String::as_str), Some("Decoded"));

        // Hypervisor SRCs never consult the registry or SRC plugins.
        let json = src.to_json(&DecodeContext {
            creator_id: 'H',
            ..ctx
        });
        assert!(!json.contains_key("Error Details"));
        assert!(!json.contains_key("Decoded"));

        ctx.allow_plugins = false;
        assert!(!src.to_json(&ctx).contains_key("Decoded"));
    }

    #[test]
    fn test_truncated_src_is_an_error() {
        let payload = src_payload(0x00, "BD8D1002", &[]);
        let short = &payload[..40];
        assert!(Src::from_payload(header(SectionId::PRIMARY_SRC, short.len(), 1, 0x2000), short).is_err());
    }
}
