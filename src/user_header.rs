use bitflags::bitflags;
use serde_json::{Map, Value};

use crate::component_names::ComponentNames;
use crate::err::DeserializationResult;
use crate::pel_values::{
    CRIT_SYS_TERM_SEVERITY, INFORMATIONAL_SEVERITY, RECOVERED_SEVERITY, event_scope_name,
    event_type_name, severity_name, subsystem_name, transmission_state_name,
};
use crate::section_header::SectionHeader;
use crate::utils::ByteCursor;

bitflags! {
    /// User Header action flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActionFlags: u16 {
        const SERVICE_ACTION = 0x8000;
        const HIDDEN = 0x4000;
        const REPORT = 0x2000;
        const DONT_REPORT_TO_HOST = 0x1000;
        const HMC_CALL_HOME = 0x0800;
        const ISOLATION_INCOMPLETE = 0x0400;
        const SP_CALL_HOME = 0x0100;
        const HEARTBEAT_CALL_HOME = 0x0020;
        const _ = !0;
    }
}

impl ActionFlags {
    fn display_names(self) -> Vec<&'static str> {
        [
            (ActionFlags::SERVICE_ACTION, "Service Action Required"),
            (ActionFlags::HIDDEN, "Event not customer viewable"),
            (ActionFlags::REPORT, "Report Externally"),
            (ActionFlags::DONT_REPORT_TO_HOST, "Do Not Report To Hypervisor"),
            (ActionFlags::HMC_CALL_HOME, "HMC Call Home"),
            (
                ActionFlags::ISOLATION_INCOMPLETE,
                "Isolation Incomplete, further analysis required",
            ),
            (ActionFlags::SP_CALL_HOME, "Service Processor Call Home Required"),
            (ActionFlags::HEARTBEAT_CALL_HOME, "Heartbeat Call Home Event"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

/// The second section of every PEL: severity, action flags and subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHeader {
    pub header: SectionHeader,
    pub subsystem: u8,
    pub event_scope: u8,
    pub event_severity: u8,
    pub event_type: u8,
    pub problem_domain: u8,
    pub problem_vector: u8,
    pub action_flags: ActionFlags,
    pub states: u32,
}

impl UserHeader {
    pub(crate) fn from_payload(header: SectionHeader, payload: &[u8]) -> DeserializationResult<Self> {
        let mut cursor = ByteCursor::new(payload);

        let subsystem = cursor.u8_named("subsystem")?;
        let event_scope = cursor.u8_named("event scope")?;
        let event_severity = cursor.u8_named("event severity")?;
        let event_type = cursor.u8_named("event type")?;
        let _reserved = cursor.u32_named("user header reserved")?;
        let problem_domain = cursor.u8_named("problem domain")?;
        let problem_vector = cursor.u8_named("problem vector")?;
        let action_flags = ActionFlags::from_bits_retain(cursor.u16_named("action flags")?);
        let states = cursor.u32_named("transmission states")?;

        Ok(UserHeader {
            header,
            subsystem,
            event_scope,
            event_severity,
            event_type,
            problem_domain,
            problem_vector,
            action_flags,
            states,
        })
    }

    /// A PEL is serviceable when it is reported externally, unless it is only informational.
    pub fn is_serviceable(&self) -> bool {
        self.action_flags.contains(ActionFlags::REPORT)
            && self.event_severity != INFORMATIONAL_SEVERITY
            && self.event_severity != RECOVERED_SEVERITY
    }

    pub fn is_hidden(&self) -> bool {
        self.action_flags.contains(ActionFlags::HIDDEN)
    }

    pub fn is_critical_sys_term(&self) -> bool {
        self.event_severity == CRIT_SYS_TERM_SEVERITY
    }

    pub fn subsystem_name(&self) -> &'static str {
        subsystem_name(self.subsystem)
    }

    pub fn severity_name(&self) -> &'static str {
        severity_name(self.event_severity)
    }

    pub fn to_json(&self, creator_id: char, names: &ComponentNames) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("Section Version".into(), self.header.version.into());
        out.insert("Sub-section type".into(), self.header.sub_type.into());
        out.insert(
            "Log Committed by".into(),
            names
                .display_name(self.header.component_id, creator_id)
                .into(),
        );
        out.insert("Subsystem".into(), self.subsystem_name().into());
        out.insert("Event Scope".into(), event_scope_name(self.event_scope).into());
        out.insert("Event Severity".into(), self.severity_name().into());
        out.insert("Event Type".into(), event_type_name(self.event_type).into());
        out.insert(
            "Action Flags".into(),
            Value::from(self.action_flags.display_names()),
        );
        out.insert(
            "Host Transmission".into(),
            transmission_state_name((self.states & 0xFF) as u8).into(),
        );
        out.insert(
            "HMC Transmission".into(),
            transmission_state_name(((self.states >> 8) & 0xFF) as u8).into(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section_header::SectionId;
    use serde_json::json;

    fn user_header(severity: u8, flags: u16) -> UserHeader {
        let mut p = vec![0x8D, 0x03, severity, 0x00, 0, 0, 0, 0, 0x01, 0x02];
        p.extend_from_slice(&flags.to_be_bytes());
        p.extend_from_slice(&0x0000_0102_u32.to_be_bytes());
        let header = SectionHeader {
            id: SectionId::USER_HEADER,
            length: 24,
            version: 1,
            sub_type: 0,
            component_id: 0x2000,
        };
        UserHeader::from_payload(header, &p).unwrap()
    }

    #[test]
    fn test_serviceable_requires_report_and_real_severity() {
        assert!(user_header(0x40, 0xA000).is_serviceable());
        assert!(!user_header(0x40, 0x8000).is_serviceable());
        assert!(!user_header(0x00, 0x2000).is_serviceable());
        assert!(!user_header(0x10, 0x2000).is_serviceable());
    }

    #[test]
    fn test_hidden_and_critical() {
        let uh = user_header(0x51, 0x6000);
        assert!(uh.is_hidden());
        assert!(uh.is_critical_sys_term());
        assert!(uh.is_serviceable());
    }

    #[test]
    fn test_json_fields() {
        let json = user_header(0x20, 0xA800).to_json('O', &ComponentNames::new());
        assert_eq!(json["Subsystem"], "BMC Firmware");
        assert_eq!(json["Event Scope"], "Entire Platform");
        assert_eq!(json["Event Severity"], "Predictive Error");
        assert_eq!(
            json["Action Flags"],
            json!(["Service Action Required", "Report Externally", "HMC Call Home"])
        );
        assert_eq!(json["Host Transmission"], "Sent");
        assert_eq!(json["HMC Transmission"], "Rejected");
    }
}
