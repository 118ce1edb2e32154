use crate::pel_values::CRIT_SYS_TERM_SEVERITY;
use crate::user_header::UserHeader;

/// Which PELs a listing or dump should include.
///
/// The default configuration keeps serviceable, non-hidden PELs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub every_pel: bool,
    pub serviceable: bool,
    pub non_serviceable: bool,
    pub hidden: bool,
    pub crit_sys_term: bool,
    /// Severity groups, only the upper nibble of each value is significant.
    pub severities: Vec<u8>,
    /// Restrict output to the requested categories.
    pub only: bool,
    /// Reference codes never to list.
    pub excluded_srcs: Vec<String>,
    /// The record was asked for by id, so visibility rules do not apply.
    pub direct_lookup: bool,
}

impl FilterConfig {
    pub fn new() -> Self {
        FilterConfig::default()
    }

    pub fn every_pel(mut self, every_pel: bool) -> Self {
        self.every_pel = every_pel;
        self
    }

    pub fn serviceable(mut self, serviceable: bool) -> Self {
        self.serviceable = serviceable;
        self
    }

    pub fn non_serviceable(mut self, non_serviceable: bool) -> Self {
        self.non_serviceable = non_serviceable;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn crit_sys_term(mut self, crit_sys_term: bool) -> Self {
        self.crit_sys_term = crit_sys_term;
        self
    }

    pub fn severities(mut self, severities: impl IntoIterator<Item = u8>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }

    pub fn only(mut self, only: bool) -> Self {
        self.only = only;
        self
    }

    pub fn excluded_srcs(mut self, srcs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_srcs = srcs.into_iter().map(Into::into).collect();
        self
    }

    pub fn direct_lookup(mut self, direct_lookup: bool) -> Self {
        self.direct_lookup = direct_lookup;
        self
    }

    pub fn is_excluded(&self, reference_code: &str) -> bool {
        self.excluded_srcs.iter().any(|src| src == reference_code)
    }

    fn severity_matches(&self, severity: u8) -> bool {
        self.severities
            .iter()
            .any(|group| severity >> 4 == group >> 4)
    }

    /// When `only` narrows a category to the requested severity groups, a record must also
    /// match one of the groups.
    fn keep_category(&self, severity: u8) -> bool {
        !(self.only && !self.severities.is_empty() && !self.severity_matches(severity))
    }

    /// Decide whether a record with `traits` is output.
    pub fn should_keep(&self, traits: &RecordTraits) -> bool {
        if self.every_pel {
            return true;
        }

        if self.crit_sys_term && traits.severity == CRIT_SYS_TERM_SEVERITY {
            return true;
        }

        if self.serviceable && traits.serviceable {
            return self.keep_category(traits.severity);
        }

        if self.non_serviceable && !traits.serviceable {
            return self.keep_category(traits.severity);
        }

        if self.hidden && traits.hidden {
            return self.keep_category(traits.severity);
        }

        if !self.severities.is_empty() && self.severity_matches(traits.severity) {
            let other_categories = self.serviceable || self.non_serviceable || self.hidden;
            return !(self.only && other_categories);
        }

        if self.only || traits.hidden || !traits.serviceable {
            return self.direct_lookup;
        }

        true
    }
}

/// The parts of a User Header that filtering looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTraits {
    pub severity: u8,
    pub serviceable: bool,
    pub hidden: bool,
}

impl From<&UserHeader> for RecordTraits {
    fn from(uh: &UserHeader) -> Self {
        RecordTraits {
            severity: uh.event_severity,
            serviceable: uh.is_serviceable(),
            hidden: uh.is_hidden(),
        }
    }
}
