use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

use crate::component_names::ComponentNames;
use crate::err::{PelError, Result};
use crate::message_registry::MessageRegistry;
use crate::pel_filter::{FilterConfig, RecordTraits};
use crate::pel_record::{self, PelIdentity, PelRecord};
use crate::pel_values::{BMC_CREATOR_ID, creator_name};
use crate::plugins::{PluginCache, PluginSource};
use crate::private_header::PrivateHeader;
use crate::sections::{DecodeContext, DecodedSection};
use crate::user_header::UserHeader;
use crate::utils::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Number of threads used by the batch operations, `0` for one per core.
    num_threads: usize,
    /// Use creator specific plugins for user data and BMC SRCs.
    allow_plugins: bool,
    /// Pretty print rendered records.
    indent: bool,
    filter: FilterConfig,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            num_threads: 0,
            allow_plugins: true,
            indent: true,
            filter: FilterConfig::default(),
        }
    }
}

impl ParserSettings {
    pub fn new() -> Self {
        ParserSettings::default()
    }

    /// Sets the number of worker threads.
    /// `0` will let rayon decide.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if num_threads == 0 {
            #[cfg(feature = "multithreading")]
            {
                rayon::current_num_threads()
            }
            #[cfg(not(feature = "multithreading"))]
            {
                1
            }
        } else {
            num_threads
        };
        self
    }

    pub fn allow_plugins(mut self, allow_plugins: bool) -> Self {
        self.allow_plugins = allow_plugins;
        self
    }

    pub fn indent(mut self, pretty: bool) -> Self {
        self.indent = pretty;
        self
    }

    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn should_allow_plugins(&self) -> bool {
        self.allow_plugins
    }

    pub fn should_indent(&self) -> bool {
        self.indent
    }

    pub fn get_filter(&self) -> &FilterConfig {
        &self.filter
    }
}

/// How [`PelParser::find`] selects a single PEL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    EntryId(u32),
    BmcId(u32),
    PlatformLogId(u32),
    /// A primary SRC reference code, e.g. `BD8D1002`.
    Src(String),
}

impl Lookup {
    fn matches_identity(&self, identity: &PelIdentity) -> bool {
        match self {
            Lookup::EntryId(id) => identity.entry_id == *id,
            Lookup::BmcId(id) => identity.bmc_log_id == *id,
            Lookup::PlatformLogId(id) => identity.platform_log_id == *id,
            Lookup::Src(_) => true,
        }
    }
}

/// One line of a PEL listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PelSummary {
    #[serde(skip)]
    pub entry_id: u32,
    #[serde(rename = "SRC")]
    pub src: String,
    #[serde(rename = "Message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "PLID")]
    pub platform_log_id: String,
    #[serde(rename = "CreatorID")]
    pub creator: String,
    #[serde(rename = "Subsystem")]
    pub subsystem: String,
    #[serde(rename = "Commit Time")]
    pub commit_time: String,
    #[serde(rename = "Sev")]
    pub severity: String,
    #[serde(rename = "CompID")]
    pub component_id: String,
}

#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the record in the batch input.
    pub index: usize,
    pub error: PelError,
}

/// Result of decoding many records: what was produced, and what failed.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Outputs of the records that decoded and passed the filter, with their position in the
    /// input, in input order.
    pub outputs: Vec<(usize, T)>,
    pub failures: Vec<BatchFailure>,
}

impl<T> BatchReport<T> {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Decodes PELs, owning the plugin and component name caches for its lifetime.
pub struct PelParser {
    settings: ParserSettings,
    plugins: PluginCache,
    names: ComponentNames,
    registry: Option<MessageRegistry>,
}

impl PelParser {
    pub fn new(settings: ParserSettings) -> Self {
        PelParser {
            settings,
            plugins: PluginCache::default(),
            names: ComponentNames::new(),
            registry: None,
        }
    }

    pub fn with_plugins(mut self, source: Arc<dyn PluginSource>) -> Self {
        self.plugins = PluginCache::new(source);
        self
    }

    pub fn with_component_names(mut self, names: ComponentNames) -> Self {
        self.names = names;
        self
    }

    pub fn with_message_registry(mut self, registry: MessageRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_configuration(mut self, settings: ParserSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn plugins(&self) -> &PluginCache {
        &self.plugins
    }

    fn context(&self, creator_id: char) -> DecodeContext<'_> {
        DecodeContext {
            creator_id,
            allow_plugins: self.settings.allow_plugins,
            plugins: &self.plugins,
            names: &self.names,
            registry: self.registry.as_ref(),
        }
    }

    /// Decode the headers and sections of a record that passes `filter`.
    fn decode_sections(
        &self,
        data: &[u8],
        filter: &FilterConfig,
    ) -> Result<Option<(PrivateHeader, UserHeader, Vec<DecodedSection>)>> {
        let mut cursor = ByteCursor::new(data);
        let (private_header, user_header) = pel_record::read_headers(&mut cursor)?;

        if !filter.should_keep(&RecordTraits::from(&user_header)) {
            debug!(
                "PEL 0x{:08X} filtered out (severity 0x{:02X}, flags {:?})",
                private_header.entry_id, user_header.event_severity, user_header.action_flags
            );
            return Ok(None);
        }

        let sections = pel_record::read_sections(&mut cursor, &private_header)?;
        trace!(
            "PEL 0x{:08X}: decoded {} sections",
            private_header.entry_id,
            sections.len()
        );
        Ok(Some((private_header, user_header, sections)))
    }

    fn decode_with_filter(&self, data: &[u8], filter: &FilterConfig) -> Result<Option<PelRecord>> {
        let Some((private_header, user_header, sections)) = self.decode_sections(data, filter)?
        else {
            return Ok(None);
        };

        let ctx = self.context(private_header.creator_id);
        Ok(Some(pel_record::render(
            private_header,
            user_header,
            sections,
            &ctx,
        )))
    }

    /// Decode a whole record. Returns `Ok(None)` when the configured filter drops it.
    pub fn decode(&self, data: &[u8]) -> Result<Option<PelRecord>> {
        self.decode_with_filter(data, &self.settings.filter)
    }

    /// Decode a record that was asked for by name or id: visibility rules are not applied.
    pub fn decode_direct(&self, data: &[u8]) -> Result<Option<PelRecord>> {
        let filter = self.settings.filter.clone().direct_lookup(true);
        self.decode_with_filter(data, &filter)
    }

    /// Decode only the Private Header of a record.
    pub fn peek_identity(&self, data: &[u8]) -> Result<PelIdentity> {
        let mut cursor = ByteCursor::new(data);
        let private_header = pel_record::read_private_header(&mut cursor)?;
        Ok(PelIdentity::from(&private_header))
    }

    /// Find the first record matching `lookup`.
    ///
    /// Records that fail to decode are skipped. The configured filter is applied as a direct
    /// lookup, so a hidden or informational PEL is still found.
    pub fn find<N, B>(&self, records: &[(N, B)], lookup: &Lookup) -> Option<PelRecord>
    where
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let filter = self.settings.filter.clone().direct_lookup(true);

        for (name, data) in records {
            let data = data.as_ref();
            let identity = match self.peek_identity(data) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("{}", e.with_record_name(name.as_ref()));
                    continue;
                }
            };
            if !lookup.matches_identity(&identity) {
                continue;
            }

            let record = match self.decode_with_filter(data, &filter) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!("{}", e.with_record_name(name.as_ref()));
                    continue;
                }
            };

            match lookup {
                Lookup::Src(code) => {
                    if record.primary_src().map(|src| src.reference_code.as_str())
                        == Some(code.as_str())
                    {
                        return Some(record);
                    }
                }
                _ => return Some(record),
            }
        }
        None
    }

    /// Summarize a record for a listing.
    ///
    /// Returns `Ok(None)` when the filter drops the record or its SRC is excluded. Plugins are
    /// never run.
    pub fn summarize(&self, data: &[u8]) -> Result<Option<PelSummary>> {
        let filter = &self.settings.filter;
        let Some((private_header, user_header, sections)) = self.decode_sections(data, filter)?
        else {
            return Ok(None);
        };

        let primary_src = sections.iter().find_map(|section| match section {
            DecodedSection::PrimarySrc(src) => Some(src),
            _ => None,
        });
        let src = primary_src
            .map(|src| src.reference_code.clone())
            .unwrap_or_default();

        if filter.is_excluded(&src) {
            debug!("PEL 0x{:08X} has excluded SRC {}", private_header.entry_id, src);
            return Ok(None);
        }

        let message = match (private_header.creator_id, &self.registry, src.get(4..8)) {
            (BMC_CREATOR_ID, Some(registry), Some(reason_code)) => registry
                .error_details(&format!("0x{}", reason_code), src.get(0..2).unwrap_or_default())
                .and_then(|details| details.get("Message").and_then(|m| m.as_str()).map(String::from)),
            _ => None,
        };

        Ok(Some(PelSummary {
            entry_id: private_header.entry_id,
            src,
            message,
            platform_log_id: format!("0x{:08X}", private_header.platform_log_id),
            creator: creator_name(private_header.creator_id).to_string(),
            subsystem: user_header.subsystem_name().to_string(),
            commit_time: private_header.committed_at.to_string(),
            severity: user_header.severity_name().to_string(),
            component_id: self
                .names
                .display_name(private_header.header.component_id, private_header.creator_id),
        }))
    }

    /// Decode every record, isolating failures to the record that caused them.
    pub fn decode_batch<N, B>(&self, inputs: &[(N, B)]) -> BatchReport<PelRecord>
    where
        N: AsRef<str> + Sync,
        B: AsRef<[u8]> + Sync,
    {
        self.run_batch(inputs, |data| self.decode(data))
    }

    pub fn summarize_batch<N, B>(&self, inputs: &[(N, B)]) -> BatchReport<PelSummary>
    where
        N: AsRef<str> + Sync,
        B: AsRef<[u8]> + Sync,
    {
        self.run_batch(inputs, |data| self.summarize(data))
    }

    /// Check which records the configured filter keeps, without rendering them.
    ///
    /// `outputs.len()` is the count. Records that fail to decode are not counted and end up in
    /// `failures`.
    pub fn count<N, B>(&self, inputs: &[(N, B)]) -> BatchReport<()>
    where
        N: AsRef<str> + Sync,
        B: AsRef<[u8]> + Sync,
    {
        self.run_batch(inputs, |data| {
            let kept = self.decode_sections(data, &self.settings.filter)?;
            Ok(kept.map(|_| ()))
        })
    }

    fn run_batch<N, B, T, F>(&self, inputs: &[(N, B)], decode: F) -> BatchReport<T>
    where
        N: AsRef<str> + Sync,
        B: AsRef<[u8]> + Sync,
        T: Send,
        F: Fn(&[u8]) -> Result<Option<T>> + Sync,
    {
        let decode_one = |(name, data): &(N, B)| -> Result<Option<T>> {
            decode(data.as_ref()).map_err(|e| e.with_record_name(name.as_ref()))
        };

        let results = self.map_inputs(inputs, decode_one);

        let mut report = BatchReport {
            outputs: Vec::with_capacity(results.len()),
            failures: Vec::new(),
        };
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(Some(output)) => report.outputs.push((index, output)),
                Ok(None) => {}
                Err(error) => {
                    warn!("{}", error);
                    report.failures.push(BatchFailure { index, error });
                }
            }
        }
        report
    }

    #[cfg(feature = "multithreading")]
    fn map_inputs<I, R, F>(&self, inputs: &[I], f: F) -> Vec<R>
    where
        I: Sync,
        R: Send,
        F: Fn(&I) -> R + Sync + Send,
    {
        if self.settings.num_threads == 1 || inputs.len() < 2 {
            return inputs.iter().map(f).collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.num_threads)
            .build()
        {
            Ok(pool) => pool.install(|| inputs.par_iter().map(f).collect()),
            Err(e) => {
                warn!("Failed to start a thread pool, decoding sequentially: {}", e);
                inputs.iter().map(f).collect()
            }
        }
    }

    #[cfg(not(feature = "multithreading"))]
    fn map_inputs<I, R, F>(&self, inputs: &[I], f: F) -> Vec<R>
    where
        F: Fn(&I) -> R,
    {
        inputs.iter().map(f).collect()
    }
}
