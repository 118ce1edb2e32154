use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PelError>;
pub type DeserializationResult<T> = std::result::Result<T, DeserializationError>;
pub type PluginResult<T> = std::result::Result<T, PluginError>;

/// Errors raised while walking the binary layout of a single record.
///
/// Any of these is fatal to the record being decoded, never to a batch.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("buffer too small for {what} at offset {offset} (need {need} bytes, have {have})")]
    Truncated {
        what: &'static str,
        offset: u64,
        need: usize,
        have: usize,
    },

    #[error("expected {what} section `{expected}`, found section id 0x{found:04X}")]
    UnexpectedSection {
        what: &'static str,
        expected: &'static str,
        found: u16,
    },

    #[error("section at offset {offset} has an invalid length of {length} bytes")]
    InvalidSectionLength { offset: u64, length: u16 },

    #[error("private header declares {count} sections, at least 2 are required")]
    InvalidSectionCount { count: u8 },
}

/// Errors raised by the plugin subsystem.
///
/// These are always recovered from locally; the section falls back to its opaque rendering.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("no plugin registered under `{name}`")]
    NotFound { name: String },

    #[error("failed to load plugin `{name}`: {message}")]
    Load { name: String, message: String },

    #[error("plugin `{name}` failed to decode its payload: {message}")]
    Decode { name: String, message: String },

    #[error("plugin `{name}` produced invalid JSON: {source}")]
    InvalidJson {
        name: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum PelError {
    #[error("failed to decode PEL `{name}`: {source}")]
    FailedToDecodeRecord {
        name: String,
        source: DeserializationError,
    },

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    #[error("I/O error while reading `{}`: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid JSON in `{}`: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl PelError {
    /// Attach the record name (usually a file name) to a decoding failure.
    pub(crate) fn with_record_name(self, name: &str) -> Self {
        match self {
            PelError::Deserialization(source) => PelError::FailedToDecodeRecord {
                name: name.to_string(),
                source,
            },
            other => other,
        }
    }

    /// True for failures caused by the record bytes themselves (as opposed to I/O).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PelError::Deserialization(_) | PelError::FailedToDecodeRecord { .. }
        )
    }
}
