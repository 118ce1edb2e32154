#![deny(unused_must_use)]
#![forbid(unsafe_code)]

pub use component_names::ComponentNames;
pub use message_registry::MessageRegistry;
pub use pel_filter::{FilterConfig, RecordTraits};
pub use pel_parser::{BatchFailure, BatchReport, Lookup, ParserSettings, PelParser, PelSummary};
pub use pel_record::{PelIdentity, PelRecord, assemble};
pub use private_header::PrivateHeader;
pub use section_header::{SectionHeader, SectionId};
pub use sections::{DecodeContext, DecodedSection, decode_section};
pub use user_header::{ActionFlags, UserHeader};
pub use utils::{BcdTime, hexdump, hexdump_json};

pub mod component_names;
pub mod err;
pub mod message_registry;
pub mod pel_filter;
pub mod pel_parser;
pub mod pel_record;
pub mod pel_values;
pub mod plugins;
pub mod private_header;
pub mod section_header;
pub mod sections;
pub mod user_header;

mod utils;
