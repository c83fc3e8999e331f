//! Parsing core for stream descriptors from aggregator addons.
//!
//! Raw descriptors arrive as loosely structured JSON with most of the useful
//! metadata buried in free-form name and description text. This crate turns
//! them into typed [`models::ParsedStream`] records: release-name parsing,
//! emoji-marker field extraction, bounded user-regex evaluation, duplicate
//! grouping over info-hashes and title fingerprints, and a template DSL for
//! rendering the results back into display text.

pub mod cache;
pub mod constants;
pub mod dedup;
pub mod extractor;
pub mod formatter;
pub mod models;
pub mod parser;
pub mod safe_regex;

pub use cache::{Cache, CacheRegistry};
pub use dedup::{UnionFind, fingerprint};
pub use extractor::{ExtractResult, ExtractorOptions, StreamExtractor};
pub use formatter::{FormatterContext, Template, TemplateError};
pub use models::{ParsedFile, ParsedStream, RawDescriptor, StreamType};
pub use parser::parse_filename;
pub use safe_regex::SafeRegex;
