use serde::{Deserialize, Serialize};

use crate::constants::sentinel::UNKNOWN;

/// Structured fields recovered from a release filename alone, independent of
/// which source supplied it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedFile {
    pub resolution: String,

    pub quality: String,

    pub encode: String,

    pub release_group: Option<String>,

    pub visual_tags: Vec<String>,

    pub audio_tags: Vec<String>,

    /// Deduplicated case-insensitively, title-cased. Order carries no
    /// meaning.
    pub languages: Vec<String>,

    pub title: Option<String>,

    pub year: Option<String>,

    pub season: Option<u32>,

    pub seasons: Option<Vec<u32>>,

    pub episode: Option<u32>,
}

impl Default for ParsedFile {
    fn default() -> Self {
        Self {
            resolution: UNKNOWN.to_string(),
            quality: UNKNOWN.to_string(),
            encode: UNKNOWN.to_string(),
            release_group: None,
            visual_tags: Vec::new(),
            audio_tags: Vec::new(),
            languages: Vec::new(),
            title: None,
            year: None,
            season: None,
            seasons: None,
            episode: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    P2p,
    Usenet,
    Debrid,
    Live,
    #[default]
    Unknown,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::P2p => "p2p",
            Self::Usenet => "usenet",
            Self::Debrid => "debrid",
            Self::Live => "live",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Addon {
    pub id: String,

    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: String,

    pub cached: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Torrent {
    pub info_hash: Option<String>,

    pub file_idx: Option<u32>,

    pub seeders: Option<u32>,

    pub sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Usenet {
    pub age: Option<String>,
}

/// Which user regex (if any) matched this stream, for filter/sort layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegexMatched {
    pub pattern: String,

    pub name: Option<String>,

    pub index: usize,
}

/// One fully extracted stream record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedStream {
    pub id: String,

    pub addon: Addon,

    #[serde(flatten)]
    pub file: ParsedFile,

    pub filename: Option<String>,

    /// Invariant: cleared when equal to `filename`.
    pub folder_name: Option<String>,

    pub message: Option<String>,

    /// Bytes.
    pub size: Option<u64>,

    pub provider: Option<Provider>,

    pub torrent: Option<Torrent>,

    pub usenet: Option<Usenet>,

    pub stream_type: StreamType,

    /// Milliseconds.
    pub duration: Option<u64>,

    pub url: Option<String>,

    pub external_url: Option<String>,

    pub indexer: Option<String>,

    pub seeders: Option<u32>,

    pub age: Option<String>,

    pub personal: Option<bool>,

    pub regex_matched: Option<RegexMatched>,

    pub proxied: bool,
}

impl ParsedStream {
    #[must_use]
    pub fn info_hash(&self) -> Option<&str> {
        self.torrent.as_ref().and_then(|t| t.info_hash.as_deref())
    }

    /// Enforces the folder-name invariant; call after both fields settle.
    pub fn normalize_folder_name(&mut self) {
        if self.folder_name.is_some() && self.folder_name == self.filename {
            self.folder_name = None;
        }
    }
}
