use serde::{Deserialize, Serialize};

/// One raw stream record as delivered by an upstream source, before any
/// extraction. Everything is optional; sources disagree wildly on which
/// fields they populate and how.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawDescriptor {
    pub url: Option<String>,

    pub external_url: Option<String>,

    pub info_hash: Option<String>,

    pub file_idx: Option<u32>,

    /// Display name, usually the left column of a stream listing.
    pub name: Option<String>,

    pub title: Option<String>,

    /// Free-text body, often multi-line with emoji markers.
    pub description: Option<String>,

    pub behavior_hints: Option<BehaviorHints>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorHints {
    pub filename: Option<String>,

    pub video_size: Option<u64>,

    pub proxy_headers: Option<serde_json::Value>,

    pub not_web_ready: Option<bool>,

    pub video_hash: Option<String>,
}

impl RawDescriptor {
    /// The text most sources use as the human-facing body: description if
    /// present, else the title.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.description.as_deref().or(self.title.as_deref())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}
