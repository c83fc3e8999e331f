//! Per-source extraction pipeline: raw descriptor in, `ParsedStream` (or a
//! distinguished error record) out.
//!
//! Sources differ in marker emojis, size conventions and quirks, but not in
//! pipeline shape. The fixed step sequence lives in
//! [`StreamExtractor::extract`]; each step is a method on
//! [`ExtractorSteps`] with a default implementation, so a source overrides
//! only the steps that differ and configures the rest through
//! [`ExtractorOptions`]. Every step is a pure function of its inputs and
//! never panics; `"Unknown"`/`None` is the universal not-found sentinel.

pub mod languages;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::cache::CacheRegistry;
use crate::constants::extractor::FILENAME_SCAN_LINES;
use crate::constants::sentinel::UNKNOWN;
use crate::models::{
    Addon, ParsedFile, ParsedStream, Provider, RawDescriptor, StreamType, Torrent, Usenet,
};
use crate::parser::filename::{detect_resolution, merge_languages, parse_filename};
use crate::parser::size::{UnitBase, parse_size_text};
use crate::safe_regex::{SafeRegex, keyword_alternation};

/// Per-field marker strings (usually emoji) that sources prefix their
/// description fields with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub seeders: Vec<String>,
    pub indexer: Vec<String>,
    pub folder: Vec<String>,
    pub age: Vec<String>,
    pub languages: Vec<String>,
    pub message: Vec<String>,
    /// Explicit field terminators, in addition to emoji and newline.
    pub terminators: Vec<String>,
}

impl Default for Markers {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(ToString::to_string).collect();
        Self {
            seeders: strings(&["👤", "👥", "🌱"]),
            indexer: strings(&["🔍", "⚙️"]),
            folder: strings(&["📁"]),
            age: strings(&["📅", "🕒"]),
            languages: strings(&["🗣️", "🔊", "🌐"]),
            message: strings(&["ℹ️", "⚠️"]),
            terminators: strings(&["|"]),
        }
    }
}

/// Source-specific configuration injected into the pipeline. All regex
/// overrides are untrusted strings and go through [`SafeRegex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    pub addon: Addon,

    /// Base the source uses for decimal-suffixed sizes.
    pub unit_base: UnitBase,

    pub markers: Markers,

    /// Override pattern whose first match is fed to the size parser.
    pub size_pattern: Option<String>,

    /// Override pattern whose first capture group is the age field.
    pub age_pattern: Option<String>,

    /// Override pattern whose first capture group is the indexer field.
    pub indexer_pattern: Option<String>,
}

/// Outcome of extracting one descriptor. An upstream error payload (bad
/// API key and friends) becomes `Error` so a batch keeps processing its
/// siblings instead of failing wholesale.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractResult {
    Stream(Box<ParsedStream>),
    Error(String),
}

impl ExtractResult {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    #[must_use]
    pub fn stream(self) -> Option<ParsedStream> {
        match self {
            Self::Stream(s) => Some(*s),
            Self::Error(_) => None,
        }
    }
}

/// Shared read-only state handed to every step.
pub struct ExtractorCx<'a> {
    pub options: &'a ExtractorOptions,
    pub regexes: &'a SafeRegex,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerFields {
    pub seeders: Option<u32>,
    pub indexer: Option<String>,
    pub folder: Option<String>,
    pub age: Option<String>,
    pub languages: Vec<String>,
    pub message: Option<String>,
}

/// The overridable pipeline steps. Defaults implement the common behavior;
/// a source-specific impl overrides individual methods without touching the
/// others or the sequence.
pub trait ExtractorSteps {
    fn detect_error(&self, d: &RawDescriptor, cx: &ExtractorCx) -> Option<String> {
        default_detect_error(d, cx)
    }

    fn select_filename(&self, d: &RawDescriptor, cx: &ExtractorCx) -> Option<String> {
        default_select_filename(d, cx)
    }

    fn extract_size(&self, d: &RawDescriptor, cx: &ExtractorCx) -> Option<u64> {
        default_extract_size(d, cx)
    }

    fn marker_fields(&self, d: &RawDescriptor, cx: &ExtractorCx) -> MarkerFields {
        default_marker_fields(d, cx)
    }

    fn enrich_languages(&self, d: &RawDescriptor, cx: &ExtractorCx, file: &mut ParsedFile) {
        default_enrich_languages(d, cx, file);
    }

    fn fallback_resolution(&self, d: &RawDescriptor, cx: &ExtractorCx) -> Option<String> {
        let _ = cx;
        detect_resolution(d.display_name()).map(ToString::to_string)
    }

    fn detect_provider(&self, d: &RawDescriptor, cx: &ExtractorCx) -> Option<Provider> {
        default_detect_provider(d, cx)
    }

    fn resolve_type(&self, d: &RawDescriptor, has_provider: bool, age: Option<&str>) -> StreamType {
        default_resolve_type(d, has_provider, age)
    }
}

/// The no-overrides source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSteps;

impl ExtractorSteps for DefaultSteps {}

pub struct StreamExtractor<S: ExtractorSteps = DefaultSteps> {
    options: ExtractorOptions,
    regexes: SafeRegex,
    steps: S,
}

impl StreamExtractor<DefaultSteps> {
    #[must_use]
    pub fn new(options: ExtractorOptions, registry: &CacheRegistry) -> Self {
        Self::with_steps(options, registry, DefaultSteps)
    }
}

impl<S: ExtractorSteps> StreamExtractor<S> {
    #[must_use]
    pub fn with_steps(options: ExtractorOptions, registry: &CacheRegistry, steps: S) -> Self {
        Self {
            options,
            regexes: SafeRegex::new(registry),
            steps,
        }
    }

    #[must_use]
    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Runs the fixed step sequence over one descriptor. Later steps depend
    /// on earlier outputs (provider detection wants the cleaned name, type
    /// resolution wants the provider), so the order here is part of the
    /// contract.
    #[must_use]
    pub fn extract(&self, d: &RawDescriptor) -> ExtractResult {
        let cx = ExtractorCx {
            options: &self.options,
            regexes: &self.regexes,
        };

        if let Some(message) = self.steps.detect_error(d, &cx) {
            debug!(addon = %self.options.addon.id, "descriptor carries an upstream error payload");
            return ExtractResult::Error(message);
        }

        let filename = self.steps.select_filename(d, &cx);
        let mut file = filename
            .as_deref()
            .map(parse_filename)
            .unwrap_or_default();

        let size = self.steps.extract_size(d, &cx);
        let fields = self.steps.marker_fields(d, &cx);

        let marker_langs: Vec<String> = fields
            .languages
            .iter()
            .map(|item| {
                languages::code_to_language(item)
                    .map_or_else(|| item.clone(), ToString::to_string)
            })
            .collect();
        merge_languages(&mut file.languages, marker_langs);
        self.steps.enrich_languages(d, &cx, &mut file);

        if file.resolution == UNKNOWN
            && let Some(res) = self.steps.fallback_resolution(d, &cx)
        {
            file.resolution = res;
        }

        // p2p is mutually exclusive with debrid: an info-hash means nobody
        // gets attributed as provider.
        let provider = if d.info_hash.is_some() {
            None
        } else {
            self.steps.detect_provider(d, &cx)
        };
        let stream_type = self
            .steps
            .resolve_type(d, provider.is_some(), fields.age.as_deref());

        let torrent = d.info_hash.as_ref().map(|hash| Torrent {
            info_hash: Some(hash.clone()),
            file_idx: d.file_idx,
            seeders: fields.seeders,
            sources: None,
        });
        let usenet = fields.age.clone().map(|age| Usenet { age: Some(age) });

        let id = d.info_hash.as_ref().map_or_else(
            || Uuid::new_v4().to_string(),
            |hash| format!("{}:{}", hash.to_lowercase(), d.file_idx.unwrap_or(0)),
        );

        let mut stream = ParsedStream {
            id,
            addon: self.options.addon.clone(),
            file,
            filename,
            folder_name: fields.folder,
            message: fields.message,
            size,
            provider,
            torrent,
            usenet,
            stream_type,
            duration: None,
            url: d.url.clone(),
            external_url: d.external_url.clone(),
            indexer: fields.indexer,
            seeders: fields.seeders,
            age: fields.age,
            personal: None,
            regex_matched: None,
            proxied: false,
        };
        stream.normalize_folder_name();
        ExtractResult::Stream(Box::new(stream))
    }
}

static ERROR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)invalid\s+(?:\S+\s+){0,2}?(account|api\s?key|apikey|token|credentials)",
        r"(?i)(account|api\s?key|apikey|token|subscription)\s+(?:is\s+)?(invalid|expired|disabled|suspended)",
        r"(?i)\b(unauthorized|forbidden|authentication\s+failed|not\s+premium)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid regex pattern defined in code"))
    .collect()
});

/// A line that plausibly is a release name: it carries a year or a
/// season/episode marker.
static RELEASE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(19|20)\d{2}\b|S\d{1,2}[\s.]?E\d{1,4}|\b\d{1,2}x\d{2,3}\b")
        .expect("Invalid regex pattern defined in code")
});

/// Position after which bare language codes are trusted; codes before the
/// year/season marker are usually title words, not languages.
static LANG_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(19|20)\d{2}\b|S\d{1,2}[\s.]?E\d{1,4}")
        .expect("Invalid regex pattern defined in code")
});

static TWO_LETTER_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]{2})\b").expect("Invalid regex pattern defined in code")
});

/// Known debrid-style services and their display-name variants.
static SERVICES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("realdebrid", &["RD", "Real Debrid", "RealDebrid", "Real-Debrid"]),
        ("alldebrid", &["AD", "AllDebrid", "All Debrid"]),
        ("premiumize", &["PM", "Premiumize"]),
        // Bare "DL", "TB" and "EN" are omitted on purpose: they collide
        // with WEB-DL, terabyte sizes and language tokens.
        ("debridlink", &["Debrid Link", "DebridLink"]),
        ("torbox", &["TRB", "Torbox", "TorBox"]),
        ("offcloud", &["OC", "Offcloud"]),
        ("putio", &["put.io", "Putio"]),
        ("easynews", &["Easynews"]),
        ("easydebrid", &["ED", "EasyDebrid"]),
        ("pikpak", &["PKP", "PikPak"]),
        ("seedr", &["SDR", "Seedr"]),
    ];
    table
        .iter()
        .map(|(id, variants)| {
            // Permissive boundaries: status symbols and emoji count as
            // separators here, unlike release-name tokens.
            let pattern = format!(
                r"(?i)(?:^|[^A-Za-z0-9])(?:{})(?:[^A-Za-z0-9]|$)",
                keyword_alternation(variants)
            );
            let re = Regex::new(&pattern).expect("Invalid regex pattern defined in code");
            (*id, re)
        })
        .collect()
});

fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F000..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF
        | 0x2190..=0x21FF
        | 0xFE0F
        | 0x200D
    )
}

fn strip_emoji(text: &str) -> String {
    let stripped: String = text.chars().map(|c| if is_emoji(c) { ' ' } else { c }).collect();
    stripped.trim().to_string()
}

fn default_detect_error(d: &RawDescriptor, _cx: &ExtractorCx) -> Option<String> {
    let haystacks = [d.title.as_deref(), d.description.as_deref()];
    for text in haystacks.into_iter().flatten() {
        if ERROR_RES.iter().any(|re| re.is_match(text)) {
            return Some(text.trim().to_string());
        }
    }
    None
}

fn default_select_filename(d: &RawDescriptor, _cx: &ExtractorCx) -> Option<String> {
    if let Some(hints) = &d.behavior_hints
        && let Some(filename) = &hints.filename
        && !filename.trim().is_empty()
    {
        return Some(filename.trim().to_string());
    }
    let body = d.body()?;
    for line in body.lines().take(FILENAME_SCAN_LINES) {
        let line = line.trim();
        if !line.is_empty() && RELEASE_LINE_RE.is_match(line) {
            return Some(strip_emoji(line));
        }
    }
    let whole = strip_emoji(body);
    if whole.is_empty() { None } else { Some(whole) }
}

fn default_extract_size(d: &RawDescriptor, cx: &ExtractorCx) -> Option<u64> {
    if let Some(hints) = &d.behavior_hints
        && let Some(size) = hints.video_size
        && size > 0
    {
        return Some(size);
    }
    let probe = |text: &str| -> Option<u64> {
        if let Some(pattern) = &cx.options.size_pattern {
            let re = cx.regexes.compile(pattern, "i", false).ok()?;
            let m = re.find(text)?;
            parse_size_text(m.as_str(), cx.options.unit_base)
        } else {
            parse_size_text(text, cx.options.unit_base)
        }
    };
    d.body().and_then(probe).or_else(|| probe(d.display_name()))
}

/// Substring between a marker and the next emoji, newline or explicit
/// terminator.
fn marker_value(text: &str, markers: &[String], terminators: &[String]) -> Option<String> {
    for marker in markers {
        let Some(pos) = text.find(marker.as_str()) else {
            continue;
        };
        let after = &text[pos + marker.len()..];
        let mut end = after.len();
        for (i, c) in after.char_indices() {
            if c == '\n' || (i > 0 && is_emoji(c)) {
                end = i;
                break;
            }
        }
        for terminator in terminators {
            if let Some(t) = after[..end].find(terminator.as_str()) {
                end = t;
            }
        }
        let value = after[..end]
            .trim()
            .trim_matches(|c: char| matches!(c, ':' | '|' | '•'))
            .trim();
        if !value.is_empty() {
            return Some(strip_emoji(value));
        }
    }
    None
}

fn first_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn default_marker_fields(d: &RawDescriptor, cx: &ExtractorCx) -> MarkerFields {
    let mut fields = MarkerFields::default();
    let Some(body) = d.body() else {
        return fields;
    };
    let markers = &cx.options.markers;
    let terms = &markers.terminators;

    fields.seeders = marker_value(body, &markers.seeders, terms)
        .as_deref()
        .and_then(first_integer);
    fields.folder = marker_value(body, &markers.folder, terms);
    fields.message = marker_value(body, &markers.message, terms);

    fields.indexer = cx
        .options
        .indexer_pattern
        .as_deref()
        .and_then(|p| captured(cx, p, body))
        .or_else(|| marker_value(body, &markers.indexer, terms));
    fields.age = cx
        .options
        .age_pattern
        .as_deref()
        .and_then(|p| captured(cx, p, body))
        .or_else(|| marker_value(body, &markers.age, terms));

    if let Some(raw) = marker_value(body, &markers.languages, terms) {
        fields.languages = raw
            .split(['/', ',', '|', '+', '•'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    fields
}

/// First capture group of an untrusted override pattern, or the whole match
/// when the pattern has no groups.
fn captured(cx: &ExtractorCx, pattern: &str, text: &str) -> Option<String> {
    let re = cx.regexes.compile(pattern, "i", false).ok()?;
    let caps = re.captures(text)?;
    let m = caps.get(1).or_else(|| caps.get(0))?;
    let value = m.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn default_enrich_languages(d: &RawDescriptor, _cx: &ExtractorCx, file: &mut ParsedFile) {
    let Some(body) = d.body() else {
        return;
    };
    let Some(anchor) = LANG_ANCHOR_RE.find(body) else {
        return;
    };
    let tail = &body[anchor.end()..];

    let mut extra: Vec<String> = Vec::new();
    for country in languages::extract_flag_countries(tail) {
        if let Some(lang) = languages::country_to_language(&country) {
            extra.push(lang.to_string());
        }
    }
    for caps in TWO_LETTER_CODE_RE.captures_iter(tail) {
        if let Some(code) = caps.get(1)
            && let Some(lang) = languages::code_to_language(code.as_str())
        {
            extra.push(lang.to_string());
        }
    }
    merge_languages(&mut file.languages, extra);
}

fn default_detect_provider(d: &RawDescriptor, _cx: &ExtractorCx) -> Option<Provider> {
    let name = d.display_name();
    if name.is_empty() {
        return None;
    }
    for (id, re) in SERVICES.iter() {
        if let Some(m) = re.find(name) {
            return Some(Provider {
                id: (*id).to_string(),
                cached: infer_cached(name, m.start(), m.end()),
            });
        }
    }
    None
}

/// Cached/uncached from status symbols adjacent to the service token, with
/// whole-name keywords as a fallback. `uncached` must be checked before
/// `cached`, which it contains.
fn infer_cached(name: &str, start: usize, end: usize) -> Option<bool> {
    // The match range includes its boundary characters, so the window is
    // match text plus a few characters either side.
    let before: String = name[..start].chars().rev().take(4).collect();
    let after: String = name[end..].chars().take(4).collect();
    let window = format!("{before}{}{after}", &name[start..end]);
    if window.contains('⏳') {
        return Some(false);
    }
    if window.contains(['+', '⚡', '🚀']) {
        return Some(true);
    }
    let lower = name.to_lowercase();
    if lower.contains("uncached") || lower.contains("download") {
        Some(false)
    } else if lower.contains("cached") || lower.contains('⚡') || lower.contains('🚀') {
        Some(true)
    } else {
        None
    }
}

fn default_resolve_type(d: &RawDescriptor, has_provider: bool, age: Option<&str>) -> StreamType {
    if d.info_hash.is_some() {
        StreamType::P2p
    } else if age.is_some() {
        StreamType::Usenet
    } else if has_provider {
        StreamType::Debrid
    } else if d.url.as_deref().is_some_and(|url| {
        url.ends_with(".m3u8") || url.ends_with(".mpd") || url.contains("/live/")
    }) {
        StreamType::Live
    } else {
        StreamType::Unknown
    }
}
