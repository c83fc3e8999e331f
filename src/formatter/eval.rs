//! Placeholder resolution and the modifier table.
//!
//! Every stream field maps into a small [`Value`] union; modifiers are then
//! dispatched on the value's type. Predicate modifiers (`exists`, `istrue`,
//! comparisons, string tests) select a `[T||F]` branch when one is present
//! and render `true`/`false` when not; transform modifiers produce text
//! directly. Anything unrecognized becomes a literal
//! `{unknown_<type>_modifier(name)}` marker.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::seq::IndexedRandom;

use super::{Modifier, Placeholder};
use crate::constants::sentinel::UNKNOWN;
use crate::models::ParsedStream;
use crate::parser::filename::title_case;
use crate::parser::size::{format_duration, format_size};

/// Untagged so host config files can write plain JSON scalars and arrays.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(i64),
    Bool(bool),
    Arr(Vec<String>),
    Null,
}

impl Value {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Num(_) => "number",
            Self::Bool(_) => "boolean",
            Self::Arr(_) => "array",
            Self::Null => "value",
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Num(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Arr(items) => items.join(", "),
            Self::Null => String::new(),
        }
    }

    /// Presence test shared by `exists` and branch selection: sentinels and
    /// empty collections count as absent.
    fn exists(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty() && s != UNKNOWN,
            Self::Arr(items) => !items.is_empty(),
            Self::Num(_) | Self::Bool(_) => true,
            Self::Null => false,
        }
    }
}

fn opt_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |s| Value::Str(s.to_string()))
}

fn opt_num(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Num)
}

/// Everything one render needs: the stream plus the user's config values
/// exposed under the `config` namespace.
pub struct FormatterContext<'a> {
    stream: &'a ParsedStream,
    config: HashMap<String, Value>,
}

enum Resolved {
    Found(Value),
    UnknownNamespace,
    UnknownProperty,
}

impl<'a> FormatterContext<'a> {
    #[must_use]
    pub fn new(stream: &'a ParsedStream) -> Self {
        Self {
            stream,
            config: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_config(stream: &'a ParsedStream, config: HashMap<String, Value>) -> Self {
        Self { stream, config }
    }

    fn resolve(&self, namespace: &str, property: &str) -> Resolved {
        match namespace {
            "stream" => self.resolve_stream(property),
            "provider" => self.resolve_provider(property),
            "addon" => match property {
                "id" => Resolved::Found(Value::Str(self.stream.addon.id.clone())),
                "name" => Resolved::Found(Value::Str(self.stream.addon.name.clone())),
                _ => Resolved::UnknownProperty,
            },
            "config" => self
                .config
                .get(property)
                .map_or(Resolved::UnknownProperty, |v| Resolved::Found(v.clone())),
            // Any property dumps the whole record; useful while authoring.
            "debug" => Resolved::Found(Value::Str(
                serde_json::to_string(self.stream).unwrap_or_default(),
            )),
            _ => Resolved::UnknownNamespace,
        }
    }

    #[allow(clippy::too_many_lines)]
    fn resolve_stream(&self, property: &str) -> Resolved {
        let s = self.stream;
        let value = match property {
            "id" => Value::Str(s.id.clone()),
            "type" => Value::Str(s.stream_type.to_string()),
            "filename" => opt_str(s.filename.as_deref()),
            "folderName" => opt_str(s.folder_name.as_deref()),
            "message" => opt_str(s.message.as_deref()),
            "size" => opt_num(s.size.map(|n| i64::try_from(n).unwrap_or(i64::MAX))),
            "resolution" => Value::Str(s.file.resolution.clone()),
            "quality" => Value::Str(s.file.quality.clone()),
            "encode" => Value::Str(s.file.encode.clone()),
            "releaseGroup" => opt_str(s.file.release_group.as_deref()),
            "visualTags" => Value::Arr(s.file.visual_tags.clone()),
            "audioTags" => Value::Arr(s.file.audio_tags.clone()),
            "languages" => Value::Arr(s.file.languages.clone()),
            "title" => opt_str(s.file.title.as_deref()),
            "year" => opt_str(s.file.year.as_deref()),
            "season" => opt_num(s.file.season.map(i64::from)),
            "seasons" => s.file.seasons.as_ref().map_or(Value::Null, |seasons| {
                Value::Arr(seasons.iter().map(ToString::to_string).collect())
            }),
            "episode" => opt_num(s.file.episode.map(i64::from)),
            "seeders" => opt_num(s.seeders.map(i64::from)),
            "age" => opt_str(s.age.as_deref()),
            "indexer" => opt_str(s.indexer.as_deref()),
            "infoHash" => opt_str(s.info_hash()),
            "duration" => opt_num(s.duration.map(|n| i64::try_from(n).unwrap_or(i64::MAX))),
            "url" => opt_str(s.url.as_deref()),
            "externalUrl" => opt_str(s.external_url.as_deref()),
            "personal" => s.personal.map_or(Value::Null, Value::Bool),
            "proxied" => Value::Bool(s.proxied),
            _ => return Resolved::UnknownProperty,
        };
        Resolved::Found(value)
    }

    fn resolve_provider(&self, property: &str) -> Resolved {
        let provider = self.stream.provider.as_ref();
        match property {
            "id" => Resolved::Found(opt_str(provider.map(|p| p.id.as_str()))),
            "cached" => Resolved::Found(
                provider
                    .and_then(|p| p.cached)
                    .map_or(Value::Null, Value::Bool),
            ),
            _ => Resolved::UnknownProperty,
        }
    }
}

pub(super) fn placeholder(p: &Placeholder, ctx: &FormatterContext) -> String {
    // Tools markers pass through untouched so post-processing can see them.
    if p.namespace == "tools" {
        return format!("{{tools.{}}}", p.property);
    }
    let value = match ctx.resolve(&p.namespace, &p.property) {
        Resolved::Found(v) => v,
        Resolved::UnknownNamespace => return "{unknown_type}".to_string(),
        Resolved::UnknownProperty => return "{unknown_value}".to_string(),
    };
    match &p.modifier {
        None => value.render(),
        Some(m) => apply(&value, m, ctx),
    }
}

fn apply(value: &Value, m: &Modifier, ctx: &FormatterContext) -> String {
    if let Some(outcome) = predicate(value, m) {
        return match &m.branches {
            Some(b) => {
                if outcome {
                    b.truthy.evaluate(ctx)
                } else {
                    b.falsy.evaluate(ctx)
                }
            }
            None => outcome.to_string(),
        };
    }
    transform(value, m).unwrap_or_else(|| {
        format!("{{unknown_{}_modifier({})}}", value.kind(), m.name)
    })
}

/// `Some` for predicate modifiers, `None` when the name is not a predicate
/// for this value type.
fn predicate(value: &Value, m: &Modifier) -> Option<bool> {
    let name = m.name.as_str();
    if name == "exists" {
        return Some(value.exists());
    }
    let arg = m.arg.as_deref().unwrap_or("");
    match value {
        Value::Bool(b) => match name {
            "istrue" => Some(*b),
            "isfalse" => Some(!b),
            _ => None,
        },
        Value::Str(s) => match name {
            "=" => Some(s.eq_ignore_ascii_case(arg)),
            "$" => Some(s.to_lowercase().starts_with(&arg.to_lowercase())),
            "^" => Some(s.to_lowercase().ends_with(&arg.to_lowercase())),
            "~" => Some(s.to_lowercase().contains(&arg.to_lowercase())),
            _ => None,
        },
        #[allow(clippy::cast_precision_loss)]
        Value::Num(n) => {
            let operand: f64 = arg.parse().unwrap_or(f64::NAN);
            let n = *n as f64;
            match name {
                ">" => Some(n > operand),
                ">=" => Some(n >= operand),
                "=" => Some((n - operand).abs() < f64::EPSILON),
                "<=" => Some(n <= operand),
                "<" => Some(n < operand),
                _ => None,
            }
        }
        // A missing value fails every test except isfalse, so templates can
        // treat absent booleans as false.
        Value::Null => match name {
            "istrue" | "=" | "$" | "^" | "~" | ">" | ">=" | "<=" | "<" => Some(false),
            "isfalse" => Some(true),
            _ => None,
        },
        Value::Arr(_) => None,
    }
}

/// Transform names accepted for at least one value type. A Null under one of
/// these renders empty; a name outside the set still surfaces the unknown
/// marker so template typos stay visible on absent fields.
const TRANSFORM_NAMES: &[&str] = &[
    "join", "length", "first", "last", "random", "sort", "reverse", "upper", "lower", "title",
    "base64", "string", "comma", "hex", "octal", "binary", "bytes", "time",
];

fn transform(value: &Value, m: &Modifier) -> Option<String> {
    let name = m.name.as_str();
    match value {
        Value::Null => TRANSFORM_NAMES.contains(&name).then(String::new),
        Value::Arr(items) => match name {
            "join" => Some(items.join(m.arg.as_deref().unwrap_or(", "))),
            "length" => Some(items.len().to_string()),
            "first" => Some(items.first().cloned().unwrap_or_default()),
            "last" => Some(items.last().cloned().unwrap_or_default()),
            "random" => Some(items.choose(&mut rand::rng()).cloned().unwrap_or_default()),
            "sort" => {
                let mut sorted = items.clone();
                sorted.sort();
                Some(sorted.join(", "))
            }
            "reverse" => {
                let reversed: Vec<String> = items.iter().rev().cloned().collect();
                Some(reversed.join(", "))
            }
            _ => None,
        },
        Value::Str(s) => match name {
            "upper" => Some(s.to_uppercase()),
            "lower" => Some(s.to_lowercase()),
            "title" => Some(title_case(s)),
            "length" => Some(s.chars().count().to_string()),
            "reverse" => Some(s.chars().rev().collect()),
            "base64" => Some(STANDARD.encode(s)),
            "string" => Some(s.clone()),
            _ => None,
        },
        Value::Num(n) => match name {
            "comma" => Some(group_thousands(*n)),
            "hex" => Some(format!("{n:x}")),
            "octal" => Some(format!("{n:o}")),
            "binary" => Some(format!("{n:b}")),
            "bytes" => Some(format_size(u64::try_from(*n).unwrap_or(0))),
            "time" => Some(format_duration(u64::try_from(*n).unwrap_or(0))),
            "string" => Some(n.to_string()),
            _ => None,
        },
        Value::Bool(b) => match name {
            "string" => Some(b.to_string()),
            _ => None,
        },
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::render;
    use crate::models::Torrent;

    fn stream() -> ParsedStream {
        let mut s = ParsedStream {
            size: Some(1_234_567_890),
            duration: Some(5_400_000),
            torrent: Some(Torrent {
                info_hash: Some("c9e15763f722f23e98a29decdfae341b98d53056".to_string()),
                ..Torrent::default()
            }),
            ..ParsedStream::default()
        };
        s.file.title = Some("the matrix".to_string());
        s.file.audio_tags = vec!["DTS".to_string(), "Atmos".to_string()];
        s
    }

    fn render_with(template: &str, s: &ParsedStream) -> String {
        render(template, &FormatterContext::new(s)).unwrap()
    }

    #[test]
    fn test_exists_without_branches_renders_bool() {
        assert_eq!(render_with("{stream.title::exists}", &stream()), "true");
        assert_eq!(
            render_with("{stream.filename::exists}", &stream()),
            "false"
        );
    }

    #[test]
    fn test_unknown_sentinel_does_not_exist() {
        // resolution defaults to the sentinel, which counts as absent
        assert_eq!(
            render_with("{stream.resolution::exists[y||n]}", &stream()),
            "n"
        );
    }

    #[test]
    fn test_string_transforms() {
        let s = stream();
        assert_eq!(render_with("{stream.title::upper}", &s), "THE MATRIX");
        assert_eq!(render_with("{stream.title::title}", &s), "The Matrix");
        assert_eq!(render_with("{stream.title::length}", &s), "10");
        assert_eq!(
            render_with("{stream.title::base64}", &s),
            STANDARD.encode("the matrix")
        );
    }

    #[test]
    fn test_array_transforms() {
        let s = stream();
        assert_eq!(render_with("{stream.audioTags::first}", &s), "DTS");
        assert_eq!(render_with("{stream.audioTags::last}", &s), "Atmos");
        assert_eq!(render_with("{stream.audioTags::sort}", &s), "Atmos, DTS");
        assert_eq!(render_with("{stream.audioTags::length}", &s), "2");
        assert_eq!(render_with("{stream.audioTags::reverse}", &s), "Atmos, DTS");
    }

    #[test]
    fn test_random_picks_a_member() {
        let s = stream();
        let out = render_with("{stream.audioTags::random}", &s);
        assert!(out == "DTS" || out == "Atmos", "got {out}");
    }

    #[test]
    fn test_number_transforms() {
        let s = stream();
        assert_eq!(render_with("{stream.size::comma}", &s), "1,234,567,890");
        assert_eq!(render_with("{stream.size::hex}", &s), "499602d2");
        assert_eq!(render_with("{stream.size::bytes}", &s), "1.15 GiB");
        assert_eq!(render_with("{stream.duration::time}", &s), "1h 30m");
    }

    #[test]
    fn test_string_contains_test_is_case_insensitive() {
        assert_eq!(
            render_with("{stream.title::~MATRIX[hit||miss]}", &stream()),
            "hit"
        );
    }

    #[test]
    fn test_null_renders_empty_and_fails_tests() {
        let s = stream();
        assert_eq!(render_with("a{stream.message}b", &s), "ab");
        assert_eq!(render_with("{stream.message::upper}", &s), "");
        assert_eq!(render_with("{stream.personal::isfalse[n||y]}", &s), "n");
        assert_eq!(render_with("{stream.personal::istrue[y||n]}", &s), "n");
    }

    #[test]
    fn test_null_under_misspelled_modifier_keeps_marker() {
        // message is absent, but a typo should not silently vanish
        assert_eq!(
            render_with("{stream.message::frobnicat}", &stream()),
            "{unknown_value_modifier(frobnicat)}"
        );
    }

    #[test]
    fn test_info_hash_property() {
        assert_eq!(
            render_with("{stream.infoHash::$c9e1[ok||no]}", &stream()),
            "ok"
        );
    }

    #[test]
    fn test_debug_namespace_dumps_json() {
        let out = render_with("{debug.stream}", &stream());
        assert!(out.contains("\"infoHash\":\"c9e15763f722f23e98a29decdfae341b98d53056\""));
    }

    #[test]
    fn test_config_namespace() {
        let s = stream();
        let mut config = HashMap::new();
        config.insert("theme".to_string(), Value::Str("compact".to_string()));
        let ctx = FormatterContext::with_config(&s, config);
        assert_eq!(render("{config.theme}", &ctx).unwrap(), "compact");
        assert_eq!(render("{config.missing}", &ctx).unwrap(), "{unknown_value}");
    }

    #[test]
    fn test_group_thousands_negative() {
        assert_eq!(group_thousands(-1234), "-1,234");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(0), "0");
    }
}
