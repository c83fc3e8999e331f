//! Best-effort structural parser for scene-style release names.
//!
//! Contract: pure, never panics, `None` everywhere on failure. Consumers
//! treat this as a black box; nothing downstream depends on *how* a title
//! or episode was recovered.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseName {
    pub title: Option<String>,
    pub year: Option<String>,
    pub season: Option<u32>,
    pub seasons: Option<Vec<u32>>,
    pub episode: Option<u32>,
    pub group: Option<String>,
}

static SXXEXX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\[\(])S(\d{1,2})[\s._]?E(\d{1,4})(?:[\s._\-\]\)]|$)")
        .expect("Invalid regex pattern defined in code")
});

static SEASON_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\[\(])S(\d{1,2})\s?[-~]\s?S?(\d{1,2})(?:[\s._\-\]\)]|$)")
        .expect("Invalid regex pattern defined in code")
});

static SEASON_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\[\(])(?:S(\d{1,2})|Season\s?(\d{1,2}))(?:[\s._\-\]\)]|$)")
        .expect("Invalid regex pattern defined in code")
});

static NXNN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\[\(])(\d{1,2})x(\d{2,3})(?:[\s._\-\]\)]|$)")
        .expect("Invalid regex pattern defined in code")
});

static EPISODE_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s._\-\[\(])(?:E|Ep|Episode[\s._]?)(\d{1,4})(?:[\s._\-\]\)]|$)")
        .expect("Invalid regex pattern defined in code")
});

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("Invalid regex pattern defined in code")
});

static TRAILING_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\s?([A-Za-z0-9][A-Za-z0-9_]*)(?:\.[A-Za-z0-9]{2,4})?\s*$")
        .expect("Invalid regex pattern defined in code")
});

static LEADING_BRACKET_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]").expect("Invalid regex pattern defined in code")
});

/// Known file extensions, so a trailing `.mkv` is not mistaken for part of a
/// release group.
static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mkv|mp4|avi|webm|mov|wmv|flv|m4v|ts)\s*$")
        .expect("Invalid regex pattern defined in code")
});

#[must_use]
pub fn parse(text: &str) -> ReleaseName {
    let text = text.trim();
    if text.is_empty() {
        return ReleaseName::default();
    }
    let stem = EXTENSION_RE.replace(text, "");

    let mut out = ReleaseName::default();

    // Season/episode markers, most specific first.
    let mut marker_start = None;
    if let Some(caps) = SXXEXX_RE.captures(&stem) {
        out.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        out.episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        marker_start = caps.get(0).map(|m| m.start());
    } else if let Some(caps) = SEASON_RANGE_RE.captures(&stem) {
        let first: Option<u32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let last: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let (Some(first), Some(last)) = (first, last)
            && first <= last
        {
            out.season = Some(first);
            out.seasons = Some((first..=last).collect());
        }
        marker_start = caps.get(0).map(|m| m.start());
    } else if let Some(caps) = NXNN_RE.captures(&stem) {
        out.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        out.episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        marker_start = caps.get(0).map(|m| m.start());
    } else if let Some(caps) = SEASON_ONLY_RE.captures(&stem) {
        out.season = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok());
        marker_start = caps.get(0).map(|m| m.start());
        if let Some(caps) = EPISODE_ONLY_RE.captures(&stem) {
            out.episode = caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
    } else if let Some(caps) = EPISODE_ONLY_RE.captures(&stem) {
        out.episode = caps.get(1).and_then(|m| m.as_str().parse().ok());
        marker_start = caps.get(0).map(|m| m.start());
    }

    if let Some(caps) = YEAR_RE.captures(&stem) {
        out.year = caps.get(1).map(|m| m.as_str().to_string());
        let year_start = caps.get(0).map_or(usize::MAX, |m| m.start());
        marker_start = Some(marker_start.map_or(year_start, |m| m.min(year_start)));
    }

    out.group = extract_group(&stem);
    out.title = extract_title(&stem, marker_start);
    out
}

fn extract_group(stem: &str) -> Option<String> {
    if let Some(caps) = LEADING_BRACKET_GROUP_RE.captures(stem) {
        let group = caps.get(1)?.as_str().trim();
        if !group.is_empty() {
            return Some(group.to_string());
        }
    }
    let caps = TRAILING_GROUP_RE.captures(stem)?;
    let group = caps.get(1)?.as_str();
    // A bare year or resolution at the end is metadata, not a group.
    if YEAR_RE.is_match(group) || group.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(group.to_string())
}

fn extract_title(stem: &str, marker_start: Option<usize>) -> Option<String> {
    let head = marker_start.map_or(stem, |idx| &stem[..idx]);
    // Strip a leading [group] tag before cleaning.
    let head = LEADING_BRACKET_GROUP_RE.replace(head, "");
    let cleaned = clean_title(&head);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Collapses scene separators into spaces and trims stray punctuation.
#[must_use]
pub fn clean_title(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for c in raw.chars() {
        let is_sep = c.is_whitespace() || matches!(c, '.' | '_');
        if is_sep {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }
    result
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '[' | ']' | ')'))
        .to_string()
}

/// Lowercased, punctuation-free form for cross-source comparison.
#[must_use]
pub fn normalize_for_matching(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_separated_episode() {
        let r = parse("Attack.on.Titan.S04E28.1080p.WEB.x264-SENPAI.mkv");
        assert_eq!(r.title.as_deref(), Some("Attack on Titan"));
        assert_eq!(r.season, Some(4));
        assert_eq!(r.episode, Some(28));
        assert_eq!(r.group.as_deref(), Some("SENPAI"));
        assert_eq!(r.year, None);
    }

    #[test]
    fn test_movie_with_year() {
        let r = parse("Movie.Title.2023.2160p.BluRay.HEVC.DV.TrueHD.Atmos.7.1.iTA.ENG-GROUP.mkv");
        assert_eq!(r.title.as_deref(), Some("Movie Title"));
        assert_eq!(r.year.as_deref(), Some("2023"));
        assert_eq!(r.group.as_deref(), Some("GROUP"));
        assert_eq!(r.season, None);
        assert_eq!(r.episode, None);
    }

    #[test]
    fn test_season_range() {
        let r = parse("Show.Name.S01-S03.1080p.COMPLETE");
        assert_eq!(r.season, Some(1));
        assert_eq!(r.seasons, Some(vec![1, 2, 3]));
        assert_eq!(r.title.as_deref(), Some("Show Name"));
    }

    #[test]
    fn test_nxnn_format() {
        let r = parse("Show Name 2x05 720p HDTV");
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episode, Some(5));
    }

    #[test]
    fn test_leading_bracket_group() {
        let r = parse("[SubsPlease] Frieren S01E01 (1080p)");
        assert_eq!(r.group.as_deref(), Some("SubsPlease"));
        assert_eq!(r.title.as_deref(), Some("Frieren"));
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episode, Some(1));
    }

    #[test]
    fn test_marker_at_start_of_name() {
        let r = parse("S01E05.Show.Name.720p.mkv");
        assert_eq!(r.season, Some(1));
        assert_eq!(r.episode, Some(5));
        // No text precedes the marker, so there is no title to recover.
        assert_eq!(r.title, None);

        let r = parse("2x05 Show Name 720p");
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episode, Some(5));
    }

    #[test]
    fn test_season_only_pack() {
        let r = parse("Breaking.Bad.Season 2.Complete.1080p");
        assert_eq!(r.season, Some(2));
        assert_eq!(r.episode, None);
    }

    #[test]
    fn test_garbage_degrades_to_defaults() {
        assert_eq!(parse(""), ReleaseName::default());
        let r = parse("!!!????");
        assert_eq!(r.season, None);
        assert_eq!(r.episode, None);
        assert_eq!(r.year, None);
    }

    #[test]
    fn test_trailing_year_is_not_a_group() {
        let r = parse("Some.Movie.Title-2023");
        assert_eq!(r.group, None);
        assert_eq!(r.year.as_deref(), Some("2023"));
    }

    #[test]
    fn test_normalize_for_matching() {
        assert_eq!(normalize_for_matching("Re:Zero"), "rezero");
        assert_eq!(
            normalize_for_matching("My  Hero   Academia!"),
            "my hero academia"
        );
    }
}
