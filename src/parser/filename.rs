//! Ordered pattern tables mapping release-name tokens to structured labels.
//!
//! Resolution, quality and encode are first-match-wins over the table
//! order; tags and languages are collect-all-matches. Every pattern matches
//! whole tokens bounded by scene separators, so `HDTV` never lights up the
//! `HD` resolution entry and `HDR10+` never doubles as `HDR10`.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ParsedFile;
use crate::parser::release_name;
use crate::safe_regex::form_regex_from_keywords;

type PatternTable = Vec<(&'static str, Regex)>;

fn build_table(entries: &[(&'static str, &[&str])]) -> PatternTable {
    entries
        .iter()
        .map(|(label, keywords)| {
            let pattern = format!("(?i){}", form_regex_from_keywords(keywords));
            let re = Regex::new(&pattern).expect("Invalid regex pattern defined in code");
            (*label, re)
        })
        .collect()
}

static RESOLUTIONS: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        ("2160p", &["2160p", "4k", "uhd"]),
        ("1440p", &["1440p", "2k", "qhd"]),
        ("1080p", &["1080p", "fhd"]),
        ("720p", &["720p", "hd"]),
        ("576p", &["576p"]),
        ("480p", &["480p", "sd"]),
    ])
});

static QUALITIES: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        (
            "BluRay REMUX",
            &["bluray remux", "bd remux", "bdremux", "remux"],
        ),
        (
            "BluRay",
            &["bluray", "blu-ray", "bd", "bdrip", "brrip", "bray"],
        ),
        ("WEB-DL", &["web-dl", "webdl", "web dl", "web"]),
        ("WEBRip", &["webrip", "web-rip", "web rip"]),
        ("HDRip", &["hdrip", "hd-rip"]),
        ("HC HD-Rip", &["hc", "hc hdrip"]),
        ("DVDRip", &["dvdrip", "dvd-rip", "dvd"]),
        ("HDTV", &["hdtv", "pdtv", "dsr"]),
        ("CAM", &["cam", "camrip", "hdcam"]),
        ("TS", &["ts", "telesync", "hdts"]),
        ("TC", &["tc", "telecine"]),
        ("SCR", &["scr", "screener", "dvdscr", "bdscr"]),
    ])
});

static ENCODES: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        ("HEVC", &["hevc", "x265", "h265", "h.265"]),
        ("AVC", &["avc", "x264", "h264", "h.264"]),
        ("AV1", &["av1"]),
        ("Xvid", &["xvid"]),
        ("DivX", &["divx"]),
        ("MPEG", &["mpeg", "mpeg2", "mpeg-2"]),
    ])
});

static VISUAL_TAGS: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        ("HDR10+", &["hdr10+", "hdr10plus", "hdr10 plus"]),
        ("HDR10", &["hdr10"]),
        ("HDR", &["hdr"]),
        ("DV", &["dv", "dolby vision", "dovi"]),
        ("3D", &["3d", "sbs", "half-sbs"]),
        ("IMAX", &["imax"]),
        ("AI", &["ai upscale", "ai-upscaled", "upscaled", "upscale"]),
        ("SDR", &["sdr"]),
    ])
});

static AUDIO_TAGS: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        ("Atmos", &["atmos"]),
        (
            "DD+",
            &["dd+", "ddp", "eac3", "e-ac3", "e-ac-3", "ddp5.1", "ddp7.1", "ddp2.0"],
        ),
        ("DD", &["dd", "ac3", "ac-3", "dd5.1", "dd2.0"]),
        ("DTS-HD MA", &["dts-hd ma", "dtshd ma", "dts-hd.ma"]),
        ("DTS-HD", &["dts-hd", "dtshd"]),
        ("DTS", &["dts", "dts-x", "dtsx"]),
        ("TrueHD", &["truehd", "true-hd"]),
        ("5.1", &["5.1"]),
        ("7.1", &["7.1"]),
        ("AAC", &["aac", "aac2.0", "aac 2.0"]),
        ("FLAC", &["flac"]),
        ("OPUS", &["opus"]),
    ])
});

static LANGUAGES: LazyLock<PatternTable> = LazyLock::new(|| {
    build_table(&[
        ("Multi", &["multi", "multi audio", "multi-audio"]),
        ("Dual Audio", &["dual audio", "dual-audio", "dual"]),
        ("Dubbed", &["dubbed", "dub"]),
        ("English", &["english", "eng", "en"]),
        ("Japanese", &["japanese", "jpn", "jap", "ja"]),
        ("Chinese", &["chinese", "chi", "zho", "zh", "mandarin", "cantonese"]),
        ("Russian", &["russian", "rus", "ru"]),
        ("Arabic", &["arabic", "ara", "ar"]),
        (
            "Portuguese",
            &["portuguese", "por", "pt", "pt-br", "pt-pt", "brazilian"],
        ),
        ("Spanish", &["spanish", "spa", "esp", "es", "latino", "lat", "castellano"]),
        (
            "French",
            &["french", "fre", "fra", "fr", "vf", "vff", "vfq", "vostfr", "truefrench"],
        ),
        ("German", &["german", "ger", "deu", "de"]),
        ("Italian", &["italian", "ita", "it"]),
        ("Korean", &["korean", "kor", "ko"]),
        ("Hindi", &["hindi", "hin", "hi"]),
        ("Tamil", &["tamil", "tam"]),
        ("Telugu", &["telugu", "tel"]),
        ("Dutch", &["dutch", "nld", "dut", "nl"]),
        ("Polish", &["polish", "pol", "pl", "lektor"]),
        ("Turkish", &["turkish", "tur", "tr"]),
        ("Swedish", &["swedish", "swe", "sv"]),
        ("Norwegian", &["norwegian", "nor"]),
        ("Danish", &["danish", "dan", "da"]),
        ("Finnish", &["finnish", "fin", "fi"]),
        ("Czech", &["czech", "cze", "ces", "cz"]),
        ("Hungarian", &["hungarian", "hun", "hu"]),
        ("Romanian", &["romanian", "rum", "ron", "ro"]),
        ("Ukrainian", &["ukrainian", "ukr", "uk"]),
        ("Greek", &["greek", "gre", "ell", "el"]),
        ("Hebrew", &["hebrew", "heb", "he"]),
        ("Thai", &["thai", "tha", "th"]),
        ("Vietnamese", &["vietnamese", "vie", "vi"]),
        ("Indonesian", &["indonesian", "ind"]),
    ])
});

/// Resolution label alone, for the display-name fallback pass.
#[must_use]
pub fn detect_resolution(text: &str) -> Option<&'static str> {
    first_match(&RESOLUTIONS, text)
}

fn first_match(table: &PatternTable, text: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
}

fn collect_matches(table: &PatternTable, text: &str) -> Vec<String> {
    let collected: Vec<&'static str> = table
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
        .collect();
    // Family subsumption: a label that is a substring of another collected
    // label (DTS under DTS-HD MA, HDR under HDR10) adds no information.
    collected
        .iter()
        .filter(|label| {
            !collected
                .iter()
                .any(|other| other != *label && other.contains(**label))
        })
        .map(|label| (*label).to_string())
        .collect()
}

/// Merges `extra` into `languages`, deduplicating case-insensitively.
pub fn merge_languages(languages: &mut Vec<String>, extra: impl IntoIterator<Item = String>) {
    for lang in extra {
        let lang = title_case(lang.trim());
        if lang.is_empty() {
            continue;
        }
        if !languages.iter().any(|l| l.eq_ignore_ascii_case(&lang)) {
            languages.push(lang);
        }
    }
}

#[must_use]
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Structured fields from a single release name, source-independent.
/// Resolution/quality/encode fall back to `"Unknown"`; the structural
/// fields come from the release-name collaborator and may all be absent.
#[must_use]
pub fn parse_filename(text: &str) -> ParsedFile {
    let structural = release_name::parse(text);

    let mut file = ParsedFile {
        resolution: first_match(&RESOLUTIONS, text)
            .unwrap_or(crate::constants::sentinel::UNKNOWN)
            .to_string(),
        quality: first_match(&QUALITIES, text)
            .unwrap_or(crate::constants::sentinel::UNKNOWN)
            .to_string(),
        encode: first_match(&ENCODES, text)
            .unwrap_or(crate::constants::sentinel::UNKNOWN)
            .to_string(),
        visual_tags: collect_matches(&VISUAL_TAGS, text),
        audio_tags: collect_matches(&AUDIO_TAGS, text),
        languages: Vec::new(),
        release_group: structural.group,
        title: structural.title,
        year: structural.year,
        season: structural.season,
        seasons: structural.seasons,
        episode: structural.episode,
    };
    merge_languages(&mut file.languages, collect_matches(&LANGUAGES, text));
    file
}
