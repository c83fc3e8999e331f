use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which base a source uses for its decimal-suffixed units. Binary-suffixed
/// units (`GiB` etc.) are always 1024 regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitBase {
    #[default]
    Decimal,
    Binary,
}

impl UnitBase {
    const fn factor(self) -> f64 {
        match self {
            Self::Decimal => 1000.0,
            Self::Binary => 1024.0,
        }
    }
}

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*([KMGT]i?B)\b")
        .expect("Invalid regex pattern defined in code")
});

/// Finds the first size expression anywhere in free text and converts it to
/// bytes. `1.5 GiB` is always binary; `1.5 GB` uses the caller's base.
#[must_use]
pub fn parse_size_text(text: &str, base: UnitBase) -> Option<u64> {
    let caps = SIZE_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let unit = caps.get(2)?.as_str().to_uppercase();

    let (exponent, factor) = match unit.as_str() {
        "KB" => (1, base.factor()),
        "MB" => (2, base.factor()),
        "GB" => (3, base.factor()),
        "TB" => (4, base.factor()),
        "KIB" => (1, 1024.0),
        "MIB" => (2, 1024.0),
        "GIB" => (3, 1024.0),
        "TIB" => (4, 1024.0),
        _ => return None,
    };

    // Round, not truncate: 24.22 * 1e9 sits a hair below the integer.
    let bytes = (value * factor.powi(exponent)).round();
    if bytes.is_finite() && bytes >= 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(bytes as u64)
    } else {
        None
    }
}

#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    #[allow(clippy::cast_precision_loss)]
    if bytes >= TB {
        format!("{:.2} TiB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Renders a millisecond duration as the largest two units that apply,
/// e.g. `2h 15m`, `45m 30s`, `12s`.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    } else if minutes > 0 {
        if seconds > 0 {
            format!("{minutes}m {seconds}s")
        } else {
            format!("{minutes}m")
        }
    } else {
        format!("{seconds}s")
    }
}
