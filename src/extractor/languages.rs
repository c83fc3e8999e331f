//! Flag-emoji and ISO-639-1 lookups used to enrich languages from
//! description text. Two independent tables: country (from a regional
//! indicator pair) to language, and bare two-letter code to language.

/// Decodes regional-indicator pairs (🇫🇷 → `FR`) anywhere in the text.
#[must_use]
pub fn extract_flag_countries(text: &str) -> Vec<String> {
    const RI_BASE: u32 = 0x1F1E6;
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let first = u32::from(c);
        if (RI_BASE..=RI_BASE + 25).contains(&first)
            && let Some(&next) = chars.peek()
        {
            let second = u32::from(next);
            if (RI_BASE..=RI_BASE + 25).contains(&second) {
                chars.next();
                let a = char::from(b'A' + u8::try_from(first - RI_BASE).unwrap_or(0));
                let b = char::from(b'A' + u8::try_from(second - RI_BASE).unwrap_or(0));
                out.push(format!("{a}{b}"));
            }
        }
    }
    out
}

#[must_use]
pub fn country_to_language(country: &str) -> Option<&'static str> {
    let lang = match country.to_ascii_uppercase().as_str() {
        "GB" | "UK" | "US" | "AU" | "NZ" | "IE" | "CA" => "English",
        "FR" => "French",
        "DE" | "AT" => "German",
        "ES" | "MX" | "AR" | "CO" | "CL" => "Spanish",
        "IT" => "Italian",
        "JP" => "Japanese",
        "KR" => "Korean",
        "CN" | "TW" | "HK" => "Chinese",
        "RU" => "Russian",
        "BR" | "PT" => "Portuguese",
        "IN" => "Hindi",
        "NL" | "BE" => "Dutch",
        "PL" => "Polish",
        "TR" => "Turkish",
        "SE" => "Swedish",
        "NO" => "Norwegian",
        "DK" => "Danish",
        "FI" => "Finnish",
        "CZ" => "Czech",
        "HU" => "Hungarian",
        "RO" => "Romanian",
        "UA" => "Ukrainian",
        "GR" => "Greek",
        "IL" => "Hebrew",
        "TH" => "Thai",
        "VN" => "Vietnamese",
        "ID" => "Indonesian",
        "SA" | "AE" | "EG" => "Arabic",
        _ => return None,
    };
    Some(lang)
}

#[must_use]
pub fn code_to_language(code: &str) -> Option<&'static str> {
    let lang = match code.to_ascii_lowercase().as_str() {
        "en" => "English",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "ru" => "Russian",
        "pt" => "Portuguese",
        "hi" => "Hindi",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "sv" => "Swedish",
        "no" => "Norwegian",
        "da" => "Danish",
        "fi" => "Finnish",
        "cs" => "Czech",
        "hu" => "Hungarian",
        "ro" => "Romanian",
        "uk" => "Ukrainian",
        "el" => "Greek",
        "he" => "Hebrew",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "ar" => "Arabic",
        _ => return None,
    };
    Some(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flag_countries() {
        assert_eq!(extract_flag_countries("🇫🇷 🇮🇹 audio"), vec!["FR", "IT"]);
        assert!(extract_flag_countries("no flags here").is_empty());
    }

    #[test]
    fn test_country_lookup() {
        assert_eq!(country_to_language("FR"), Some("French"));
        assert_eq!(country_to_language("gb"), Some("English"));
        assert_eq!(country_to_language("XX"), None);
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(code_to_language("EN"), Some("English"));
        assert_eq!(code_to_language("cs"), Some("Czech"));
        assert_eq!(code_to_language("qq"), None);
    }
}
