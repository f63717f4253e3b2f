use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Configuration stores ISO 639-1 (2-letter) or ISO 639-2 (3-letter) codes,
/// while prompts need readable English names.
/// Map an ISO 639-2/B code to its ISO 639-2/T form
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    let mapped = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(mapped)
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
                return Ok(part2t.to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Name to put in a prompt; `None` for "auto" (let the model detect it).
/// Unknown codes are passed through verbatim.
pub fn prompt_language_name(code: &str) -> Option<String> {
    if code.trim().is_empty() || code.eq_ignore_ascii_case("auto") {
        return None;
    }
    Some(get_language_name(code).unwrap_or_else(|_| code.trim().to_string()))
}
