/*!
 * Tests for language utility functions
 */

use anyhow::Result;
use doctrans::language_utils::{
    get_language_name, language_codes_match, normalize_to_part2t, prompt_language_name,
};

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalizeToPart2t_withValidCodes_shouldNormalizeCorrectly() -> Result<()> {
    assert_eq!(normalize_to_part2t("en")?, "eng");
    assert_eq!(normalize_to_part2t("zh")?, "zho");
    assert_eq!(normalize_to_part2t("fra")?, "fra");
    assert_eq!(normalize_to_part2t("fre")?, "fra");
    assert_eq!(normalize_to_part2t(" JA ")?, "jpn");
    Ok(())
}

#[test]
fn test_normalizeToPart2t_withInvalidCodes_shouldFail() {
    assert!(normalize_to_part2t("xyz").is_err());
    assert!(normalize_to_part2t("e").is_err());
    assert!(normalize_to_part2t("").is_err());
}

#[test]
fn test_languageCodesMatch_withEquivalentCodes_shouldMatch() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("de", "ger"));
    assert!(!language_codes_match("en", "zh"));
}

#[test]
fn test_getLanguageName_withVariousFormats_shouldReturnName() -> Result<()> {
    assert_eq!(get_language_name("ja")?, "Japanese");
    assert_eq!(get_language_name("spa")?, "Spanish");
    assert!(get_language_name("xx").is_err());
    Ok(())
}

#[test]
fn test_promptLanguageName_withAutoOrEmpty_shouldLeaveDetectionToModel() {
    assert_eq!(prompt_language_name("auto"), None);
    assert_eq!(prompt_language_name("AUTO"), None);
    assert_eq!(prompt_language_name("  "), None);
    assert_eq!(prompt_language_name("zh"), Some("Chinese".to_string()));
}
