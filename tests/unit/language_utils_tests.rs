/*!
 * Tests for language utility functions
 */

use runalign::language_utils::{get_language_name, language_codes_match, normalize_to_part2t};

#[test]
fn test_normalize_withPart1Code_shouldReturnPart2t() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t(" FR ").unwrap(), "fra");
}

#[test]
fn test_normalize_withBibliographicCode_shouldReturnTerminologyCode() {
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("deu").unwrap(), "deu");
}

#[test]
fn test_normalize_withInvalidCode_shouldFail() {
    assert!(normalize_to_part2t("xx").is_err());
    assert!(normalize_to_part2t("english").is_err());
    assert!(normalize_to_part2t("").is_err());
}

#[test]
fn test_languageCodesMatch_shouldCompareAcrossStandards() {
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fr", "fra"));
    assert!(!language_codes_match("fr", "en"));
    assert!(!language_codes_match("fr", "zz"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("fr").unwrap(), "French");
    assert!(get_language_name("qq").is_err());
}
