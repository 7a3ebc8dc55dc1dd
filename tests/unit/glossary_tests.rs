/*!
 * Tests for glossary loading, matching and prompt context
 */

use runalign::alignment::PhraseMappings;
use runalign::{Glossary, GlossaryEntry};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_load_withEntriesFile_shouldSortByPriorityThenLength() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(
        temp_dir.path(),
        "glossary.json",
        r#"{"entries":[
            {"source":"bill","target":"projet de loi"},
            {"source":"Senate","target":"Sénat","priority":10},
            {"source":"House of Commons","target":"Chambre des communes"}
        ]}"#,
    )
    .unwrap();

    let glossary = Glossary::load(&path).unwrap();
    let sources: Vec<_> = glossary.entries().iter().map(|e| e.source.as_str()).collect();
    assert_eq!(sources, vec!["Senate", "House of Commons", "bill"]);
}

#[test]
fn test_load_withMissingFile_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let error = Glossary::load(temp_dir.path().join("nope.json")).unwrap_err();
    assert!(error.to_string().contains("Failed to read glossary file"));
}

#[test]
fn test_load_withInvalidJson_shouldFail() {
    let temp_dir = create_temp_dir().unwrap();
    let path = create_test_file(temp_dir.path(), "glossary.json", "not json").unwrap();
    assert!(Glossary::load(&path).is_err());
}

#[test]
fn test_phraseMappings_shouldExtendBuiltinTable() {
    let glossary = Glossary::from_json(r#"{"Senate":"Sénat","disability":"déficience"}"#).unwrap();
    let mut mappings = PhraseMappings::builtin();
    mappings.extend(&glossary.phrase_mappings());

    assert!(mappings.contains_pair("senate", "sénat"));
    let targets = mappings.targets("disability").unwrap();
    assert_eq!(targets.first().map(String::as_str), Some("handicap"));
    assert_eq!(targets.last().map(String::as_str), Some("déficience"));
}

#[test]
fn test_matchingEntries_withCaseSensitiveEntry_shouldMatchExactCaseOnly() {
    let mut entry = GlossaryEntry::new("WHO", "OMS");
    entry.case_sensitive = true;
    let glossary = Glossary::from_entries(vec![entry]);

    assert!(glossary.matching_entries("who knows", None).is_empty());
    assert_eq!(glossary.matching_entries("the WHO said", None).len(), 1);
}

#[test]
fn test_matchingEntries_shouldReturnMatchesInTextOrder() {
    let glossary = Glossary::from_entries(vec![
        GlossaryEntry::new("Senate", "Sénat"),
        GlossaryEntry::new("bill", "projet de loi").with_priority(3),
    ]);
    let found = glossary.matching_entries("The Senate passed the bill", None);
    let sources: Vec<_> = found.iter().map(|m| m.entry.source.as_str()).collect();
    assert_eq!(sources, vec!["Senate", "bill"]);
}

#[test]
fn test_promptContext_shouldRespectMaxEntries() {
    let glossary = Glossary::from_entries(vec![
        GlossaryEntry::new("Senate", "Sénat"),
        GlossaryEntry::new("bill", "projet de loi"),
    ]);
    let context = glossary.prompt_context("The Senate passed the bill", 1).unwrap();
    assert!(context.starts_with("TERMINOLOGY GLOSSARY"));
    assert_eq!(context.lines().filter(|l| l.starts_with("- ")).count(), 1);
}

#[test]
fn test_addEntry_shouldKeepOrdering() {
    let mut glossary = Glossary::new();
    glossary.add_entry(GlossaryEntry::new("a", "b"));
    glossary.add_entry(GlossaryEntry::new("Crown", "Couronne").with_priority(5));
    assert_eq!(glossary.entries()[0].source, "Crown");
    assert_eq!(glossary.len(), 2);
}
