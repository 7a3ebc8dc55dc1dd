/*!
 * Terminology glossary.
 *
 * A glossary feeds the aligners in two ways: its entries become phrase
 * mappings for the similarity scorer, and the entries relevant to a paragraph
 * are rendered as extra context for term lookups.
 */

use anyhow::{Context, Result};
use log::{info, warn};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Entries at or above this priority are always included in prompt context
const HIGH_PRIORITY: i32 = 10;

/// One source term and its required translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
    /// Only applies when this text occurs in the surrounding context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Higher priority entries win on overlap
    #[serde(default)]
    pub priority: i32,
}

impl GlossaryEntry {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            context: None,
            case_sensitive: false,
            notes: None,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn context_allows(&self, context: Option<&str>) -> bool {
        match (&self.context, context) {
            (Some(required), Some(actual)) => actual.to_lowercase().contains(&required.to_lowercase()),
            _ => true,
        }
    }
}

/// Accepted on-disk layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum GlossaryFile {
    Entries { entries: Vec<GlossaryEntry> },
    Map(HashMap<String, String>),
}

/// A term match inside a text, as a byte range
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryMatch<'a> {
    pub entry: &'a GlossaryEntry,
    pub start: usize,
    pub end: usize,
}

/// Ordered collection of glossary entries
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<GlossaryEntry>) -> Self {
        let mut glossary = Self { entries };
        glossary.sort();
        glossary
    }

    /// Load a JSON glossary, either `{"entries": [...]}` or `{"source": "target", ...}`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read glossary file: {}", path.display()))?;
        let glossary = Self::from_json(&content)
            .with_context(|| format!("Failed to parse glossary file: {}", path.display()))?;
        info!("Loaded {} glossary entries from {}", glossary.len(), path.display());
        Ok(glossary)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries = match serde_json::from_str::<GlossaryFile>(content)? {
            GlossaryFile::Entries { entries } => entries,
            GlossaryFile::Map(map) => {
                let mut pairs: Vec<_> = map.into_iter().collect();
                pairs.sort();
                pairs
                    .into_iter()
                    .map(|(source, target)| GlossaryEntry::new(source, target))
                    .collect()
            }
        };

        let (kept, dropped): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| !e.source.trim().is_empty() && !e.target.trim().is_empty());
        if !dropped.is_empty() {
            warn!("Ignoring {} glossary entries with an empty source or target", dropped.len());
        }
        Ok(Self::from_entries(kept))
    }

    pub fn add_entry(&mut self, entry: GlossaryEntry) {
        self.entries.push(entry);
        self.sort();
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Priority descending, then longer sources first; stable otherwise
    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.source.chars().count().cmp(&a.source.chars().count()))
        });
    }

    /// Lowercase source term to its lowercase targets, without duplicates
    pub fn phrase_mappings(&self) -> HashMap<String, Vec<String>> {
        let mut mappings: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.entries {
            let targets = mappings.entry(entry.source.trim().to_lowercase()).or_default();
            let target = entry.target.trim().to_lowercase();
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        mappings
    }

    /// Whole-word occurrences of glossary terms in `text`, by position
    ///
    /// Overlapping matches keep the one that starts first; on equal starts the
    /// higher-priority entry wins.
    pub fn matching_entries(&self, text: &str, context: Option<&str>) -> Vec<GlossaryMatch<'_>> {
        let mut matches = Vec::new();
        for entry in self.entries.iter().filter(|e| e.context_allows(context)) {
            let pattern = format!(r"\b{}\b", regex::escape(&entry.source));
            let Ok(re) = RegexBuilder::new(&pattern)
                .case_insensitive(!entry.case_sensitive)
                .build()
            else {
                continue;
            };
            matches.extend(re.find_iter(text).map(|m| GlossaryMatch {
                entry,
                start: m.start(),
                end: m.end(),
            }));
        }

        // Stable: equal starts keep priority order
        matches.sort_by_key(|m| m.start);

        let mut kept: Vec<GlossaryMatch<'_>> = Vec::new();
        for m in matches {
            if kept.iter().all(|k| m.end <= k.start || m.start >= k.end) {
                kept.push(m);
            }
        }
        kept
    }

    /// Prompt block listing the entries relevant to `text`
    ///
    /// High-priority entries are always listed. Returns `None` when nothing applies.
    pub fn prompt_context(&self, text: &str, max_entries: usize) -> Option<String> {
        let mut relevant: Vec<&GlossaryEntry> = Vec::new();
        for m in self.matching_entries(text, None) {
            if !relevant.contains(&m.entry) {
                relevant.push(m.entry);
            }
        }
        for entry in self.entries.iter().filter(|e| e.priority >= HIGH_PRIORITY) {
            if !relevant.contains(&entry) {
                relevant.push(entry);
            }
        }
        relevant.truncate(max_entries);

        if relevant.is_empty() {
            return None;
        }

        let mut lines = vec![
            "TERMINOLOGY GLOSSARY (use these exact translations):".to_string(),
            String::new(),
        ];
        for entry in relevant {
            let mut line = format!("- \"{}\" → \"{}\"", entry.source, entry.target);
            if let Some(context) = &entry.context {
                line.push_str(&format!(" (context: {})", context));
            }
            if let Some(notes) = &entry.notes {
                line.push_str(&format!(" // {}", notes));
            }
            lines.push(line);
        }
        Some(lines.join("\n"))
    }
}
