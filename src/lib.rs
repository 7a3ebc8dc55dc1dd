/*!
 * # runalign - formatting alignment for translated paragraphs
 *
 * A translated paragraph comes back as plain text. This library carries the
 * source paragraph's formatting runs (bold, italic, color, hyperlinks...) over
 * to the translation.
 *
 * ## Features
 *
 * - Phrase-embedding alignment: every phrase of up to L words is embedded,
 *   scored against every target phrase, and paired greedily without overlap
 * - Term-lookup alignment: a language model is asked where each formatted
 *   term ended up in the translation
 * - Glossary-driven phrase mappings
 * - Line-delimited JSON processing for paragraphs and table cells, with a
 *   bounded worker pool and per-unit fallbacks
 *
 * ## Architecture
 *
 * - `alignment`: the engine (tokenizer, embedder, scorer, solver, builders and
 *   both aligners)
 * - `processor`: record streams, worker pool and fallbacks
 * - `records`: the JSON record types
 * - `glossary`: terminology glossary
 * - `translator`: the translator capability and its provider-backed implementation
 * - `providers`: Ollama, OpenAI-compatible and Anthropic clients, plus mocks
 * - `app_config`: configuration management
 * - `language_utils`: ISO language code utilities
 * - `errors`: custom error types
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod alignment;
pub mod app_config;
pub mod errors;
pub mod glossary;
pub mod language_utils;
pub mod processor;
pub mod providers;
pub mod records;
pub mod translator;

pub use alignment::{AlignmentOutcome, AlignmentStrategy, FormattingAligner, Run, RunFormat};
pub use app_config::Config;
pub use errors::{AlignmentError, ProviderError};
pub use glossary::{Glossary, GlossaryEntry};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use processor::{AlignmentEngine, ProcessingSummary};
pub use translator::{ProviderTranslator, Translator};
