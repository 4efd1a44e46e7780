/*!
 * # transmem - translation memory for multi-version content packages
 *
 * Keeps the localized text of content packages synchronized with their
 * upstream source text while calling the translation backend as rarely as
 * possible.
 *
 * ## Features
 *
 * - Per-entry, per-language reuse of remembered translations
 * - Cross-version copy of entries whose source text is identical
 * - Rate-limited, retrying translation client with two backends:
 *   - a plain phrase translator
 *   - an OpenAI-style chat endpoint with consistency context
 * - Failed entries fall back to the source text and are retried next run
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `app_controller`: Drives every configured package
 * - `version_coordinator`: Variant priority, cross-version copy, translate order
 * - `record_table`: Entries of one variant, raw loading, memory and output files
 * - `translation`: The engine:
 *   - `translation::client`: `Translator` contract and `TranslationClient`
 *   - `translation::rate_limit`: Sliding-window rate limiting
 *   - `translation::memory`: Translation memory file format
 *   - `translation::reuse`: Change detection
 *   - `translation::context`: Cross-variant context and similarity scoring
 *   - `translation::prompts`: Context prompt rendering
 * - `providers`: Backend clients (`plain`, `openai`, `mock`)
 * - `file_utils`: Raw file discovery and atomic writes
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod record_table;
pub mod translation;
pub mod version_coordinator;

// Re-export main types for easier usage
pub use app_config::Config;
pub use record_table::{Entry, EntryStatus, RecordTable};
pub use translation::{TranslationClient, Translator};
pub use version_coordinator::VersionCoordinator;
