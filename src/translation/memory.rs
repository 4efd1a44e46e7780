/*!
 * Translation memory file format.
 *
 * One TOML document per (package, variant). Each entry key maps to a table:
 *
 * ```toml
 * ["Harmony.Greeting"]
 * raw = "Hello there"
 * zh = "你好"
 * ja = "こんにちは"
 * status = "failed"
 * updated_at = "2026-03-01T10:00:00Z"
 * failed = ["ja"]
 * ```
 *
 * Every string field that is not a bookkeeping field is a translation. Records
 * written before the bookkeeping fields existed hold only `raw` and languages
 * and load as translated.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use toml::{Table, Value};

use crate::errors::RecordError;
use crate::record_table::{Entry, EntryStatus};

/// Field names that can never be used as a target language
pub const RESERVED_FIELDS: [&str; 4] = ["raw", "status", "updated_at", "failed"];

const RAW: &str = "raw";
const STATUS: &str = "status";
const UPDATED_AT: &str = "updated_at";
const FAILED: &str = "failed";

/// Parse a memory document into entries, in document order
pub fn parse_memory(content: &str, path: &Path) -> Result<Vec<Entry>, RecordError> {
    let document: Table = content
        .parse()
        .map_err(|e: toml::de::Error| RecordError::parse(path, e))?;

    document
        .into_iter()
        .map(|(key, value)| match value {
            Value::Table(fields) => parse_record(key, fields, path),
            other => Err(RecordError::parse(
                path,
                format!("entry '{}' is a {}, expected a table", key, other.type_str()),
            )),
        })
        .collect()
}

fn parse_record(key: String, fields: Table, path: &Path) -> Result<Entry, RecordError> {
    let mut raw = None;
    let mut status = None;
    let mut updated_at = None;
    let mut failed_languages = BTreeSet::new();
    let mut translations = BTreeMap::new();

    for (field, value) in fields {
        match (field.as_str(), value) {
            (RAW, Value::String(text)) => raw = Some(text),
            (STATUS, Value::String(text)) => {
                let parsed = text
                    .parse::<EntryStatus>()
                    .map_err(|e| RecordError::parse(path, format!("entry '{}': {}", key, e)))?;
                status = Some(parsed);
            }
            (UPDATED_AT, value) => updated_at = parse_timestamp(&key, &value),
            (FAILED, Value::Array(items)) => {
                for item in items {
                    match item {
                        Value::String(language) => {
                            failed_languages.insert(language);
                        }
                        other => {
                            return Err(RecordError::parse(
                                path,
                                format!("entry '{}': failed list holds a {}", key, other.type_str()),
                            ));
                        }
                    }
                }
            }
            (language, Value::String(text)) if !RESERVED_FIELDS.contains(&language) => {
                translations.insert(language.to_string(), text);
            }
            (name, other) => {
                return Err(RecordError::parse(
                    path,
                    format!("entry '{}': field '{}' has unexpected type {}", key, name, other.type_str()),
                ));
            }
        }
    }

    let raw = raw.ok_or_else(|| RecordError::parse(path, format!("entry '{}' has no raw text", key)))?;
    let status = status.unwrap_or(EntryStatus::Translated);

    // Hand-edited failed records without a list: distrust every language
    if status == EntryStatus::Failed && failed_languages.is_empty() {
        failed_languages.extend(translations.keys().cloned());
    }

    Ok(Entry {
        key,
        raw,
        translations,
        failed_languages,
        copied_languages: BTreeSet::new(),
        status,
        updated_at,
    })
}

fn parse_timestamp(key: &str, value: &Value) -> Option<DateTime<Utc>> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Datetime(datetime) => datetime.to_string(),
        other => {
            warn!(target: "transmem::memory", "Entry '{}': ignoring updated_at of type {}", key, other.type_str());
            return None;
        }
    };

    match DateTime::parse_from_rfc3339(&text) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            warn!(target: "transmem::memory", "Entry '{}': ignoring malformed updated_at {:?}: {}", key, text, e);
            None
        }
    }
}

/// Render entries as a memory document, preserving their order
pub fn render_memory(entries: &[Entry]) -> Result<String, toml::ser::Error> {
    let mut document = Table::new();

    for entry in entries {
        let mut fields = Table::new();
        fields.insert(RAW.to_string(), Value::String(entry.raw.clone()));
        for (language, text) in &entry.translations {
            fields.insert(language.clone(), Value::String(text.clone()));
        }
        fields.insert(STATUS.to_string(), Value::String(persisted_status(entry.status).to_string()));
        if let Some(updated_at) = entry.updated_at {
            fields.insert(UPDATED_AT.to_string(), Value::String(updated_at.to_rfc3339()));
        }
        if !entry.failed_languages.is_empty() {
            let failed = entry
                .failed_languages
                .iter()
                .cloned()
                .map(Value::String)
                .collect();
            fields.insert(FAILED.to_string(), Value::Array(failed));
        }
        document.insert(entry.key.clone(), Value::Table(fields));
    }

    toml::to_string(&document)
}

/// Copies only live for one run; on disk they are ordinary translations
fn persisted_status(status: EntryStatus) -> EntryStatus {
    match status {
        EntryStatus::Copied => EntryStatus::Translated,
        other => other,
    }
}
