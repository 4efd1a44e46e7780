/*!
 * Per-variant record table.
 *
 * A `RecordTable` holds the entries of one variant of one content package in
 * raw-file order. Its lifecycle within a run is:
 *
 * 1. `load` seeds entries with key and source text from the raw CSV
 * 2. `load_memory` fills the reuse cache from the persisted memory file
 * 3. the coordinator may `copy_translation` from sibling variants
 * 4. `translate_pass` reuses, keeps copies, or calls the translator
 * 5. `save_memory` and `save_result` persist everything, failures included
 *
 * An export skips the backend entirely: `restore` rebuilds the entries from
 * the memory file and `save_result` writes them out.
 */

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::errors::RecordError;
use crate::file_utils::FileManager;
use crate::translation::client::Translator;
use crate::translation::context::{AuxiliaryContext, ContextRecord, VariantSnapshot};
use crate::translation::memory;
use crate::translation::reuse::{self, ReuseDecision};

/// Header row of raw and output files
pub const CSV_HEADER: [&str; 3] = ["ID", "Text", "Comment"];

/// Comment column value of output rows
pub const OUTPUT_PLACEHOLDER: &str = "-";

const UTF8_BOM: char = '\u{feff}';

/// Aggregate state of an entry across its target languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryStatus {
    /// Loaded from the raw file, not processed yet
    #[default]
    Pending,
    /// Every language came from the backend or from memory
    Translated,
    /// At least one language was copied from a sibling variant
    Copied,
    /// At least one language fell back to the source text
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Translated => "translated",
            Self::Copied => "copied",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "translated" => Ok(Self::Translated),
            "copied" => Ok(Self::Copied),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One localizable string of a variant
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    /// Source text as found in the raw file
    pub raw: String,
    /// language -> translated text (the source text for failed languages)
    pub translations: BTreeMap<String, String>,
    /// Languages that fell back to the source text
    pub failed_languages: BTreeSet<String>,
    /// Languages filled by cross-variant copy during this run; not persisted
    pub copied_languages: BTreeSet<String>,
    pub status: EntryStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(key: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw: raw.into(),
            translations: BTreeMap::new(),
            failed_languages: BTreeSet::new(),
            copied_languages: BTreeSet::new(),
            status: EntryStatus::Pending,
            updated_at: None,
        }
    }

    /// Translation of `language` unless it is a fallback
    pub fn usable_translation(&self, language: &str) -> Option<&str> {
        if self.failed_languages.contains(language) {
            return None;
        }
        self.translations.get(language).map(String::as_str)
    }

    fn refresh_status(&mut self) {
        self.status = if !self.failed_languages.is_empty() {
            EntryStatus::Failed
        } else if !self.copied_languages.is_empty() {
            EntryStatus::Copied
        } else if self.translations.is_empty() {
            EntryStatus::Pending
        } else {
            EntryStatus::Translated
        };
    }
}

/// Per-(entry, language) outcome counters of a translate pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Taken from memory
    pub reused: usize,
    /// Kept from a cross-variant copy
    pub copied: usize,
    /// Translated by the backend
    pub translated: usize,
    /// Returned unchanged by the client guards
    pub skipped: usize,
    /// Fell back to the source text
    pub failed: usize,
}

impl PassStats {
    pub fn total(&self) -> usize {
        self.reused + self.copied + self.translated + self.skipped + self.failed
    }
}

impl AddAssign for PassStats {
    fn add_assign(&mut self, other: Self) {
        self.reused += other.reused;
        self.copied += other.copied;
        self.translated += other.translated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reused, {} copied, {} translated, {} skipped, {} failed",
            self.reused, self.copied, self.translated, self.skipped, self.failed
        )
    }
}

/// Entry counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStats {
    pub pending: usize,
    pub translated: usize,
    pub copied: usize,
    pub failed: usize,
}

/// Entries of one variant plus the memory they are checked against
#[derive(Debug, Clone)]
pub struct RecordTable {
    package_id: String,
    package_name: String,
    languages: Vec<String>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    memory: HashMap<String, Entry>,
}

impl RecordTable {
    pub fn new(
        package_id: impl Into<String>,
        package_name: impl Into<String>,
        languages: Vec<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            package_name: package_name.into(),
            languages,
            entries: Vec::new(),
            index: HashMap::new(),
            memory: HashMap::new(),
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records in the reuse cache
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.index.get(key).map(|&i| &mut self.entries[i])
    }

    /// Load keys and source texts from a raw CSV file
    ///
    /// On error the table is left empty.
    pub fn load(&mut self, raw_path: &Path) -> Result<(), RecordError> {
        self.entries.clear();
        self.index.clear();

        let content = std::fs::read_to_string(raw_path).map_err(|e| RecordError::io(raw_path, e))?;
        let rows = parse_raw(&content, raw_path)?;

        for (key, raw) in rows {
            if let Some(&i) = self.index.get(&key) {
                // Later duplicates win, first position is kept
                debug!(target: "transmem::table", "Duplicate key {:?} in {:?}", key, raw_path);
                self.entries[i].raw = raw;
                continue;
            }
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push(Entry::new(key, raw));
        }

        info!(target: "transmem::table", "Loaded {} entries from {:?}", self.entries.len(), raw_path);
        Ok(())
    }

    /// Fill the reuse cache from a memory file
    ///
    /// A missing file is a cold start. On a parse error the cache stays empty.
    pub fn load_memory(&mut self, path: &Path) -> Result<(), RecordError> {
        self.memory.clear();

        if !path.exists() {
            debug!(target: "transmem::table", "No memory at {:?}, cold start", path);
            return Ok(());
        }

        let content = std::fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;
        let records = memory::parse_memory(&content, path)?;
        self.memory = records.into_iter().map(|r| (r.key.clone(), r)).collect();

        info!(target: "transmem::table", "Loaded {} memory records from {:?}", self.memory.len(), path);
        Ok(())
    }

    /// Rebuild the entries from a memory file alone, without a raw file
    ///
    /// Blank translations are dropped with a warning, so the output falls back
    /// to the source text for them. The reuse cache stays empty.
    pub fn restore(&mut self, path: &Path) -> Result<(), RecordError> {
        self.entries.clear();
        self.index.clear();
        self.memory.clear();

        let content = std::fs::read_to_string(path).map_err(|e| RecordError::io(path, e))?;
        let records = memory::parse_memory(&content, path)?;

        let mut missing = 0;
        for mut record in records {
            record.translations.retain(|_, text| !text.trim().is_empty());
            for language in &self.languages {
                if !record.translations.contains_key(language) && !record.raw.trim().is_empty() {
                    warn!(target: "transmem::table",
                        "Empty translation for key '{}' in language '{}' ({:?}), using source text",
                        record.key, language, path);
                    missing += 1;
                }
            }
            self.index.insert(record.key.clone(), self.entries.len());
            self.entries.push(record);
        }

        if missing > 0 {
            info!(target: "transmem::table", "{} translations missing in {:?}", missing, path);
        }
        info!(target: "transmem::table", "Restored {} entries from {:?}", self.entries.len(), path);
        Ok(())
    }

    pub fn raw_text(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.raw.as_str())
    }

    /// Value `language` of `key` will end up with without a backend call
    ///
    /// A usable value already in the table wins over a reusable memory value.
    pub fn effective_translation(&self, key: &str, language: &str) -> Option<&str> {
        let entry = self.get(key)?;
        if let Some(text) = entry.usable_translation(language) {
            return Some(text);
        }
        match self.memory.get(key) {
            Some(record)
                if reuse::same_raw(&entry.raw, &record.raw)
                    && !record.failed_languages.contains(language) =>
            {
                record.translations.get(language).map(String::as_str)
            }
            _ => None,
        }
    }

    pub fn has_translation(&self, key: &str, language: &str) -> bool {
        self.effective_translation(key, language).is_some()
    }

    /// Take over the translation of `language` from a sibling variant
    pub fn copy_translation(&mut self, key: &str, language: &str, text: &str) -> bool {
        let Some(entry) = self.get_mut(key) else {
            return false;
        };
        entry.translations.insert(language.to_string(), text.to_string());
        entry.failed_languages.remove(language);
        entry.copied_languages.insert(language.to_string());
        entry.updated_at = Some(Utc::now());
        entry.refresh_status();
        true
    }

    /// Frozen view of this table used as context for sibling variants
    pub fn snapshot(&self, variant: &str) -> VariantSnapshot {
        let records = self
            .entries
            .iter()
            .map(|entry| ContextRecord {
                key: entry.key.clone(),
                raw: entry.raw.clone(),
                translations: self
                    .languages
                    .iter()
                    .filter_map(|lang| {
                        self.effective_translation(&entry.key, lang)
                            .map(|text| (lang.clone(), text.to_string()))
                    })
                    .collect(),
            })
            .collect();

        VariantSnapshot::new(variant, records)
    }

    /// Translate every entry into every target language
    ///
    /// Never fails: a language whose retries are exhausted keeps the source
    /// text and is marked failed so the next run tries again.
    pub async fn translate_pass(
        &mut self,
        client: &dyn Translator,
        context: &AuxiliaryContext,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let languages = self.languages.clone();

        for i in 0..self.entries.len() {
            let key = self.entries[i].key.clone();
            let raw = self.entries[i].raw.clone();

            for language in &languages {
                match reuse::decide(&raw, self.memory.get(&key), language) {
                    ReuseDecision::Reuse(text) => {
                        debug!(target: "transmem::table", "Matched {:?} to {}: {:?}", raw, language, text);
                        let remembered_at = self.memory.get(&key).and_then(|r| r.updated_at);
                        let entry = &mut self.entries[i];
                        entry.translations.insert(language.clone(), text);
                        entry.failed_languages.remove(language);
                        entry.copied_languages.remove(language);
                        entry.updated_at = entry.updated_at.max(remembered_at);
                        stats.reused += 1;
                        continue;
                    }
                    ReuseDecision::Translate(reason) => {
                        if self.entries[i].usable_translation(language).is_some() {
                            stats.copied += 1;
                            continue;
                        }
                        debug!(target: "transmem::table", "Translating {:?} to {} ({})", key, language, reason);
                    }
                }

                let entry_context = context.entry_context(&key, &raw, language);
                let outcome = client.translate_with_context(&raw, language, &entry_context).await;

                let entry = &mut self.entries[i];
                entry.updated_at = Some(Utc::now());
                entry.copied_languages.remove(language);
                if outcome.is_success() || outcome.is_skipped() {
                    if outcome.is_skipped() {
                        stats.skipped += 1;
                    } else {
                        stats.translated += 1;
                    }
                    entry.translations.insert(language.clone(), outcome.text);
                    entry.failed_languages.remove(language);
                } else {
                    error!(target: "transmem::table",
                        "Translation of {:?} to {} failed with status {}, keeping source text",
                        key, language, outcome.status_code);
                    entry.translations.insert(language.clone(), raw.clone());
                    entry.failed_languages.insert(language.clone());
                    stats.failed += 1;
                }
            }

            self.entries[i].refresh_status();
        }

        info!(target: "transmem::table", "Translate pass for {}: {}", self.package_id, stats);
        stats
    }

    /// Write every entry, failed ones included, to the memory file
    pub fn save_memory(&self, path: &Path) -> Result<(), RecordError> {
        let document = memory::render_memory(&self.entries).map_err(|e| RecordError::Serialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        FileManager::write_atomic(path, document.as_bytes()).map_err(|e| RecordError::io(path, e))?;
        info!(target: "transmem::table", "Saved {} memory records to {:?}", self.entries.len(), path);
        Ok(())
    }

    /// Write one output CSV per target language into `output_dir`
    ///
    /// Every key gets a row; untranslated languages fall back to the source text.
    pub fn save_result(&self, output_dir: &Path) -> Result<Vec<PathBuf>, RecordError> {
        FileManager::ensure_dir(output_dir).map_err(|e| RecordError::io(output_dir, e))?;

        let mut written = Vec::with_capacity(self.languages.len());
        for language in &self.languages {
            let path = output_dir.join(FileManager::output_file_name(
                language,
                &self.package_id,
                &self.package_name,
            ));
            let content = self.render_result(language, &path)?;
            FileManager::write_atomic(&path, &content).map_err(|e| RecordError::io(&path, e))?;
            info!(target: "transmem::table", "Saved result for language '{}' to {:?}", language, path);
            written.push(path);
        }
        Ok(written)
    }

    fn render_result(&self, language: &str, path: &Path) -> Result<Vec<u8>, RecordError> {
        let serialize_error = |e: csv::Error| RecordError::Serialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER).map_err(serialize_error)?;
        for entry in &self.entries {
            let text = entry.translations.get(language).unwrap_or(&entry.raw);
            writer
                .write_record([entry.key.as_str(), text.as_str(), OUTPUT_PLACEHOLDER])
                .map_err(serialize_error)?;
        }

        writer.into_inner().map_err(|e| RecordError::Serialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats::default();
        for entry in &self.entries {
            match entry.status {
                EntryStatus::Pending => stats.pending += 1,
                EntryStatus::Translated => stats.translated += 1,
                EntryStatus::Copied => stats.copied += 1,
                EntryStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Key and source text of every data row of a raw CSV document
fn parse_raw(content: &str, path: &Path) -> Result<Vec<(String, String)>, RecordError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| RecordError::parse(path, e))?;
        if record.len() < 2 {
            warn!(target: "transmem::table", "Skipping row {} of {:?}: fewer than two columns", line + 1, path);
            continue;
        }

        let key = &record[0];
        if key.is_empty() || key == "id" || key == "ID" || is_comment(key) {
            continue;
        }
        rows.push((key.to_string(), record[1].to_string()));
    }
    Ok(rows)
}

fn is_comment(key: &str) -> bool {
    let key = key.trim_start();
    key.starts_with('#') || key.starts_with("//")
}
