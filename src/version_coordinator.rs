/*!
 * Multi-variant coordination for one content package.
 *
 * The coordinator owns one `RecordTable` per variant and keeps them in
 * priority order: numbered versions newest first, `default` last. Higher
 * priority variants feed lower ones, both through cross-variant copy of
 * identical source texts and as context for contextual translation.
 */

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::errors::RecordError;
use crate::file_utils::FileManager;
use crate::record_table::{PassStats, RecordTable, TableStats};
use crate::translation::client::Translator;
use crate::translation::context::{AuxiliaryContext, ContextAssembler};
use crate::translation::reuse;

/// Variant name used when a package has no version directories
pub const DEFAULT_VARIANT: &str = "default";

/// Folder that receives output files inside a version folder
pub const OUTPUT_SUBDIR: &str = "Localizations";

/// Parse a version label into a numeric tuple
///
/// A `version-` or `v` prefix is ignored. Anything that is not a dotted list
/// of integers parses to `[0]`.
pub fn parse_version(label: &str) -> Vec<u64> {
    let trimmed = label.trim();
    let numbers = trimmed
        .strip_prefix("version-")
        .or_else(|| trimmed.strip_prefix('v'))
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    numbers
        .split('.')
        .map(|part| part.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|_| vec![0])
}

/// Sort key: `default` after everything, then newest version first
fn priority_key(name: &str) -> (bool, Reverse<Vec<u64>>) {
    let is_default = name == DEFAULT_VARIANT;
    let version = if is_default { Vec::new() } else { parse_version(name) };
    (is_default, Reverse(version))
}

/// Owner of every variant table of one package
#[derive(Debug)]
pub struct VersionCoordinator {
    package_id: String,
    package_name: String,
    languages: Vec<String>,
    assembler: ContextAssembler,
    /// Kept in priority order
    variants: Vec<(String, RecordTable)>,
}

impl VersionCoordinator {
    pub fn new(
        package_id: impl Into<String>,
        package_name: impl Into<String>,
        languages: Vec<String>,
    ) -> Self {
        Self {
            package_id: package_id.into(),
            package_name: package_name.into(),
            languages,
            assembler: ContextAssembler::default(),
            variants: Vec::new(),
        }
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variant names, highest priority first
    pub fn priority_order(&self) -> Vec<&str> {
        self.variants.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn variant(&self, name: &str) -> Option<&RecordTable> {
        self.variants
            .iter()
            .find(|(variant, _)| variant == name)
            .map(|(_, table)| table)
    }

    /// Load a variant from its raw file
    ///
    /// Returns false, and leaves the coordinator unchanged, when the raw file
    /// cannot be read.
    pub fn add_variant(&mut self, name: &str, raw_path: &Path) -> bool {
        let mut table = RecordTable::new(
            self.package_id.clone(),
            self.package_name.clone(),
            self.languages.clone(),
        );

        if let Err(e) = table.load(raw_path) {
            error!(target: "transmem::coordinator",
                "Failed to add version {} for package {}: {}", name, self.package_id, e);
            return false;
        }

        self.insert_variant(name, table);
        info!(target: "transmem::coordinator", "Added version {} for package {}", name, self.package_id);
        true
    }

    /// Rebuild a variant from its memory file, for export without a backend
    ///
    /// Returns false, and leaves the coordinator unchanged, when the memory
    /// file cannot be read.
    pub fn restore_variant(&mut self, name: &str, memory_path: &Path) -> bool {
        let mut table = RecordTable::new(
            self.package_id.clone(),
            self.package_name.clone(),
            self.languages.clone(),
        );

        if let Err(e) = table.restore(memory_path) {
            error!(target: "transmem::coordinator",
                "Failed to restore version {} for package {}: {}", name, self.package_id, e);
            return false;
        }

        self.insert_variant(name, table);
        info!(target: "transmem::coordinator", "Restored version {} for package {}", name, self.package_id);
        true
    }

    fn insert_variant(&mut self, name: &str, table: RecordTable) {
        match self.variants.iter_mut().find(|(variant, _)| variant == name) {
            Some(slot) => slot.1 = table,
            None => self.variants.push((name.to_string(), table)),
        }
        // Stable: equal versions keep insertion order
        self.variants.sort_by_cached_key(|(variant, _)| priority_key(variant));
    }

    /// Load the memory file of every variant from `data_dir`
    ///
    /// A broken memory file is logged and that variant starts cold.
    pub fn load_memory(&mut self, data_dir: &Path) {
        for (name, table) in &mut self.variants {
            let path = FileManager::memory_file_path(data_dir, &self.package_id, name);
            if let Err(e) = table.load_memory(&path) {
                error!(target: "transmem::coordinator",
                    "Ignoring memory of {} version {}: {}", self.package_id, name, e);
            }
        }
    }

    /// Copy translations between variants with identical source texts
    ///
    /// Every variant feeds every lower priority variant, per key and language,
    /// unless the target already has a translation of its own. Returns the
    /// number of entries that received at least one language.
    pub fn cross_version_copy(&mut self) -> usize {
        let mut copied = 0;
        for target in 1..self.variants.len() {
            for source in 0..target {
                copied += self.copy_between(source, target);
            }
        }
        copied
    }

    fn copy_between(&mut self, source: usize, target: usize) -> usize {
        debug_assert!(source < target);
        let (head, tail) = self.variants.split_at_mut(target);
        let (source_name, source_table) = &head[source];
        let (target_name, target_table) = &mut tail[0];

        let mut plan: Vec<(String, String, String)> = Vec::new();
        for entry in target_table.entries() {
            let Some(source_raw) = source_table.raw_text(&entry.key) else {
                continue;
            };
            if !reuse::same_raw(source_raw, &entry.raw) {
                continue;
            }
            for language in &self.languages {
                if target_table.has_translation(&entry.key, language) {
                    continue;
                }
                if let Some(text) = source_table.effective_translation(&entry.key, language) {
                    plan.push((entry.key.clone(), language.clone(), text.to_string()));
                }
            }
        }

        let mut keys: Vec<&str> = Vec::new();
        for (key, language, text) in &plan {
            if target_table.copy_translation(key, language, text) && keys.last() != Some(&key.as_str()) {
                keys.push(key);
            }
        }

        if !keys.is_empty() {
            info!(target: "transmem::coordinator",
                "Copied {} translations from {} to {} for package {}",
                keys.len(), source_name, target_name, self.package_id);
        }
        keys.len()
    }

    /// Translate every variant in priority order
    ///
    /// Before each pass the variant takes what higher priority variants
    /// translated so far, then gets every other variant as context.
    pub async fn translate_all(&mut self, client: &dyn Translator) -> PassStats {
        let mut total = PassStats::default();

        for current in 0..self.variants.len() {
            for source in 0..current {
                self.copy_between(source, current);
            }

            let snapshots = self
                .variants
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != current)
                .map(|(_, (name, table))| table.snapshot(name))
                .collect();
            let context = AuxiliaryContext::new(self.assembler.clone(), snapshots);

            let (name, table) = &mut self.variants[current];
            info!(target: "transmem::coordinator", "Translating package {} version {}", self.package_id, name);
            total += table.translate_pass(client, &context).await;
        }

        total
    }

    /// Persist every variant's memory; keeps going after a failure
    pub fn save_memory(&self, data_dir: &Path) -> Result<(), RecordError> {
        let mut first_error = None;
        for (name, table) in &self.variants {
            let path = FileManager::memory_file_path(data_dir, &self.package_id, name);
            match table.save_memory(&path) {
                Ok(()) => debug!(target: "transmem::coordinator", "Saved data for {} version {}", self.package_id, name),
                Err(e) => {
                    error!(target: "transmem::coordinator", "Failed to save memory of {} version {}: {}", self.package_id, name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Output folders of one variant below `output_root`
    ///
    /// `default` serves every configured version, other variants their own.
    pub fn output_dirs(output_root: &Path, variant: &str, versions: &[String]) -> Vec<PathBuf> {
        if variant != DEFAULT_VARIANT {
            return vec![output_root.join(variant).join(OUTPUT_SUBDIR)];
        }
        if versions.is_empty() {
            return vec![output_root.join(OUTPUT_SUBDIR)];
        }
        versions
            .iter()
            .map(|version| output_root.join(version).join(OUTPUT_SUBDIR))
            .collect()
    }

    /// Write the output files of every variant; keeps going after a failure
    ///
    /// Returns the written paths, or the first error once every folder was tried.
    pub fn save_results(&self, output_root: &Path, versions: &[String]) -> Result<Vec<PathBuf>, RecordError> {
        let mut written = Vec::new();
        let mut first_error = None;
        for (name, table) in &self.variants {
            if table.is_empty() {
                warn!(target: "transmem::coordinator", "Version {} of {} has no entries", name, self.package_id);
            }
            // `default` never overwrites a version that has a variant of its own
            let dirs = if name == DEFAULT_VARIANT && !versions.is_empty() {
                let free: Vec<String> = versions
                    .iter()
                    .filter(|version| self.variant(version).is_none())
                    .cloned()
                    .collect();
                if free.is_empty() {
                    debug!(target: "transmem::coordinator",
                        "Every version of {} has its own variant, not writing default", self.package_id);
                    continue;
                }
                Self::output_dirs(output_root, name, &free)
            } else {
                Self::output_dirs(output_root, name, versions)
            };

            for dir in dirs {
                match table.save_result(&dir) {
                    Ok(paths) => written.extend(paths),
                    Err(e) => {
                        error!(target: "transmem::coordinator",
                            "Failed to save results of {} version {} to {:?}: {}", self.package_id, name, dir, e);
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Status counts per variant, in priority order
    pub fn stats(&self) -> Vec<(String, TableStats)> {
        self.variants
            .iter()
            .map(|(name, table)| (name.clone(), table.stats()))
            .collect()
    }
}
