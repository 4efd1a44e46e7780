use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::version_coordinator::DEFAULT_VARIANT;

// @module: File and directory utilities

// @const: First-line marker of raw localization files
pub const RAW_HEADER_MARKER: &str = "ID,Text,Comment";

// @const: Extensions a raw localization file may carry
const RAW_EXTENSIONS: [&str; 2] = ["csv", "txt"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @writes: Content to a sibling temp file, then renames it over `path`
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent)?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)
    }

    // @generates: Memory file path of one package variant
    pub fn memory_file_path<P: AsRef<Path>>(data_dir: P, package_id: &str, variant: &str) -> PathBuf {
        data_dir.as_ref().join(format!("{}_{}.toml", package_id, variant))
    }

    // @generates: Output file name, spaces replaced by underscores
    pub fn output_file_name(language: &str, package_id: &str, package_name: &str) -> String {
        let name = if package_name.trim().is_empty() {
            format!("{}_{}.csv", language, package_id)
        } else {
            format!("{}_{}_{}.csv", language, package_id, package_name)
        };
        name.replace(' ', "_")
    }

    // @checks: Whether the first line of a file carries the raw header
    pub fn has_raw_header<P: AsRef<Path>>(path: P) -> bool {
        let Ok(file) = File::open(path.as_ref()) else {
            return false;
        };

        let mut first_line = String::new();
        if BufReader::new(file).read_line(&mut first_line).is_err() {
            debug!(target: "transmem::files", "Unreadable first line in {:?}", path.as_ref());
            return false;
        }
        first_line.trim_start_matches('\u{feff}').contains(RAW_HEADER_MARKER)
    }

    fn is_raw_candidate(path: &Path) -> bool {
        path.is_file()
            && path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    RAW_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
    }

    /// Find the raw localization file below `dir`
    ///
    /// Files whose name contains `keyword` are tried first, then any other
    /// `.csv`/`.txt` file. Only files whose first line holds the raw header match.
    pub fn find_raw_source<P: AsRef<Path>>(dir: P, keyword: &str) -> Result<Option<PathBuf>> {
        let mut candidates = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).follow_links(true).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            if Self::is_raw_candidate(entry.path()) {
                candidates.push(entry.into_path());
            }
        }

        let (preferred, others): (Vec<PathBuf>, Vec<PathBuf>) =
            candidates.into_iter().partition(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().contains(keyword))
                    .unwrap_or(false)
            });

        Ok(preferred
            .into_iter()
            .chain(others)
            .find(|path| Self::has_raw_header(path)))
    }

    /// Locate the raw file of every variant of a package
    ///
    /// Each configured version with a sub-directory becomes a variant. When no
    /// version directory exists the package root is searched and the result is
    /// named `default`.
    pub fn discover_variants<P: AsRef<Path>>(
        package_dir: P,
        versions: &[String],
        keyword: &str,
    ) -> Result<Vec<(String, PathBuf)>> {
        let package_dir = package_dir.as_ref();
        let mut variants = Vec::new();
        let mut any_version_dir = false;

        for version in versions {
            let version_dir = package_dir.join(version);
            if !Self::dir_exists(&version_dir) {
                continue;
            }
            any_version_dir = true;

            debug!(target: "transmem::files", "Searching for {} in {:?}", keyword, version_dir);
            match Self::find_raw_source(&version_dir, keyword)? {
                Some(path) => variants.push((version.clone(), path)),
                None => warn!(target: "transmem::files", "No raw file for version {} in {:?}", version, version_dir),
            }
        }

        if !any_version_dir {
            debug!(target: "transmem::files", "Searching for {} in {:?}", keyword, package_dir);
            if let Some(path) = Self::find_raw_source(package_dir, keyword)? {
                variants.push((DEFAULT_VARIANT.to_string(), path));
            }
        }

        Ok(variants)
    }

    /// Memory files of one package in `data_dir`, as (variant, path)
    ///
    /// Matches `{package_id}_{variant}.toml`; a missing data directory yields none.
    pub fn find_memory_files<P: AsRef<Path>>(data_dir: P, package_id: &str) -> Result<Vec<(String, PathBuf)>> {
        let data_dir = data_dir.as_ref();
        if !Self::dir_exists(data_dir) {
            return Ok(Vec::new());
        }

        let prefix = format!("{}_", package_id);
        let mut found = Vec::new();
        for entry in WalkDir::new(data_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.context("Failed to read directory entry")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let variant = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".toml"))
                .filter(|variant| !variant.is_empty());
            if let Some(variant) = variant {
                found.push((variant.to_string(), entry.path().to_path_buf()));
            }
        }
        Ok(found)
    }
}
