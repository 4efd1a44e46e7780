/*!
 * Common test utilities for the transmem test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use transmem::providers::mock::MockProvider;
use transmem::translation::client::{ClientSettings, TranslationClient};

/// Route library logs through env_logger; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, parent directories included
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Raw localization CSV with the `ID,Text,Comment` header
pub fn raw_csv(rows: &[(&str, &str)]) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["ID", "Text", "Comment"]).unwrap();
    for (key, text) in rows {
        writer.write_record([*key, *text, ""]).unwrap();
    }
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

/// Writes a raw localization file below `dir`
pub fn create_raw_file(dir: &Path, filename: &str, rows: &[(&str, &str)]) -> Result<PathBuf> {
    create_test_file(dir, filename, &raw_csv(rows))
}

/// Reads an output CSV back as (ID, Text, Comment) rows, header excluded
pub fn read_output(path: &Path) -> Result<Vec<(String, String, String)>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push((record[0].to_string(), record[1].to_string(), record[2].to_string()));
    }
    Ok(rows)
}

pub fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

/// Client around a mock backend, no rate limit, no minimum length
pub fn mock_client(provider: &MockProvider) -> TranslationClient {
    TranslationClient::new(Box::new(provider.clone()), ClientSettings::default())
}

/// Same as `mock_client` with custom settings
pub fn mock_client_with(provider: &MockProvider, settings: ClientSettings) -> TranslationClient {
    TranslationClient::new(Box::new(provider.clone()), settings)
}
