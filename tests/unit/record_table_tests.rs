/*!
 * Tests for record tables: raw loading, translate pass outcomes and persistence
 */

use anyhow::Result;
use std::fs;
use transmem::errors::RecordError;
use transmem::providers::mock::MockProvider;
use transmem::record_table::{EntryStatus, RecordTable};
use transmem::translation::client::ClientSettings;
use transmem::translation::context::AuxiliaryContext;
use crate::common;

fn table(languages: &[&str]) -> RecordTable {
    RecordTable::new("42", "Test Mod", common::languages(languages))
}

/// Rows keep file order; header, comment and short rows are dropped
#[test]
fn test_load_shouldSeedEntriesInFileOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_test_file(
        temp_dir.path(),
        "en.csv",
        "\u{feff}ID,Text,Comment\n// header note,x,\nzeta,Last letter,\nalpha,\"Quoted, with comma\",note\nlonely\nid,skipped,\n",
    )?;

    let mut table = table(&["zh"]);
    table.load(&raw)?;

    let keys: Vec<&str> = table.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
    assert_eq!(table.raw_text("alpha"), Some("Quoted, with comma"));
    assert!(table.entries().iter().all(|e| e.status == EntryStatus::Pending));
    Ok(())
}

/// A missing raw file is an error and leaves the table empty
#[test]
fn test_load_withMissingFile_shouldFailAndStayEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut table = table(&["zh"]);

    let result = table.load(&temp_dir.path().join("missing.csv"));

    assert!(matches!(result, Err(RecordError::Io { .. })));
    assert!(table.is_empty());
    Ok(())
}

/// A broken memory file is a parse error and the cache stays empty
#[test]
fn test_loadMemory_withMalformedFile_shouldFailAndStayCold() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let memory = common::create_test_file(temp_dir.path(), "42_default.toml", "[broken\nraw = ")?;

    let mut table = table(&["zh"]);
    assert!(matches!(table.load_memory(&memory), Err(RecordError::Parse { .. })));
    assert_eq!(table.memory_len(), 0);

    // Absent memory is a cold start, not an error
    assert!(table.load_memory(&temp_dir.path().join("absent.toml")).is_ok());
    Ok(())
}

/// Exhausted retries keep the source text and mark the entry failed
#[tokio::test]
async fn test_translatePass_withFailingClient_shouldFallBackToRaw() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("greet", "Hello there")])?;
    let provider = MockProvider::failing(500);
    let client = common::mock_client(&provider);

    let mut table = table(&["zh", "ja"]);
    table.load(&raw)?;
    let stats = table.translate_pass(&client, &AuxiliaryContext::empty()).await;

    let entry = table.get("greet").unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
    assert_eq!(entry.translations.get("zh").map(String::as_str), Some("Hello there"));
    assert_eq!(entry.failed_languages.len(), 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(provider.call_count(), 6);
    Ok(())
}

/// Guarded inputs are stored as returned and count as translated
#[tokio::test]
async fn test_translatePass_withShortText_shouldStoreUnchanged() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("ok", "OK"), ("empty", "")])?;
    let provider = MockProvider::working();
    let settings = ClientSettings { min_length: 3, ..ClientSettings::default() };
    let client = common::mock_client_with(&provider, settings);

    let mut table = table(&["zh"]);
    table.load(&raw)?;
    let stats = table.translate_pass(&client, &AuxiliaryContext::empty()).await;

    assert_eq!(stats.skipped, 2);
    assert_eq!(provider.call_count(), 0);
    assert_eq!(table.get("ok").unwrap().translations["zh"], "OK");
    assert_eq!(table.get("ok").unwrap().status, EntryStatus::Translated);
    assert_eq!(table.get("empty").unwrap().translations["zh"], "");
    Ok(())
}

/// A copied language is kept as is and never sent to the backend
#[tokio::test]
async fn test_translatePass_withCopiedLanguage_shouldNotCall() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("door", "Open door")])?;
    let provider = MockProvider::working();
    let client = common::mock_client(&provider);

    let mut table = table(&["zh", "ja"]);
    table.load(&raw)?;
    assert!(table.copy_translation("door", "zh", "开门"));
    assert!(!table.copy_translation("unknown", "zh", "x"));
    let stats = table.translate_pass(&client, &AuxiliaryContext::empty()).await;

    let entry = table.get("door").unwrap();
    assert_eq!(entry.translations["zh"], "开门");
    assert_eq!(entry.translations["ja"], "[ja] Open door");
    assert_eq!(entry.status, EntryStatus::Copied);
    assert_eq!(stats.copied, 1);
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

/// Memory written by one table is reused by the next without calls
#[tokio::test]
async fn test_saveMemory_thenLoadMemory_shouldReuseTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text"), ("b", "Beta text")])?;
    let memory_path = temp_dir.path().join("data/42_default.toml");

    let working = MockProvider::working();
    let mut first = table(&["zh"]);
    first.load(&raw)?;
    first.translate_pass(&common::mock_client(&working), &AuxiliaryContext::empty()).await;
    first.save_memory(&memory_path)?;
    assert!(memory_path.exists());

    let failing = MockProvider::failing(500);
    let mut second = table(&["zh"]);
    second.load(&raw)?;
    second.load_memory(&memory_path)?;
    let stats = second.translate_pass(&common::mock_client(&failing), &AuxiliaryContext::empty()).await;

    assert_eq!(stats.reused, 2);
    assert_eq!(failing.call_count(), 0);
    assert_eq!(second.get("b").unwrap().translations["zh"], "[zh] Beta text");
    assert_eq!(second.get("b").unwrap().status, EntryStatus::Translated);
    Ok(())
}

/// Failed entries are persisted with their source text and failed list
#[tokio::test]
async fn test_saveMemory_withFailedEntries_shouldPersistThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text")])?;
    let memory_path = temp_dir.path().join("42_default.toml");

    let mut table = table(&["zh"]);
    table.load(&raw)?;
    table.translate_pass(&common::mock_client(&MockProvider::failing(503)), &AuxiliaryContext::empty()).await;
    table.save_memory(&memory_path)?;

    let content = fs::read_to_string(&memory_path)?;
    assert!(content.contains("raw = \"Alpha text\""));
    assert!(content.contains("status = \"failed\""));
    assert!(content.contains("failed = [\"zh\"]"));
    assert!(content.contains("updated_at = "));
    Ok(())
}

/// Every key appears once per language file, with the fixed placeholder
#[tokio::test]
async fn test_saveResult_shouldEmitEveryKeyPerLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(
        temp_dir.path(),
        "en.csv",
        &[("a", "Alpha text"), ("b", "Beta\ntext"), ("c", "Gamma, text")],
    )?;

    let mut table = table(&["zh", "ja"]);
    table.load(&raw)?;
    table.translate_pass(&common::mock_client(&MockProvider::intermittent(2)), &AuxiliaryContext::empty()).await;

    let out_dir = temp_dir.path().join("out");
    let written = table.save_result(&out_dir)?;
    assert_eq!(written, vec![out_dir.join("zh_42_Test_Mod.csv"), out_dir.join("ja_42_Test_Mod.csv")]);

    let header = fs::read_to_string(&written[0])?;
    assert!(header.starts_with("ID,Text,Comment"));

    for path in &written {
        let rows = common::read_output(path)?;
        let keys: Vec<&str> = rows.iter().map(|(k, _, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert!(rows.iter().all(|(_, text, comment)| !text.is_empty() && comment == "-"));
    }
    Ok(())
}

/// Status counts reflect the pass outcome
#[tokio::test]
async fn test_stats_shouldCountStatuses() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text"), ("b", "Beta text")])?;

    let mut table = table(&["zh"]);
    table.load(&raw)?;
    assert_eq!(table.stats().pending, 2);

    table.copy_translation("a", "zh", "阿尔法");
    table.translate_pass(&common::mock_client(&MockProvider::failing(500)), &AuxiliaryContext::empty()).await;

    let stats = table.stats();
    assert_eq!(stats.copied, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.pending, 0);
    Ok(())
}

/// Restoring from memory keeps document order and drops blank translations
#[test]
fn test_restore_shouldRebuildEntriesFromMemory() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let memory_path = common::create_test_file(
        temp_dir.path(),
        "42_default.toml",
        "[b]\nraw = \"Beta text\"\nzh = \"\"\n\n[a]\nraw = \"Alpha text\"\nzh = \"阿尔法\"\nstatus = \"translated\"\n",
    )?;

    let mut table = table(&["zh"]);
    table.restore(&memory_path)?;

    let keys: Vec<&str> = table.entries().iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["b", "a"]);
    assert!(table.get("b").unwrap().translations.is_empty());
    assert_eq!(table.memory_len(), 0);

    let written = table.save_result(&temp_dir.path().join("out"))?;
    let rows = common::read_output(&written[0])?;
    assert_eq!(rows[0].1, "Beta text");
    assert_eq!(rows[1].1, "阿尔法");

    assert!(matches!(table.restore(&temp_dir.path().join("absent.toml")), Err(RecordError::Io { .. })));
    assert!(table.is_empty());
    Ok(())
}
