/*!
 * Integration tests for behavior across consecutive runs over the same memory
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use transmem::providers::mock::MockProvider;
use transmem::record_table::{EntryStatus, RecordTable};
use transmem::translation::client::TranslationClient;
use transmem::translation::context::AuxiliaryContext;
use crate::common;

const LANGUAGES: [&str; 2] = ["zh", "ja"];

/// One run of a single-variant table: load, memory, translate, save
async fn run_once(
    raw: &Path,
    memory: &Path,
    output: &Path,
    client: &TranslationClient,
) -> Result<(RecordTable, Vec<PathBuf>)> {
    let mut table = RecordTable::new("42", "Test Mod", common::languages(&LANGUAGES));
    table.load(raw)?;
    table.load_memory(memory)?;
    table.translate_pass(client, &AuxiliaryContext::empty()).await;
    table.save_memory(memory)?;
    let written = table.save_result(output)?;
    Ok((table, written))
}

/// Rerunning over translated memory with a failing backend changes nothing
#[tokio::test]
async fn test_rerun_withUnchangedRaw_shouldBeIdempotent() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let raw = common::create_raw_file(
        temp_dir.path(),
        "en.csv",
        &[("a", "Alpha text"), ("b", "Beta, \"quoted\""), ("c", "Multi\nline")],
    )?;
    let memory = temp_dir.path().join("data/42_default.toml");

    let working = MockProvider::working();
    let (_, first) = run_once(&raw, &memory, &temp_dir.path().join("out1"), &common::mock_client(&working)).await?;
    let memory_after_first = fs::read_to_string(&memory)?;

    let failing = MockProvider::failing(500);
    let (_, second) = run_once(&raw, &memory, &temp_dir.path().join("out2"), &common::mock_client(&failing)).await?;

    assert_eq!(failing.call_count(), 0);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(fs::read(a)?, fs::read(b)?);
    }
    assert_eq!(fs::read_to_string(&memory)?, memory_after_first);
    Ok(())
}

/// NBSP differences do not count as a change
#[tokio::test]
async fn test_reuse_withNbspOnlyChange_shouldNotCallBackend() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let memory = temp_dir.path().join("42_default.toml");
    common::create_test_file(
        temp_dir.path(),
        "42_default.toml",
        "[greet]\nraw = \"Hello world\"\nzh = \"你好世界\"\nja = \"こんにちは世界\"\n",
    )?;
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("greet", "Hello\u{a0}world")])?;

    let provider = MockProvider::working();
    let (table, _) = run_once(&raw, &memory, &temp_dir.path().join("out"), &common::mock_client(&provider)).await?;

    assert_eq!(provider.call_count(), 0);
    let entry = table.get("greet").unwrap();
    assert_eq!(entry.translations["zh"], "你好世界");
    assert_eq!(entry.translations["ja"], "こんにちは世界");
    assert_eq!(entry.status, EntryStatus::Translated);
    Ok(())
}

/// A changed source text is sent again for every target language
#[tokio::test]
async fn test_changedRaw_shouldTriggerRetranslation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let memory = temp_dir.path().join("42_default.toml");
    let out = temp_dir.path().join("out");

    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text"), ("b", "Beta text")])?;
    let provider = MockProvider::working();
    run_once(&raw, &memory, &out, &common::mock_client(&provider)).await?;
    assert_eq!(provider.call_count(), 4);

    common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text"), ("b", "Beta text, revised")])?;
    let provider = MockProvider::working();
    let (table, _) = run_once(&raw, &memory, &out, &common::mock_client(&provider)).await?;

    let requests = provider.requests();
    assert_eq!(requests.len(), LANGUAGES.len());
    assert!(requests.iter().all(|r| r.text == "Beta text, revised"));
    assert_eq!(table.get("b").unwrap().translations["zh"], "[zh] Beta text, revised");
    Ok(())
}

/// Only the languages that failed are requested again on the next run
#[tokio::test]
async fn test_failedLanguage_shouldBeRetriedNextRun() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let memory = temp_dir.path().join("42_default.toml");
    let out = temp_dir.path().join("out");
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &[("a", "Alpha text")])?;

    // Previous run: zh translated, ja fell back to the source text
    common::create_test_file(
        temp_dir.path(),
        "42_default.toml",
        "[a]\nraw = \"Alpha text\"\nja = \"Alpha text\"\nzh = \"阿尔法\"\nstatus = \"failed\"\nfailed = [\"ja\"]\n",
    )?;

    let provider = MockProvider::working();
    let (table, written) = run_once(&raw, &memory, &out, &common::mock_client(&provider)).await?;

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target_language, "ja");
    let entry = table.get("a").unwrap();
    assert_eq!(entry.translations["zh"], "阿尔法");
    assert_eq!(entry.translations["ja"], "[ja] Alpha text");
    assert_eq!(entry.status, EntryStatus::Translated);

    let rows = common::read_output(&written[0])?;
    assert_eq!(rows, vec![("a".to_string(), "阿尔法".to_string(), "-".to_string())]);
    Ok(())
}

/// Output keeps every key under persistent failure
#[tokio::test]
async fn test_output_underPersistentFailure_shouldListEveryKey() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let rows = [("a", "Alpha text"), ("b", "Beta text"), ("c", "Gamma text")];
    let raw = common::create_raw_file(temp_dir.path(), "en.csv", &rows)?;

    let provider = MockProvider::failing(500);
    let (table, written) = run_once(
        &raw,
        &temp_dir.path().join("42_default.toml"),
        &temp_dir.path().join("out"),
        &common::mock_client(&provider),
    )
    .await?;

    assert_eq!(table.stats().failed, 3);
    assert_eq!(written.len(), LANGUAGES.len());
    for path in &written {
        let output = common::read_output(path)?;
        let expected: Vec<(String, String, String)> = rows
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string(), "-".to_string()))
            .collect();
        assert_eq!(output, expected);
    }
    Ok(())
}
