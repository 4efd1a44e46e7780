/*!
 * Integration tests for full controller runs over a content directory
 */

use anyhow::Result;
use std::fs;
use std::path::Path;
use transmem::app_config::{Config, PackageConfig, TranslatorProvider};
use transmem::app_controller::Controller;
use transmem::providers::mock::MockProvider;
use crate::common;

fn config_for(root: &Path, versions: &[&str], packages: &[(&str, &str)]) -> Config {
    let mut config = Config::default();
    config.target_languages = common::languages(&["zh", "ja"]);
    config.game_versions = common::languages(versions);
    config.content_dir = root.join("content");
    config.data_dir = root.join("data");
    config.output_dir = root.join("output");
    config.packages = packages
        .iter()
        .map(|(id, name)| PackageConfig { id: id.to_string(), name: name.to_string() })
        .collect();
    config
}

fn controller(config: Config, provider: &MockProvider) -> Result<Controller> {
    Controller::with_translator(config, Box::new(common::mock_client(provider)))
}

/// Missing credentials abort before anything else happens
#[test]
fn test_withConfig_llmWithoutToken_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = config_for(temp_dir.path(), &[], &[]);
    config.translator.provider = TranslatorProvider::Llm;

    assert!(Controller::with_config(config).is_err());
    assert!(!temp_dir.path().join("output").exists());
    Ok(())
}

/// Versioned package: memory and output per version, second run fully cached
#[tokio::test]
async fn test_run_withVersionedPackage_shouldPersistAndReuse() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content/2009463077");
    common::create_raw_file(&content, "1.4/Languages/English/en.csv", &[("door", "Open door"), ("old", "Legacy text")])?;
    common::create_raw_file(&content, "1.5/Languages/English/en.csv", &[("door", "Open door"), ("new", "Fresh text")])?;
    let config = config_for(temp_dir.path(), &["1.4", "1.5"], &[("2009463077", "Harmony Patch")]);

    let provider = MockProvider::working();
    let summary = controller(config.clone(), &provider)?.run(&[]).await?;

    assert_eq!(summary.processed.len(), 1);
    assert_eq!(summary.processed[0].variants, vec!["1.5", "1.4"]);
    // door is translated once for 1.5 and copied into 1.4
    assert_eq!(provider.call_count(), 6);

    let data = temp_dir.path().join("data");
    assert!(data.join("2009463077_1.4.toml").exists());
    assert!(data.join("2009463077_1.5.toml").exists());

    let output_14 = temp_dir.path().join("output/1.4/Localizations/zh_2009463077_Harmony_Patch.csv");
    let output_15 = temp_dir.path().join("output/1.5/Localizations/ja_2009463077_Harmony_Patch.csv");
    let rows = common::read_output(&output_14)?;
    assert_eq!(rows[0], ("door".to_string(), "[zh] Open door".to_string(), "-".to_string()));
    assert_eq!(rows.len(), 2);
    let before = fs::read(&output_15)?;

    let failing = MockProvider::failing(500);
    let summary = controller(config, &failing)?.run(&[]).await?;

    assert_eq!(failing.call_count(), 0);
    assert_eq!(summary.totals().failed, 0);
    assert_eq!(fs::read(&output_15)?, before);
    Ok(())
}

/// An unversioned package serves every configured version folder
#[tokio::test]
async fn test_run_withDefaultVariant_shouldWriteEveryVersionFolder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content/77");
    common::create_raw_file(&content, "Languages/en.csv", &[("hello", "Hello there")])?;
    let config = config_for(temp_dir.path(), &["1.4", "1.5"], &[("77", "")]);

    let provider = MockProvider::working();
    let summary = controller(config, &provider)?.run(&[]).await?;

    assert_eq!(summary.processed[0].variants, vec!["default"]);
    for version in ["1.4", "1.5"] {
        let path = temp_dir.path().join(format!("output/{}/Localizations/zh_77.csv", version));
        assert!(path.exists(), "missing {:?}", path);
    }
    assert!(temp_dir.path().join("data/77_default.toml").exists());
    Ok(())
}

/// Unknown, empty and filtered packages are skipped without failing the run
#[tokio::test]
async fn test_run_shouldSkipMissingAndFilteredPackages() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content");
    common::create_raw_file(&content.join("1"), "en.csv", &[("k", "Some text")])?;
    common::create_raw_file(&content.join("2"), "en.csv", &[("k", "Other text")])?;
    common::create_test_file(&content.join("3"), "notes.txt", "no raw file here")?;

    let mut config = config_for(
        temp_dir.path(),
        &[],
        &[("1", "One"), ("2", "Two"), ("3", "Three"), ("404", "Missing")],
    );
    config.blacklist_ids = vec!["2".to_string()];

    let provider = MockProvider::working();
    let summary = controller(config.clone(), &provider)?.run(&[]).await?;

    let processed: Vec<&str> = summary.processed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(processed, vec!["1"]);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    assert!(!temp_dir.path().join("data/2_default.toml").exists());

    // An explicit selection narrows the run further
    let provider = MockProvider::working();
    let summary = controller(config, &provider)?.run(&["404".to_string()]).await?;
    assert!(summary.processed.is_empty());
    assert_eq!(summary.skipped, 1);
    Ok(())
}

/// Backend failure never aborts the run and leaves source text in the output
#[tokio::test]
async fn test_run_withFailingBackend_shouldFallBackAndSucceed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let content = temp_dir.path().join("content/5");
    common::create_raw_file(&content, "en.csv", &[("k", "Keep me")])?;
    let config = config_for(temp_dir.path(), &[], &[("5", "Five")]);

    let provider = MockProvider::failing(500);
    let summary = controller(config, &provider)?.run(&[]).await?;

    assert_eq!(summary.totals().failed, 2);
    let rows = common::read_output(&temp_dir.path().join("output/Localizations/zh_5_Five.csv"))?;
    assert_eq!(rows, vec![("k".to_string(), "Keep me".to_string(), "-".to_string())]);

    let memory = fs::read_to_string(temp_dir.path().join("data/5_default.toml"))?;
    assert!(memory.contains("status = \"failed\""));
    Ok(())
}
