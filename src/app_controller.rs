use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use crate::app_config::{Config, PackageConfig};
use crate::file_utils::FileManager;
use crate::record_table::PassStats;
use crate::translation::client::{TranslationClient, Translator};
use crate::version_coordinator::VersionCoordinator;

// @module: Application controller driving every configured package

/// Outcome of one package
#[derive(Debug, Clone, PartialEq)]
pub struct PackageReport {
    // @field: Package id
    pub id: String,
    // @field: Variant names in priority order
    pub variants: Vec<String>,
    // @field: Entries filled by cross-variant copy before translation
    pub copied: usize,
    // @field: Per-(entry, language) outcomes of the translate passes
    pub stats: PassStats,
}

/// Totals of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: Vec<PackageReport>,
    // @field: Packages without directory or raw file
    pub skipped: usize,
    // @field: Packages aborted by an error
    pub failed: usize,
    // @field: Accumulated backend cost
    pub cost: f64,
}

impl RunSummary {
    pub fn totals(&self) -> PassStats {
        let mut total = PassStats::default();
        for report in &self.processed {
            total += report.stats;
        }
        total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packages processed, {} skipped, {} failed ({}), cost {:.6}",
            self.processed.len(),
            self.skipped,
            self.failed,
            self.totals(),
            self.cost
        )
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translator shared by every package
    translator: Box<dyn Translator>,
}

impl Controller {
    // @method: Create a controller with the backend selected by the configuration
    //
    // Configuration errors surface here, before any network call.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let client = TranslationClient::from_config(&config.translator)
            .context("Failed to create translation client")?;
        info!("Translation backend: {}", client.backend_name());

        Ok(Self {
            config,
            translator: Box::new(client),
        })
    }

    // @method: Create a controller around an explicit translator
    pub fn with_translator(config: Config, translator: Box<dyn Translator>) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config, translator })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every active package, or only those listed in `only`
    pub async fn run(&self, only: &[String]) -> Result<RunSummary> {
        let start_time = Instant::now();
        let packages: Vec<&PackageConfig> = self
            .config
            .active_packages()
            .filter(|p| only.is_empty() || only.contains(&p.id))
            .collect();

        if packages.is_empty() {
            warn!("No packages to process");
        }

        FileManager::ensure_dir(&self.config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", self.config.data_dir))?;
        FileManager::ensure_dir(&self.config.output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", self.config.output_dir))?;

        let progress_bar = ProgressBar::new(packages.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} packages ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));

        let mut summary = RunSummary::default();
        for package in packages {
            progress_bar.set_message(format!("{} ({})", package.name, package.id));

            match self.process_package(package).await {
                Ok(Some(report)) => {
                    info!("Package {}: {} copied, {}", report.id, report.copied, report.stats);
                    summary.processed.push(report);
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Package {} failed: {:#}", package.id, e);
                    summary.failed += 1;
                }
            }
            progress_bar.inc(1);
        }
        progress_bar.finish_with_message("Done");

        summary.cost = self.translator.price();
        info!("Run finished in {:.1?}: {}", start_time.elapsed(), summary);
        Ok(summary)
    }

    /// Load, copy, translate and save one package
    ///
    /// Returns `None` when the package has nothing to translate.
    pub async fn process_package(&self, package: &PackageConfig) -> Result<Option<PackageReport>> {
        let package_dir = self.config.content_dir.join(&package.id);
        if !FileManager::dir_exists(&package_dir) {
            warn!("Package {} not found at {:?}, skipping", package.id, package_dir);
            return Ok(None);
        }

        let variants = FileManager::discover_variants(
            &package_dir,
            &self.config.game_versions,
            &self.config.source_keyword,
        )
        .with_context(|| format!("Failed to search {:?}", package_dir))?;

        if variants.is_empty() {
            warn!("No raw localization file in {:?}, skipping", package_dir);
            return Ok(None);
        }

        let mut coordinator = VersionCoordinator::new(
            package.id.clone(),
            package.name.clone(),
            self.config.target_languages.clone(),
        );
        for (name, raw_path) in &variants {
            coordinator.add_variant(name, raw_path);
        }
        if coordinator.is_empty() {
            warn!("No readable variant for package {}, skipping", package.id);
            return Ok(None);
        }

        coordinator.load_memory(&self.config.data_dir);
        let copied = coordinator.cross_version_copy();
        let stats = coordinator.translate_all(self.translator.as_ref()).await;

        coordinator
            .save_memory(&self.config.data_dir)
            .with_context(|| format!("Failed to save memory of package {}", package.id))?;
        coordinator
            .save_results(&self.config.output_dir, &self.config.game_versions)
            .with_context(|| format!("Failed to save results of package {}", package.id))?;

        Ok(Some(PackageReport {
            id: package.id.clone(),
            variants: coordinator.priority_order().into_iter().map(String::from).collect(),
            copied,
            stats,
        }))
    }
}

/// Outcome of one exported package
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    // @field: Package id
    pub id: String,
    // @field: Variants restored from memory, in priority order
    pub variants: Vec<String>,
    // @field: Output files written
    pub files: Vec<PathBuf>,
}

/// Totals of an export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    pub exported: Vec<ExportReport>,
    // @field: Packages without any memory file
    pub skipped: usize,
    // @field: Packages aborted by an error
    pub failed: usize,
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files: usize = self.exported.iter().map(|r| r.files.len()).sum();
        write!(
            f,
            "{} packages exported ({} files), {} skipped, {} failed",
            self.exported.len(),
            files,
            self.skipped,
            self.failed
        )
    }
}

/// Rebuilds output files from the translation memory without any backend
pub struct Exporter {
    // @field: App configuration
    config: Config,
}

impl Exporter {
    // @method: Create an exporter; backend settings are not needed or checked
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate_languages().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    /// Export every active package, or only those listed in `only`
    pub fn run(&self, only: &[String]) -> Result<ExportSummary> {
        let packages: Vec<&PackageConfig> = self
            .config
            .active_packages()
            .filter(|p| only.is_empty() || only.contains(&p.id))
            .collect();

        if packages.is_empty() {
            warn!("No packages to export");
        }

        let mut summary = ExportSummary::default();
        for package in packages {
            match self.export_package(package) {
                Ok(Some(report)) => {
                    info!("Package {}: {} files from {}", report.id, report.files.len(), report.variants.join(", "));
                    summary.exported.push(report);
                }
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Export of package {} failed: {:#}", package.id, e);
                    summary.failed += 1;
                }
            }
        }

        info!("Export finished: {}", summary);
        Ok(summary)
    }

    /// Restore every memory file of one package and write its outputs
    ///
    /// Returns `None` when the package has no memory yet.
    pub fn export_package(&self, package: &PackageConfig) -> Result<Option<ExportReport>> {
        let memory_files = FileManager::find_memory_files(&self.config.data_dir, &package.id)
            .with_context(|| format!("Failed to search {:?}", self.config.data_dir))?;

        if memory_files.is_empty() {
            warn!("No memory for package {} in {:?}, skipping", package.id, self.config.data_dir);
            return Ok(None);
        }

        let mut coordinator = VersionCoordinator::new(
            package.id.clone(),
            package.name.clone(),
            self.config.target_languages.clone(),
        );
        for (variant, path) in &memory_files {
            coordinator.restore_variant(variant, path);
        }
        if coordinator.is_empty() {
            warn!("No readable memory for package {}, skipping", package.id);
            return Ok(None);
        }

        let files = coordinator
            .save_results(&self.config.output_dir, &self.config.game_versions)
            .with_context(|| format!("Failed to export package {}", package.id))?;

        Ok(Some(ExportReport {
            id: package.id.clone(),
            variants: coordinator.priority_order().into_iter().map(String::from).collect(),
            files,
        }))
    }
}
