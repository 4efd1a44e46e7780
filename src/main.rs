// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use transmem::app_config::{self, Config, TranslatorProvider};
use transmem::app_controller::{Controller, Exporter};

/// CLI Wrapper for TranslatorProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslatorProvider {
    Llm,
    Plain,
}

impl From<CliTranslatorProvider> for TranslatorProvider {
    fn from(cli_provider: CliTranslatorProvider) -> Self {
        match cli_provider {
            CliTranslatorProvider::Llm => TranslatorProvider::Llm,
            CliTranslatorProvider::Plain => TranslatorProvider::Plain,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize translations of the configured packages (default command)
    Run(RunArgs),

    /// Rebuild output files from the translation memory, without any backend call
    Export(ExportArgs),

    /// Generate shell completions for transmem
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Translation backend to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslatorProvider>,

    /// Model name for the LLM backend
    #[arg(short, long)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Only process these package ids (repeatable)
    #[arg(long = "package", value_name = "ID")]
    packages: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct ExportArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Only export these package ids (repeatable)
    #[arg(long = "package", value_name = "ID")]
    packages: Vec<String>,
}

/// transmem - translation memory for multi-version content packages
///
/// Keeps localized text of content packages in sync with their source text,
/// reusing remembered translations and only calling the backend for new or
/// changed entries.
#[derive(Parser, Debug)]
#[command(name = "transmem")]
#[command(version)]
#[command(about = "Incremental translation memory for multi-version content packages")]
#[command(long_about = "transmem reads the raw localization file of every configured package,
reuses translations from its memory, copies identical entries between versions
and only sends new or changed text to the translation backend.

EXAMPLES:
    transmem                                   # Process every package in conf.json
    transmem run -c other.json                 # Use another configuration file
    transmem -p llm -m gpt-4o-mini             # Override backend and model
    transmem --package 2009463077              # Process a single package
    transmem export                            # Rebuild outputs from memory only
    transmem completions bash > transmem.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(level)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} [{}] {}\x1B[0m",
                color,
                now,
                tag,
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is set after the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "transmem", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Run(args)) => run(args).await,
        Some(Commands::Export(args)) => export(args),
        None => run(cli.run).await,
    }
}

async fn run(options: RunArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.translator.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translator.llm.model = model.clone();
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    log::set_max_level(config.log_level.to_level_filter());

    let controller = match Controller::with_config(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    let summary = controller.run(&options.packages).await?;
    info!("Total cost: {:.6}", summary.cost);
    Ok(())
}

fn export(options: ExportArgs) -> Result<()> {
    let mut config = Config::load_or_create(&options.config_path)?;
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    let exporter = match Exporter::with_config(config) {
        Ok(exporter) => exporter,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    exporter.run(&options.packages)?;
    Ok(())
}
