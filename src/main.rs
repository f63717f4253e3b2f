// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doctrans::app_config::{self, Config, TranslationProvider};
use doctrans::file_utils::FileManager;
use doctrans::providers::openai::OpenAI;
use doctrans::providers::Provider;
use doctrans::tool::{self, DocumentTranslatorTool};
use doctrans::translation::{CancellationFlag, Segmenter, SegmenterConfig};

/// Environment variables holding the API key, in lookup order
const API_KEY_VARS: [&str; 2] = ["DOCTRANS_API_KEY", "DEEPSEEK_API_KEY"];

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "deepseek")]
    DeepSeek,
    #[value(name = "openai")]
    OpenAI,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::DeepSeek => TranslationProvider::DeepSeek,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
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
    /// Translate a document (default command)
    Translate {
        /// Text file to translate
        #[arg(value_name = "FILE")]
        input_path: PathBuf,
    },

    /// Split a document and print chunk statistics without translating
    Split {
        /// Text file to split
        #[arg(value_name = "FILE")]
        input_path: PathBuf,
    },

    /// Check that the configured provider is reachable
    Check,

    /// Generate shell completions for doctrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Options that override values from the configuration file
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Configuration file path
    #[arg(short, long = "config", env = "DOCTRANS_CONFIG", default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long, env = "DOCTRANS_MODEL", global = true)]
    model: Option<String>,

    /// OpenAI-compatible endpoint URL
    #[arg(long, env = "DOCTRANS_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Source language code (e.g., 'en'), or 'auto'
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'zh', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Maximum token units per chunk
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Token units repeated at the start of the next chunk
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Directory for translated files (defaults to the input's directory)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

/// doctrans - translate long documents with LLMs
///
/// Splits a text document into token-bounded chunks, translates them one after
/// another with a short excerpt of the previous translation as context, and
/// writes the merged result next to the source.
#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(version)]
#[command(about = "LLM-powered long document translation tool")]
#[command(long_about = "doctrans translates documents too long for a single model call.

EXAMPLES:
    doctrans report.txt                          # Translate using default config
    doctrans -t fr report.txt                    # Translate into French
    doctrans -p openai -m gpt-4o report.txt      # Use specific provider and model
    doctrans --chunk-size 1000 report.txt        # Use smaller chunks
    doctrans split report.txt                    # Show how the document would be split
    doctrans check                               # Test the provider connection
    doctrans completions bash > doctrans.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default
    one will be created automatically.

    The API key is read from DOCTRANS_API_KEY (or DEEPSEEK_API_KEY) when the
    config file leaves it empty. DOCTRANS_CONFIG, DOCTRANS_MODEL and
    DOCTRANS_ENDPOINT stand in for the matching options. A .env file in the
    working directory is loaded.

SUPPORTED PROVIDERS:
    deepseek  - DeepSeek API (default: deepseek-chat, requires API key)
    openai    - OpenAI API (default: gpt-4o-mini, requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Text file to translate
    #[arg(value_name = "FILE")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    global: GlobalOptions,
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
        // The filter itself is adjusted later through log::set_max_level
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
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
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Info until the configuration has been read
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();
    let options = cli.global;

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doctrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate { input_path }) => run_translate(&options, &input_path).await,
        Some(Commands::Split { input_path }) => run_split(&options, &input_path),
        Some(Commands::Check) => run_check(&options).await,
        None => {
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("FILE is required when no subcommand is specified"))?;
            run_translate(&options, &input_path).await
        }
    }
}

/// Load the config file and apply command line and environment overrides
fn load_config(options: &GlobalOptions) -> Result<Config> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", options.config_path))?;

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.model = model.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.translation.endpoint = endpoint.clone();
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(chunk_size) = options.chunk_size {
        config.chunking.chunk_size = chunk_size;
    }
    if let Some(chunk_overlap) = options.chunk_overlap {
        config.chunking.chunk_overlap = chunk_overlap;
    }
    if let Some(output_dir) = &options.output_dir {
        config.output.directory = Some(output_dir.clone());
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    if config.translation.api_key.is_empty() {
        if let Some(key) = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        {
            debug!("Using API key from environment");
            config.translation.api_key = key;
        }
    }

    log::set_max_level(config.log_level.to_level_filter());
    Ok(config)
}

fn build_provider(config: &Config) -> Arc<dyn Provider> {
    Arc::new(OpenAI::from_config(&config.translation))
}

async fn run_translate(options: &GlobalOptions, input_path: &Path) -> Result<()> {
    let config = load_config(options)?;
    config.validate().context("Configuration validation failed")?;

    info!(
        "doctrans: {} - {} ({} -> {})",
        config.translation.provider.display_name(),
        config.translation.get_model(),
        config.source_language,
        config.target_language
    );

    let progress_bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));

    let cancellation = CancellationFlag::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current chunk");
            on_interrupt.cancel();
        }
    });

    let bar = progress_bar.clone();
    let translator = DocumentTranslatorTool::new(config.clone(), build_provider(&config))
        .with_cancellation(cancellation)
        .with_progress(move |progress| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.completed as u64);
            bar.set_message(progress.state.to_string());
        });

    let result = translator.try_translate(input_path).await;
    progress_bar.finish_and_clear();

    println!("{}", tool::status_message(&result));

    match result {
        Ok(outcome) => {
            debug!("{}", outcome.report.usage.summary());
            if outcome.report.oversized_units > 0 {
                warn!(
                    "{} word(s) were longer than a chunk and had to be split",
                    outcome.report.oversized_units
                );
            }
            Ok(())
        }
        Err(_) => std::process::exit(1),
    }
}

fn run_split(options: &GlobalOptions, input_path: &Path) -> Result<()> {
    let config = load_config(options)?;
    let text = FileManager::read_text(input_path)?;

    let segmenter = Segmenter::new(SegmenterConfig::from(&config.chunking));
    let segmentation = segmenter
        .split(&text)
        .with_context(|| format!("Failed to split {:?}", input_path))?;

    println!(
        "{:?}: {} bytes, ~{} tokens, {} chunk(s) (chunk_size={}, chunk_overlap={})",
        input_path,
        text.len(),
        segmenter.count_tokens(&text),
        segmentation.chunks.len(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    for (i, chunk) in segmentation.chunks.iter().enumerate() {
        println!(
            "  #{:<4} bytes {:>8}..{:<8} ~{:>6} tokens  overlap {} bytes",
            i + 1,
            chunk.start,
            chunk.end,
            chunk.tokens,
            chunk.overlap_len
        );
    }
    for unit in &segmentation.oversized_units {
        warn!(
            "Word at byte {} needs ~{} tokens and is split by character: {:?}",
            unit.offset, unit.tokens, unit.preview
        );
    }

    Ok(())
}

async fn run_check(options: &GlobalOptions) -> Result<()> {
    let config = load_config(options)?;
    config.validate().context("Configuration validation failed")?;

    let client = OpenAI::from_config(&config.translation);
    info!(
        "Checking {} at {}",
        config.translation.provider.display_name(),
        config.translation.get_endpoint()
    );

    match client.test_connection().await {
        Ok(()) => {
            println!(
                "Connection to {} succeeded (model {})",
                config.translation.get_endpoint(),
                client.model()
            );
            Ok(())
        }
        Err(e) => {
            error!("Connection check failed: {}", e);
            Err(anyhow::Error::new(e).context("Provider is not reachable"))
        }
    }
}
