#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use runalign::alignment::AlignmentStrategy;
use runalign::app_config::{self, Config, EmbeddingBackend, TranslationProvider};
use runalign::processor::{default_debug_path, AlignmentEngine};
use runalign::Glossary;

/// CLI Wrapper for AlignmentStrategy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliStrategy {
    Embedding,
    Llm,
}

impl From<CliStrategy> for AlignmentStrategy {
    fn from(cli_strategy: CliStrategy) -> Self {
        match cli_strategy {
            CliStrategy::Embedding => AlignmentStrategy::Embedding,
            CliStrategy::Llm => AlignmentStrategy::Llm,
        }
    }
}

/// CLI Wrapper for EmbeddingBackend to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliEmbedder {
    Ollama,
    Hashed,
}

impl From<CliEmbedder> for EmbeddingBackend {
    fn from(cli_embedder: CliEmbedder) -> Self {
        match cli_embedder {
            CliEmbedder::Ollama => EmbeddingBackend::Ollama,
            CliEmbedder::Hashed => EmbeddingBackend::Hashed,
        }
    }
}

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
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

/// Options shared by the alignment commands
#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Alignment strategy
    #[arg(long, value_enum)]
    strategy: Option<CliStrategy>,

    /// Embedding backend for the embedding strategy
    #[arg(long, value_enum)]
    embedder: Option<CliEmbedder>,

    /// Translation provider for the llm strategy
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name for the translation provider
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'en', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// JSON glossary merged into the phrase mappings
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Minimum similarity for an alignment
    #[arg(long)]
    threshold: Option<f64>,

    /// Longest phrase, in words, used as a matching unit
    #[arg(long)]
    max_phrase_length: Option<usize>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Input, output and debug paths
#[derive(Args, Debug)]
struct StreamArgs {
    /// Line-delimited JSON input
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Line-delimited JSON output
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Debug trace output (default: <OUTPUT stem>_debug.<ext>)
    #[arg(long, value_name = "PATH")]
    debug: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align translated paragraphs
    Align(StreamArgs),

    /// Align translated table cells
    AlignTables(StreamArgs),

    /// Generate shell completions for runalign
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// runalign - carry source formatting over to translated paragraphs
#[derive(Parser, Debug)]
#[command(name = "runalign")]
#[command(version)]
#[command(about = "Redistribute formatting runs over translated text")]
#[command(long_about = "runalign reads translated paragraphs as line-delimited JSON and writes them back
with `aligned_runs`: the source formatting redistributed over the translated text.

EXAMPLES:
    runalign align translated.jsonl aligned.jsonl                 # Use default config
    runalign align in.jsonl out.jsonl --embedder hashed           # Offline embeddings
    runalign align in.jsonl out.jsonl --strategy llm -p openai    # Term lookups via OpenAI
    runalign align in.jsonl out.jsonl -g glossary.json            # Add glossary mappings
    runalign align-tables tables.jsonl aligned_tables.jsonl       # Table cells
    runalign completions bash > runalign.bash                     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
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
            let (emoji, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
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
    // The level is refined once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "runalign", &mut std::io::stdout());
            Ok(())
        }
        Commands::Align(args) => run_stream(args, false).await,
        Commands::AlignTables(args) => run_stream(args, true).await,
    }
}

/// Load the config and apply command-line overrides
fn load_config(options: &CommonArgs) -> Result<Config> {
    // Apply the command-line level before anything logs
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config)?;

    if let Some(strategy) = &options.strategy {
        config.alignment.strategy = strategy.clone().into();
    }
    if let Some(embedder) = &options.embedder {
        config.embedding.backend = embedder.clone().into();
    }
    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.set_model(model.clone());
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(glossary) = &options.glossary {
        config.glossary_path = Some(glossary.to_string_lossy().into_owned());
    }
    if let Some(threshold) = options.threshold {
        config.alignment.similarity_threshold = threshold;
    }
    if let Some(max_phrase_length) = options.max_phrase_length {
        config.alignment.max_phrase_length = max_phrase_length;
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_stream(args: StreamArgs, tables: bool) -> Result<()> {
    let config = load_config(&args.common)?;

    let glossary = match &config.glossary_path {
        Some(path) => Some(Arc::new(Glossary::load(Path::new(path))?)),
        None => None,
    };

    let engine = AlignmentEngine::from_config(&config, glossary)?.with_progress(true);
    let debug_path = args.debug.clone().unwrap_or_else(|| default_debug_path(&args.output));

    let summary = if tables {
        engine.process_tables(&args.input, &args.output, &debug_path).await?
    } else {
        engine.process_paragraphs(&args.input, &args.output, &debug_path).await?
    };

    info!("Done: {}", summary);
    Ok(())
}
