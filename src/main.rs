// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use polysub::app_config::{BackendDescriptor, Config, LogLevel, ProviderType, TranslationDomain};
use polysub::app_controller::Controller;

/// CLI Wrapper for TranslationDomain to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliDomain {
    General,
    #[value(alias = "wuxia")]
    Xianxia,
    Technical,
    #[value(alias = "drama")]
    Movie,
    Modern,
}

impl From<CliDomain> for TranslationDomain {
    fn from(cli_domain: CliDomain) -> Self {
        match cli_domain {
            CliDomain::General => TranslationDomain::General,
            CliDomain::Xianxia => TranslationDomain::Xianxia,
            CliDomain::Technical => TranslationDomain::Technical,
            CliDomain::Movie => TranslationDomain::Movie,
            CliDomain::Modern => TranslationDomain::Modern,
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

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an SRT file with every enabled backend
    Translate(TranslateArgs),

    /// Generate shell completions for polysub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// SRT file to translate
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (default: translated_<INPUT> beside the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language name (e.g. 'English')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language name (e.g. 'Vietnamese')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Subtitle lines per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Style preset for the translation
    #[arg(short, long, value_enum)]
    domain: Option<CliDomain>,

    /// Extra instructions appended to the prompt
    #[arg(short, long)]
    instructions: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Replace the configured backends with one simulated DeepL backend
    #[arg(long)]
    simulate: bool,

    /// Key for Gemini backends that have none in the config file
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// polysub - parallel subtitle translation
///
/// Splits an SRT file into batches and translates them with several
/// backends at once, one worker per backend.
#[derive(Parser, Debug)]
#[command(name = "polysub")]
#[command(version)]
#[command(about = "Multi-backend SRT subtitle translator")]
#[command(long_about = "polysub translates SRT subtitles by spreading batches over every enabled backend.

EXAMPLES:
    polysub translate movie.srt                       # Translate using conf.json
    polysub translate -t French -b 20 movie.srt       # Override target language and batch size
    polysub translate -d wuxia movie.srt              # Use the xianxia/wuxia style preset
    polysub translate --simulate movie.srt            # Dry run without network calls
    polysub completions bash > polysub.bash           # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't
    exist, a default one is created. GEMINI_API_KEY fills the key of Gemini
    backends that have none.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                tag,
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
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "polysub", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        log::set_max_level(LogLevel::from(level.clone()).into());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.into());

    if config.eligible_backends().next().is_none() {
        return Err(anyhow!(
            "No active APIs configured or missing keys. Enable a backend in {} or set GEMINI_API_KEY.",
            options.config_path.display()
        ));
    }

    let controller = Controller::with_config(config)?;
    let output = options
        .output
        .clone()
        .unwrap_or_else(|| Controller::default_output_path(&options.input));

    let outcome = controller.run(&options.input, &output, options.force_overwrite).await?;
    if let Some(path) = &outcome.issues_log {
        info!("Issues were recorded, see {}", path.display());
    }

    Ok(())
}

/// Command line flags take precedence over the file
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    let settings = &mut config.translation;
    if let Some(source) = &options.source_language {
        settings.source_language = source.clone();
    }
    if let Some(target) = &options.target_language {
        settings.target_language = target.clone();
    }
    if let Some(batch_size) = options.batch_size {
        settings.batch_size = batch_size;
    }
    if let Some(domain) = &options.domain {
        settings.domain = domain.clone().into();
    }
    if let Some(instructions) = &options.instructions {
        settings.custom_instructions = instructions.clone();
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }
    if let Some(key) = &options.api_key {
        config.apply_gemini_key(key);
    }
    if options.simulate {
        config.backends = vec![BackendDescriptor::new("simulated", ProviderType::DeepL, "Simulated DeepL")];
    }
}
