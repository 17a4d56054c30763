use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language pair, batch size and style for every run
    #[serde(default)]
    pub translation: TranslationSettings,

    /// Backends, one lane each when eligible
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendDescriptor>,

    /// Dispatcher tuning
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Stylistic preset injected into the backend's instructions
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationDomain {
    #[default]
    General,
    #[serde(alias = "wuxia")]
    Xianxia,
    Technical,
    Movie,
    Modern,
}

impl TranslationDomain {
    // @returns: Label shown to users
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Xianxia => "Xianxia/Wuxia",
            Self::Technical => "Technical/Academic",
            Self::Movie => "Movie/Drama",
            Self::Modern => "Modern Life",
        }
    }
}

impl std::fmt::Display for TranslationDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for TranslationDomain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "xianxia" | "wuxia" => Ok(Self::Xianxia),
            "technical" => Ok(Self::Technical),
            "movie" | "drama" => Ok(Self::Movie),
            "modern" => Ok(Self::Modern),
            _ => Err(anyhow!("Invalid translation domain: {}", s)),
        }
    }
}

/// Global translation settings shared by all lanes of a run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationSettings {
    /// Source language name, e.g. "English"
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language name, e.g. "Vietnamese"
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Units per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub domain: TranslationDomain,

    /// Free-form instructions appended to the system instruction
    #[serde(default)]
    pub custom_instructions: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            batch_size: default_batch_size(),
            domain: TranslationDomain::default(),
            custom_instructions: String::new(),
        }
    }
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    // @provider: Google Gemini (network)
    #[default]
    Gemini,
    // @provider: DeepL (simulated)
    DeepL,
    // @provider: Microsoft Translator (simulated)
    Microsoft,
}

impl ProviderType {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::DeepL => "DeepL",
            Self::Microsoft => "Microsoft",
        }
    }

    // @returns: Uppercase tag used in simulated output
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI",
            Self::DeepL => "DEEPL",
            Self::Microsoft => "MICROSOFT",
        }
    }

    /// Whether the provider refuses to run without an API key
    pub fn requires_credential(&self) -> bool {
        matches!(self, Self::Gemini)
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_name().to_lowercase())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "deepl" => Ok(Self::DeepL),
            "microsoft" => Ok(Self::Microsoft),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// One configured backend credential
#[derive(Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendDescriptor {
    // @field: Stable identifier
    pub id: String,

    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    // @field: Name shown in logs and unit attribution
    #[serde(default)]
    pub display_name: String,

    // @field: API key
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    // @field: Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    // @field: Service URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

// The API key must never end up in logs
impl std::fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("id", &self.id)
            .field("provider_type", &self.provider_type)
            .field("display_name", &self.display_name)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("enabled", &self.enabled)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl BackendDescriptor {
    pub fn new(id: impl Into<String>, provider_type: ProviderType, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider_type,
            display_name: display_name.into(),
            api_key: String::new(),
            enabled: true,
            model: None,
            endpoint: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Enabled, and either keyed or of a provider that needs no key
    pub fn is_eligible(&self) -> bool {
        self.enabled
            && (!self.api_key.trim().is_empty() || !self.provider_type.requires_credential())
    }

    // @returns: Display name, falling back to the provider name
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            self.provider_type.display_name()
        } else {
            &self.display_name
        }
    }
}

/// Dispatcher tuning
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DispatchConfig {
    /// Pause after a failed batch before the lane claims again
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Request timeout in seconds for network backends
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Artificial latency of simulated backends
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,
}

impl DispatchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            request_timeout_secs: default_timeout_secs(),
            simulated_delay_ms: default_simulated_delay_ms(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Vietnamese".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_cooldown_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_simulated_delay_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_backends() -> Vec<BackendDescriptor> {
    vec![BackendDescriptor::new("1", ProviderType::Gemini, "Primary Gemini")]
}

impl Config {
    /// Loads the configuration file, writing a default one if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.translation.batch_size == 0 {
            return Err(anyhow!("Batch size must be a positive integer"));
        }
        if self.translation.source_language.trim().is_empty() {
            return Err(anyhow!("Source language must not be empty"));
        }
        if self.translation.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }
        if self.dispatch.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be at least one second"));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.id.as_str()) {
                return Err(anyhow!("Duplicate backend id: {}", backend.id));
            }
        }

        Ok(())
    }

    /// Fills the key of every Gemini backend that has none
    pub fn apply_gemini_key(&mut self, api_key: &str) {
        if api_key.trim().is_empty() {
            return;
        }
        for backend in self
            .backends
            .iter_mut()
            .filter(|b| b.provider_type == ProviderType::Gemini && b.api_key.trim().is_empty())
        {
            backend.api_key = api_key.to_string();
        }
    }

    // @returns: Backends that will get a lane
    pub fn eligible_backends(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter().filter(|b| b.is_eligible())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            translation: TranslationSettings::default(),
            backends: default_backends(),
            dispatch: DispatchConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
