//! Configuration loading and resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unparsable TOML file is logged and ignored; the service
//! always starts with usable defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub const ENV_ROOT_FOLDER: &str = "LEGALEASE_ROOT_FOLDER";
pub const ENV_BIND: &str = "LEGALEASE_BIND";
pub const ENV_PORT: &str = "LEGALEASE_PORT";
pub const ENV_AI_PROVIDER: &str = "LEGALEASE_AI_PROVIDER";
pub const ENV_AI_MODEL: &str = "LEGALEASE_AI_MODEL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_LOG_LEVEL: &str = "LEGALEASE_LOG_LEVEL";

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_ANALYSES: usize = 4;
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
pub const DATABASE_FILE: &str = "legalease.db";

/// Which analyst backs document analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// Gemini when an API key resolves, otherwise the rule-based analyst
    #[default]
    Auto,
    Gemini,
    /// Rule-based offline analyst
    Mock,
}

impl FromStr for AiProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AiProvider::Auto),
            "gemini" => Ok(AiProvider::Gemini),
            "mock" | "rule-based" | "offline" => Ok(AiProvider::Mock),
            other => Err(Error::Config(format!("Unknown AI provider: {}", other))),
        }
    }
}

/// `[logging]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// `[ai]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiTomlConfig {
    pub provider: Option<AiProvider>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub requests_per_minute: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// `[limits]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: Option<usize>,
    pub max_concurrent_analyses: Option<usize>,
    pub analysis_timeout_secs: Option<u64>,
    pub session_ttl_hours: Option<i64>,
}

/// On-disk TOML configuration; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub secure_cookies: Option<bool>,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ai: AiTomlConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Platform config file locations, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("legalease").join("config.toml"));
    }
    if cfg!(unix) {
        paths.push(PathBuf::from("/etc/legalease/config.toml"));
    }
    paths
}

/// Load the TOML config, degrading to defaults on any problem
///
/// An explicit path is used as given; otherwise the first existing default
/// location wins.
pub fn load_toml_or_default(explicit: Option<&Path>) -> TomlConfig {
    let candidate = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_paths().into_iter().find(|p| p.exists()),
    };

    match candidate {
        Some(path) => match TomlConfig::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - continuing with defaults", e);
                TomlConfig::default()
            }
        },
        None => {
            info!("No config file found, using defaults");
            TomlConfig::default()
        }
    }
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("legalease"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/legalease"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("legalease"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/legalease"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("legalease"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\legalease"))
        } else {
            PathBuf::from("./legalease_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub ai_provider: Option<AiProvider>,
}

/// Resolved AI settings
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_level: String,
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
    pub ai: AiSettings,
    pub max_upload_bytes: usize,
    pub max_concurrent_analyses: usize,
    pub analysis_timeout_secs: u64,
    pub session_ttl_hours: i64,
}

impl ServiceConfig {
    /// Resolve from CLI, the process environment and TOML
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        Self::resolve_with(cli, toml, |name| std::env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with<E>(cli: &CliOverrides, toml: &TomlConfig, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let defaults = CompiledDefaults::for_current_platform();
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let root_folder = cli
            .root_folder
            .clone()
            .or_else(|| env(ENV_ROOT_FOLDER).map(PathBuf::from))
            .or_else(|| toml.root_folder.clone())
            .unwrap_or(defaults.root_folder);

        let bind = cli
            .bind
            .clone()
            .or_else(|| env(ENV_BIND))
            .or_else(|| toml.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match cli.port {
            Some(port) => port,
            None => match env(ENV_PORT) {
                Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                    Error::Config(format!("{}={} is not a valid port: {}", ENV_PORT, raw, e))
                })?,
                None => toml.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let log_level = env(ENV_LOG_LEVEL)
            .or_else(|| toml.logging.level.clone())
            .unwrap_or(defaults.log_level);

        let provider = match cli.ai_provider {
            Some(provider) => provider,
            None => match env(ENV_AI_PROVIDER) {
                Some(raw) => raw.parse()?,
                None => toml.ai.provider.unwrap_or_default(),
            },
        };

        let api_key = env(ENV_GEMINI_API_KEY)
            .or_else(|| toml.ai.api_key.clone())
            .filter(|k| is_valid_key(k));

        if provider == AiProvider::Gemini && api_key.is_none() {
            return Err(Error::Config(format!(
                "AI provider 'gemini' requires an API key. Configure using one of:\n\
                 1. Environment: {}=your-key-here\n\
                 2. TOML config: [ai] api_key = \"your-key\"",
                ENV_GEMINI_API_KEY
            )));
        }

        let ai = AiSettings {
            provider,
            api_key,
            model: env(ENV_AI_MODEL)
                .or_else(|| toml.ai.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: toml
                .ai
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            requests_per_minute: toml
                .ai
                .requests_per_minute
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            timeout_secs: toml.ai.timeout_secs.unwrap_or(60),
        };

        Ok(Self {
            root_folder,
            bind,
            port,
            log_level,
            secure_cookies: toml.secure_cookies.unwrap_or(false),
            cors_origins: toml.cors_origins.clone(),
            ai,
            max_upload_bytes: toml
                .limits
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_concurrent_analyses: toml
                .limits
                .max_concurrent_analyses
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENT_ANALYSES),
            analysis_timeout_secs: toml
                .limits
                .analysis_timeout_secs
                .unwrap_or(DEFAULT_ANALYSIS_TIMEOUT_SECS),
            session_ttl_hours: toml
                .limits
                .session_ttl_hours
                .filter(|h| *h > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS),
        })
    }

    /// Effective analyst after `auto` is resolved
    pub fn effective_provider(&self) -> AiProvider {
        match self.ai.provider {
            AiProvider::Auto if self.ai.api_key.is_some() => AiProvider::Gemini,
            AiProvider::Auto => AiProvider::Mock,
            other => other,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Creates the root folder and locates files inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }
}
