use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::structuring::{CaseSchema, FatalConfigError};

/// Application-level constants
pub const APP_NAME: &str = "Casewright";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the configuration file looked up in the app data directory.
pub const CONFIG_FILE_NAME: &str = "casewright_config.json";

/// Solvers accepted when the configuration file does not list any.
pub const DEFAULT_SOLVERS: &[&str] = &[
    "simpleFoam",
    "pisoFoam",
    "pimpleFoam",
    "icoFoam",
    "potentialFoam",
    "SRFSimpleFoam",
    "rhoSimpleFoam",
    "rhoPimpleFoam",
    "rhoCentralFoam",
    "sonicFoam",
    "buoyantSimpleFoam",
    "buoyantPimpleFoam",
    "interFoam",
    "reactingFoam",
];

/// Turbulence models accepted when the configuration file does not list any.
pub const DEFAULT_TURBULENCE_MODELS: &[&str] = &[
    "laminar",
    "kEpsilon",
    "realizableKE",
    "RNGkEpsilon",
    "LaunderSharmaKE",
    "kOmega",
    "kOmegaSST",
    "kOmegaSSTLM",
    "SpalartAllmaras",
    "Smagorinsky",
    "WALE",
    "kEqn",
];

const DEFAULT_TEMPERATURE: f32 = 0.9;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Fatal(#[from] FatalConfigError),
}

/// Get the application data directory
/// ~/Casewright/ on all platforms
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Get the transcript export directory
pub fn exports_dir() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("exports"))
}

/// Default configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,casewright_lib=debug"
}

/// Completion provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Sent as `chat_template_kwargs.enable_thinking`.
    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            api_version: None,
            model_name: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            enable_thinking: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Allowed solver and turbulence model names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub solvers: Vec<String>,
    pub turbulence_models: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            solvers: DEFAULT_SOLVERS.iter().map(|s| s.to_string()).collect(),
            turbulence_models: DEFAULT_TURBULENCE_MODELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Full application configuration, as stored in `casewright_config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
}

impl AppConfig {
    /// Load from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_env_overrides();
        tracing::debug!(path = %path.display(), model = %config.provider.model_name, "Loaded configuration");
        Ok(config)
    }

    /// Load `~/Casewright/casewright_config.json`.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path().ok_or(ConfigError::Missing("home directory"))?;
        Self::load(&path)
    }

    /// Override provider settings from `CASEWRIGHT_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CASEWRIGHT_API_KEY") {
            self.provider.api_key = key;
        }
        if let Ok(url) = std::env::var("CASEWRIGHT_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Ok(model) = std::env::var("CASEWRIGHT_MODEL") {
            self.provider.model_name = model;
        }
    }

    /// Build the validation schema. A malformed solver/model list is fatal.
    pub fn schema(&self) -> Result<CaseSchema, FatalConfigError> {
        CaseSchema::new(&self.schema.solvers, &self.schema.turbulence_models)
    }

    /// Check that the provider section names an endpoint and a model.
    pub fn validate_provider(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("provider.base_url"));
        }
        if self.provider.model_name.trim().is_empty() {
            return Err(ConfigError::Missing("provider.model_name"));
        }
        Ok(())
    }
}
