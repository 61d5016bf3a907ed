//! Configuration management.
//!
//! Settings come from an optional TOML file (`papersurf.toml` in the working
//! directory, or `<config dir>/papersurf/config.toml`) overridden by
//! `PAPERSURF_*` environment variables. The NCBI API key can also be set
//! directly via `NCBI_API_KEY`.
//!
//! ```toml
//! [api_keys]
//! ncbi = "your-ncbi-api-key"
//!
//! [search]
//! limit = 1200
//! limit_per_database = 400
//! databases = ["biorxiv", "arxiv", "pubmed"]
//! artifact_dir = "./tmp"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Federated search settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// NCBI E-utilities API key (optional, raises the call-rate ceiling)
    #[serde(default)]
    pub ncbi: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            ncbi: std::env::var("NCBI_API_KEY").ok(),
        }
    }
}

/// Federated search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Global cap on merged results
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Cap on results per individual database
    #[serde(default = "default_limit_per_database")]
    pub limit_per_database: usize,

    /// Databases to fan out to
    #[serde(default = "default_databases")]
    pub databases: Vec<String>,

    /// Directory holding the per-day result artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            limit_per_database: default_limit_per_database(),
            databases: default_databases(),
            artifact_dir: default_artifact_dir(),
        }
    }
}

fn default_limit() -> usize {
    1200
}

fn default_limit_per_database() -> usize {
    400
}

fn default_databases() -> Vec<String> {
    vec![
        "biorxiv".to_string(),
        "arxiv".to_string(),
        "pubmed".to_string(),
    ]
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

/// Load configuration from a file plus environment overrides
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(config::Environment::with_prefix("PAPERSURF").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the default locations
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("papersurf.toml");
    if local.exists() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("papersurf").join("config.toml");
    user.exists().then_some(user)
}

/// Get the default configuration (env vars or built-in defaults)
pub fn get_config() -> Config {
    Config::default()
}
