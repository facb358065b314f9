use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct LodestarConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LinkConfig {
    /// Segment name the producer attaches to.
    #[serde(default = "defaults::link_name")]
    pub name: String,
    /// Directory that backs named shared memory.
    #[serde(default = "defaults::shm_dir")]
    pub shm_dir: PathBuf,
    #[serde(default = "defaults::stale_threshold")]
    pub stale_threshold: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PollConfig {
    #[serde(default = "defaults::poll_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StoreConfig {
    #[serde(default = "defaults::database_path")]
    pub path: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiConfig {
    #[serde(default = "defaults::api_base_url")]
    pub base_url: String,
    #[serde(default = "defaults::request_spacing_ms")]
    pub request_spacing_ms: u64,
    #[serde(default = "defaults::request_timeout_secs")]
    pub timeout_secs: u64,
    /// Response language, passed through as `lang`.
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IndexConfig {
    #[serde(default = "defaults::index_batch_size")]
    pub batch_size: usize,
    #[serde(default = "defaults::index_max_age_days")]
    pub max_age_days: u64,
    #[serde(default = "defaults::search_limit")]
    pub search_limit: usize,
    /// Start a build in the background at startup.
    #[serde(default = "defaults::build_on_start")]
    pub build_on_start: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    use std::path::PathBuf;

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn link_name() -> String {
        "MumbleLink".into()
    }

    pub fn shm_dir() -> PathBuf {
        "/dev/shm".into()
    }

    pub fn stale_threshold() -> u32 {
        3
    }

    pub fn poll_interval_ms() -> u64 {
        500
    }

    pub fn database_path() -> PathBuf {
        "lodestar.db".into()
    }

    pub fn api_base_url() -> String {
        "https://api.guildwars2.com/v2".into()
    }

    pub fn request_spacing_ms() -> u64 {
        100
    }

    pub fn request_timeout_secs() -> u64 {
        10
    }

    pub fn index_batch_size() -> usize {
        200
    }

    pub fn index_max_age_days() -> u64 {
        7
    }

    pub fn search_limit() -> usize {
        20
    }

    pub fn build_on_start() -> bool {
        true
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: defaults::link_name(),
            shm_dir: defaults::shm_dir(),
            stale_threshold: defaults::stale_threshold(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::poll_interval_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: defaults::database_path(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::api_base_url(),
            request_spacing_ms: defaults::request_spacing_ms(),
            timeout_secs: defaults::request_timeout_secs(),
            lang: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::index_batch_size(),
            max_age_days: defaults::index_max_age_days(),
            search_limit: defaults::search_limit(),
            build_on_start: defaults::build_on_start(),
        }
    }
}

impl Default for LodestarConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            link: LinkConfig::default(),
            poll: PollConfig::default(),
            store: StoreConfig::default(),
            api: ApiConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl LodestarConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

impl LinkConfig {
    /// File that backs the named segment.
    pub fn segment_path(&self) -> PathBuf {
        self.shm_dir.join(&self.name)
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl ApiConfig {
    pub fn request_spacing(&self) -> Duration {
        Duration::from_millis(self.request_spacing_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl IndexConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_days * 24 * 60 * 60)
    }
}
