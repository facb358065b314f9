mod config;

pub use config::{
    ApiConfig, ConfigError, IndexConfig, LinkConfig, LodestarConfig, PollConfig, StoreConfig,
};
