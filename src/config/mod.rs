//! Configuration: connection parameters and TOML settings.

mod connection;
mod settings;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, CacheSettings, ConnectionSettings, GeneratorSettings, ProfilerSettings,
    ServerSettings, Settings, SettingsError,
};
