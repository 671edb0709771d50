// Configuration module
// Public interface for configuration loading

mod loader;
mod settings;

pub use loader::{
    apply_env, apply_layers, default_config_path, load_config, resolve_config, ConfigOverrides,
    DB_PASSWORD_ENV,
};
pub use settings::{
    AgentConfig, Config, ConfigError, DatabaseConfig, FeaturesConfig, MySqlSettings,
    ProviderConfig, ProviderType, DEFAULT_ORDERS_TABLE, GROQ_MODELS,
};
