// Configuration loader
//
// Layers, lowest to highest priority: built-in defaults, the TOML config
// file (~/.orderdesk/config.toml or --config), command-line overrides.
// Environment variables run last but only fill secrets left empty, so the
// database the flags select is the one whose password is looked up.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::{Config, DatabaseConfig, MySqlSettings};
use crate::agent::AgentProfile;

pub const CONFIG_DIR: &str = ".orderdesk";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_PASSWORD_ENV: &str = "ORDERDESK_DB_PASSWORD";

/// Default config path, `~/.orderdesk/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load the config file, apply command-line overrides, then fill empty
/// secrets from the environment.
pub fn resolve_config(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Config> {
    let config = load_config(path)?;
    Ok(apply_layers(config, overrides, |key| std::env::var(key).ok()))
}

/// Overrides first, then the environment lookup
pub fn apply_layers<F>(mut config: Config, overrides: ConfigOverrides, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    overrides.apply(&mut config);
    apply_env(&mut config, lookup);
    config
}

/// Load configuration from `path` (or the default location). A missing
/// default file is not an error; a missing explicitly requested file is.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    tracing::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Fill secrets from the environment when the file left them empty.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if config.provider.api_key.is_empty() {
        if let Some(key) = lookup(config.provider.provider.api_key_env()).filter(|k| !k.is_empty())
        {
            config.provider.api_key = key;
        }
    }

    if let DatabaseConfig::Mysql(settings) = &mut config.database {
        if settings.password.is_empty() {
            if let Some(password) = lookup(DB_PASSWORD_ENV) {
                settings.password = password;
            }
        }
    }
}

/// Command-line overrides. `None` leaves the loaded value untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub profile: Option<AgentProfile>,
    pub max_turns: Option<usize>,
    pub sqlite_path: Option<PathBuf>,
    pub read_write: bool,
    pub mysql_host: Option<String>,
    pub mysql_port: Option<u16>,
    pub mysql_user: Option<String>,
    pub mysql_password: Option<String>,
    pub mysql_database: Option<String>,
    pub include_tables: Option<Vec<String>>,
    pub debug: bool,
}

impl ConfigOverrides {
    fn wants_mysql(&self) -> bool {
        self.mysql_host.is_some()
            || self.mysql_port.is_some()
            || self.mysql_user.is_some()
            || self.mysql_password.is_some()
            || self.mysql_database.is_some()
    }

    pub fn apply(self, config: &mut Config) {
        let wants_mysql = self.wants_mysql();

        if let Some(key) = self.api_key {
            config.provider.api_key = key;
        }
        if let Some(model) = self.model {
            config.provider.model = Some(model);
        }
        if let Some(temperature) = self.temperature {
            config.provider.temperature = temperature;
        }
        if let Some(profile) = self.profile {
            config.agent.profile = profile;
        }
        if let Some(max_turns) = self.max_turns {
            config.agent.max_turns = max_turns;
        }
        if let Some(tables) = self.include_tables {
            config.agent.include_tables = Some(tables);
        }
        if self.debug {
            config.features.debug_logging = true;
        }

        if let Some(path) = self.sqlite_path {
            config.database = DatabaseConfig::Sqlite {
                path,
                read_only: !self.read_write,
            };
        } else if wants_mysql {
            let mut settings = match &config.database {
                DatabaseConfig::Mysql(existing) => existing.clone(),
                DatabaseConfig::Sqlite { .. } => MySqlSettings::default(),
            };
            if let Some(host) = self.mysql_host {
                settings.host = host;
            }
            if let Some(port) = self.mysql_port {
                settings.port = port;
            }
            if let Some(user) = self.mysql_user {
                settings.user = user;
            }
            if let Some(password) = self.mysql_password {
                settings.password = password;
            }
            if let Some(database) = self.mysql_database {
                settings.database = database;
            }
            if self.read_write {
                settings.read_only = false;
            }
            config.database = DatabaseConfig::Mysql(settings);
        } else if self.read_write {
            match &mut config.database {
                DatabaseConfig::Sqlite { read_only, .. } => *read_only = false,
                DatabaseConfig::Mysql(settings) => settings.read_only = false,
            }
        }
    }
}
