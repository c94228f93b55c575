use clap::Parser;
use serde::{Deserialize, Deserializer};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Credential variable pairs (url, key), in lookup order.
const CREDENTIAL_VARS: [(&str, &str); 2] = [("DB_URL", "DB_KEY"), ("SUPABASE_URL", "SUPABASE_KEY")];

#[derive(Parser, Debug)]
#[command(name = "bookwish")]
#[command(about = "Runs the bookwish service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bookwish")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub expose_errors: bool,
    /// Upper bound on `limit` for list endpoints; unbounded when unset.
    #[serde(default)]
    pub max_page_size: Option<u32>,
}

impl Default for App {
    fn default() -> Self {
        App {
            port: default_port(),
            expose_errors: true,
            max_page_size: None,
        }
    }
}

fn default_port() -> u16 {
    5000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

// An unset `${VAR}` leaves an empty YAML value behind.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: String::new(),
            key: String::new(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Loads from `path`, or the default config file when it exists, or the
    /// environment alone. The result is always validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let lookup = |name: &str| env::var(name).ok();
        let default_path = default_config_path();

        let cfg = match path {
            Some(path) => Self::from_file(path, lookup)?,
            None if default_path.exists() => Self::from_file(&default_path, lookup)?,
            None => Self::from_lookup(lookup),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let yaml_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml_str, lookup)
    }

    pub fn from_yaml<F>(yaml_str: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let yaml_with_env = substitute_env_vars(yaml_str, &lookup);
        let mut config: Config = serde_yaml::from_str(&yaml_with_env)?;
        config.fill_from(&lookup);
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            config.app.port = port;
        }
        config.fill_from(&lookup);
        config
    }

    fn fill_from<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if !db.url.trim().is_empty() && !db.key.trim().is_empty() {
            return;
        }
        let (url, key) = credential_pair(lookup);
        if db.url.trim().is_empty() {
            db.url = url;
        }
        if db.key.trim().is_empty() {
            db.key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingCredential("DB_URL"));
        }
        if self.database.key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("DB_KEY"));
        }
        Ok(())
    }
}

// First naming pair with both halves set. Halves of different pairs are
// never mixed; with no complete pair the primary names are reported as-is.
fn credential_pair<F>(lookup: &F) -> (String, String)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
    CREDENTIAL_VARS
        .iter()
        .find_map(|&(url, key)| Some((read(url)?, read(key)?)))
        .unwrap_or_else(|| {
            let (url, key) = CREDENTIAL_VARS[0];
            (read(url).unwrap_or_default(), read(key).unwrap_or_default())
        })
}

fn substitute_env_vars<F>(yaml_str: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = yaml_str.to_string();
    let mut offset = 0;

    while let Some(start) = result[offset..].find("${") {
        let actual_start = offset + start;
        let Some(end) = result[actual_start..].find('}') else {
            break;
        };
        let var_name = &result[actual_start + 2..actual_start + end];

        // ${VAR:-default}
        let env_value = if let Some(default_start) = var_name.find(":-") {
            let actual_var = &var_name[..default_start];
            let default_val = &var_name[default_start + 2..];
            lookup(actual_var).unwrap_or_else(|| default_val.to_string())
        } else {
            lookup(var_name).unwrap_or_else(|| {
                tracing::warn!("environment variable '{}' not found", var_name);
                String::new()
            })
        };

        result.replace_range(actual_start..actual_start + end + 1, &env_value);
        offset = actual_start + env_value.len();
    }

    result
}
