use std::{
    env,
    fmt::Display,
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

const SECRETS_DIR: &str = "/run/secrets";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub store_url: String,
    pub environment: Environment,
    pub require_clear_confirmation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_sources(|key| env::var(key).ok(), Path::new(SECRETS_DIR))
    }

    /// `lookup` stands in for the environment, `secrets_dir` for `/run/secrets`.
    pub fn from_sources<F>(lookup: F, secrets_dir: &Path) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: try_load(&var, "RUST_PORT", "1111")?,
            store_url: load_required(&var, "STORE_URL", secrets_dir)?,
            environment: try_load(&var, "APP_ENV", "production")?,
            require_clear_confirmation: try_load(&var, "REQUIRE_CLEAR_CONFIRMATION", "false")?,
        })
    }
}

fn try_load<T, F>(var: F, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value {raw:?}: {e}")
    })
}

fn load_required<F>(var: F, key: &str, secrets_dir: &Path) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = var(key) {
        return Ok(value.trim().to_string());
    }

    read_secret(secrets_dir.join(key))
        .with_context(|| format!("{key} must be set in the environment or as a secret"))
}

fn read_secret(path: PathBuf) -> Result<String> {
    let secret = read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {}: {e}", path.display());
            e
        })?;

    if secret.is_empty() {
        return Err(anyhow!("{} is empty", path.display()));
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_sources(
            |key| vars.get(key).cloned(),
            Path::new("/nonexistent/rollbook-secrets"),
        )
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STORE_URL", "redis://localhost:6379")]).unwrap();

        assert_eq!(config.port, 1111);
        assert_eq!(config.store_url, "redis://localhost:6379");
        assert!(config.environment.is_production());
        assert!(!config.require_clear_confirmation);
    }

    #[test]
    fn test_missing_store_url_is_fatal() {
        assert!(load(&[]).is_err());
        assert!(load(&[("STORE_URL", "   ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("STORE_URL", "memory://"),
            ("RUST_PORT", "8080"),
            ("APP_ENV", "development"),
            ("REQUIRE_CLEAR_CONFIRMATION", "true"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.require_clear_confirmation);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(load(&[("STORE_URL", "memory://"), ("RUST_PORT", "eighty")]).is_err());
        assert!(load(&[("STORE_URL", "memory://"), ("APP_ENV", "staging")]).is_err());
    }
}
