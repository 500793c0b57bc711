use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Tokens the run needs, read from the environment
#[derive(Clone)]
pub struct Secrets {
    pub store_token: String,
    pub classifier_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("store_token", &"<redacted>")
            .field(
                "classifier_key",
                &self.classifier_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use filing_watch::config::load_config;
///
/// let config = load_config(Path::new("filing-watch.toml")).unwrap();
/// println!("Tracking item {}", config.listing.item_code);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so runs can be matched to the settings they used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Reads the store token and, when classification is enabled, the model key
pub fn resolve_secrets(config: &Config) -> Result<Secrets, ConfigError> {
    let store_token = read_env(&config.store.token_env)?;
    let classifier_key = match &config.classifier {
        Some(classifier) => Some(read_env(&classifier.api_key_env)?),
        None => None,
    };
    Ok(Secrets {
        store_token,
        classifier_key,
    })
}

fn read_env(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingSecret(name.to_string())),
    }
}
