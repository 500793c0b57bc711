use crate::config::types::{
    ClassifierConfig, Config, ListingConfig, StoreConfig, UserAgentConfig,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Page sizes the listing endpoint accepts
pub const ALLOWED_PAGE_SIZES: [u32; 5] = [10, 20, 40, 80, 100];

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_listing_config(&config.listing)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_store_config(&config.store)?;
    if let Some(classifier) = &config.classifier {
        validate_classifier_config(classifier)?;
    }
    Ok(())
}

/// Validates listing configuration
fn validate_listing_config(config: &ListingConfig) -> ConfigResult<()> {
    validate_http_url("base-url", &config.base_url)?;

    if config.item_code.trim().is_empty() {
        return Err(ConfigError::Validation(
            "item-code cannot be empty".to_string(),
        ));
    }

    if config.marker_phrase.trim().is_empty() {
        return Err(ConfigError::Validation(
            "marker-phrase cannot be empty".to_string(),
        ));
    }

    if !ALLOWED_PAGE_SIZES.contains(&config.page_size) {
        return Err(ConfigError::Validation(format!(
            "page-size must be one of {:?}, got {}",
            ALLOWED_PAGE_SIZES, config.page_size
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "listing timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.max_backoff_ms < config.initial_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= initial-backoff-ms ({})",
            config.max_backoff_ms, config.initial_backoff_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    // Client name: non-empty, alphanumeric + hyphens only
    if config.client_name.is_empty() {
        return Err(ConfigError::Validation(
            "client-name cannot be empty".to_string(),
        ));
    }

    if !config
        .client_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "client-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.client_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> ConfigResult<()> {
    validate_http_url("api-url", &config.api_url)?;

    for (name, value) in [
        ("owner", &config.owner),
        ("repo", &config.repo),
        ("path", &config.path),
        ("token-env", &config.token_env),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store {} cannot be empty",
                name
            )));
        }
    }

    if config.path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "store path must be relative to the repository root, got '{}'",
            config.path
        )));
    }

    if config.write_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "write-attempts must be >= 1, got {}",
            config.write_attempts
        )));
    }

    Ok(())
}

/// Validates classifier configuration
fn validate_classifier_config(config: &ClassifierConfig) -> ConfigResult<()> {
    validate_http_url("classifier endpoint", &config.endpoint)?;

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "classifier model cannot be empty".to_string(),
        ));
    }

    if config.max_text_bytes == 0 {
        return Err(ConfigError::Validation(
            "max-text-bytes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    Ok(())
}
