use crate::config::types::{Config, DatasetConfig, EgressConfig, FetchConfig, SiteConfig, SupervisorConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_egress_config(&config.egress)?;
    validate_dataset_config(&config.dataset)?;
    validate_supervisor_config(&config.supervisor)?;
    validate_sites(&config.sites)?;
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1s".to_string(),
        ));
    }

    if config.connect_timeout < 1 || config.connect_timeout > config.request_timeout {
        return Err(ConfigError::Validation(format!(
            "connect_timeout must be between 1s and request_timeout ({}s), got {}s",
            config.request_timeout, config.connect_timeout
        )));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates egress pool configuration
fn validate_egress_config(config: &EgressConfig) -> Result<(), ConfigError> {
    validate_egress_address(&config.preferred_address)?;

    let listing = Url::parse(&config.listing_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing_url: {}", e)))?;
    if listing.scheme() != "http" && listing.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "listing_url must use http or https, got '{}'",
            listing.scheme()
        )));
    }

    if config.max_candidates < 1 {
        return Err(ConfigError::Validation(format!(
            "max_candidates must be >= 1, got {}",
            config.max_candidates
        )));
    }

    if config.min_viable > config.max_candidates {
        return Err(ConfigError::Validation(format!(
            "min_viable ({}) cannot exceed max_candidates ({})",
            config.min_viable, config.max_candidates
        )));
    }

    if config.listing_attempts < 1 {
        return Err(ConfigError::Validation(
            "listing_attempts must be >= 1".to_string(),
        ));
    }

    if config.max_global_refreshes < 1 {
        return Err(ConfigError::Validation(
            "max_global_refreshes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates a host:port egress address
fn validate_egress_address(address: &str) -> Result<(), ConfigError> {
    let Some((host, port)) = address.rsplit_once(':') else {
        return Err(ConfigError::Validation(format!(
            "Egress address '{}' must be host:port",
            address
        )));
    };

    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Egress address '{}' has an invalid host",
            address
        )));
    }

    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "Egress address '{}' has an invalid port",
            address
        ))),
    }
}

fn validate_dataset_config(config: &DatasetConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "dataset path cannot be empty".to_string(),
        ));
    }

    if config.save_attempts < 1 {
        return Err(ConfigError::Validation(
            "save_attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_supervisor_config(config: &SupervisorConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_sites < 1 || config.max_concurrent_sites > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sites must be between 1 and 100, got {}",
            config.max_concurrent_sites
        )));
    }

    if config.stats_dir.is_empty() {
        return Err(ConfigError::Validation(
            "stats_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for site in sites {
        validate_site_name(&site.name)?;

        if !seen.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate site name '{}'",
                site.name
            )));
        }

        if site.min_sleep > site.max_sleep {
            return Err(ConfigError::Validation(format!(
                "Site '{}': min_sleep ({}ms) cannot exceed max_sleep ({}ms)",
                site.name, site.min_sleep, site.max_sleep
            )));
        }

        validate_selector(&site.name, &site.price_selector)?;
        if let Some(selector) = &site.stock_selector {
            validate_selector(&site.name, selector)?;
        }
    }

    Ok(())
}

/// Site names travel as a CLI argument and a file name
fn validate_site_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only alphanumeric characters, '-', '_' or '.', got '{}'",
            name
        )));
    }

    Ok(())
}

fn validate_selector(site: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("Site '{}': '{}': {}", site, selector, e))
    })?;
    Ok(())
}
