//! Configuration validation

use super::*;
use crate::error::{Result, SustainError};

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_completion_config(&config.completion)?;
    validate_optimizer_config(&config.optimizer)?;
    validate_accounting_config(&config.accounting, &config.completion)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        return Err(SustainError::Config(
            "Server port must be greater than 0".to_string()
        ));
    }

    if config.host.is_empty() {
        return Err(SustainError::Config(
            "Server host cannot be empty".to_string()
        ));
    }

    if config.max_body_size_kb == 0 {
        return Err(SustainError::Config(
            "Max body size must be greater than 0".to_string()
        ));
    }

    for origin in &config.allowed_origins {
        if !origin.starts_with("http://") && !origin.starts_with("https://") {
            return Err(SustainError::Config(format!(
                "Allowed origin '{}' must start with http:// or https://",
                origin
            )));
        }
    }

    Ok(())
}

/// Validate completion provider configuration
fn validate_completion_config(config: &CompletionConfig) -> Result<()> {
    if !config.api_url.starts_with("http://") && !config.api_url.starts_with("https://") {
        return Err(SustainError::Config(
            "Completion API URL must start with http:// or https://".to_string()
        ));
    }

    if config.timeout_secs == 0 {
        return Err(SustainError::Config(
            "Completion timeout must be greater than 0".to_string()
        ));
    }

    if config.timeout_secs > 300 {
        return Err(SustainError::Config(
            "Completion timeout too large (max: 300 seconds)".to_string()
        ));
    }

    if config.max_output_tokens == 0 {
        return Err(SustainError::Config(
            "Max output tokens must be greater than 0".to_string()
        ));
    }

    if config.allowed_models.is_empty() {
        return Err(SustainError::Config(
            "At least one allowed model is required".to_string()
        ));
    }

    if !config.allowed_models.contains(&config.default_model) {
        return Err(SustainError::Config(format!(
            "Default model '{}' is not in the allowed models",
            config.default_model
        )));
    }

    if config.cache_enabled {
        if config.cache_size == 0 {
            return Err(SustainError::Config(
                "Cache size must be greater than 0 when cache is enabled".to_string()
            ));
        }

        if config.cache_ttl_secs == 0 {
            return Err(SustainError::Config(
                "Cache TTL must be greater than 0 when cache is enabled".to_string()
            ));
        }
    }

    Ok(())
}

/// Validate optimizer configuration
fn validate_optimizer_config(config: &OptimizerConfig) -> Result<()> {
    if config.max_input_chars == 0 {
        return Err(SustainError::Config(
            "Max input length must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate accounting configuration against the model settings
fn validate_accounting_config(
    config: &AccountingConfig,
    completion: &CompletionConfig,
) -> Result<()> {
    if !is_positive(config.co2_per_kwh) {
        return Err(SustainError::Config(
            "CO2 per kWh must be a positive number".to_string()
        ));
    }

    if !is_positive(config.reporting_energy_per_token) {
        return Err(SustainError::Config(
            "Reporting energy per token must be a positive number".to_string()
        ));
    }

    for (model, coefficient) in &config.model_energy_per_token {
        if !is_positive(*coefficient) {
            return Err(SustainError::Config(format!(
                "Energy per token for '{}' must be a positive number",
                model
            )));
        }
    }

    if !config.model_energy_per_token.contains_key(&completion.default_model) {
        return Err(SustainError::Config(format!(
            "No energy coefficient for default model '{}'",
            completion.default_model
        )));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.to_lowercase().as_str()) {
        return Err(SustainError::Config(format!(
            "Invalid log level: {} (must be one of: {:?})",
            config.level, valid_levels
        )));
    }

    let valid_formats = ["json", "compact", "pretty"];
    if !valid_formats.contains(&config.format.as_str()) {
        return Err(SustainError::Config(format!(
            "Invalid log format: {} (must be one of: {:?})",
            config.format, valid_formats
        )));
    }

    Ok(())
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
