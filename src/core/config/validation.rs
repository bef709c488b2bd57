use super::app_config::AppConfig;
use super::service::ConfigError;

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let azure = &config.azure_openai;
    validate_required_string("azure_openai.endpoint", &azure.endpoint)?;
    validate_required_string("azure_openai.api_key", &azure.api_key)?;
    validate_required_string("azure_openai.model", &azure.model)?;
    validate_required_string("azure_openai.api_version", &azure.api_version)?;
    validate_range("azure_openai.max_tokens", azure.max_tokens as u64, 1, 1_000_000)?;
    if !(0.0..=2.0).contains(&azure.temperature) {
        return Err(invalid(
            "azure_openai.temperature",
            "must be between 0.0 and 2.0",
        ));
    }
    if let Some(max_context) = azure.max_context_length {
        if max_context <= azure.max_tokens {
            return Err(invalid(
                "azure_openai.max_context_length",
                "must be greater than max_tokens",
            ));
        }
    }

    let retry = &config.retry;
    validate_range("retry.max_attempts", retry.max_attempts as u64, 1, 100)?;
    validate_range("retry.max_delay_ms", retry.max_delay_ms, 0, 600_000)?;
    if retry.initial_delay_ms > retry.max_delay_ms {
        return Err(invalid(
            "retry.initial_delay_ms",
            "must not exceed retry.max_delay_ms",
        ));
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        return Err(invalid("retry.multiplier", "must be at least 1.0"));
    }

    for (index, origin) in config.server.cors_allowed_origins.iter().enumerate() {
        if origin.trim().is_empty() {
            return Err(invalid(
                &format!("server.cors_allowed_origins[{}]", index),
                "value cannot be empty",
            ));
        }
    }

    Ok(())
}

fn validate_required_string(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(path, "value is required"));
    }
    Ok(())
}

fn validate_range(path: &str, number: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if number < min || number > max {
        return Err(invalid(
            path,
            &format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
