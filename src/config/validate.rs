use super::{ConfigError, types::RunConfig};

/// Upper bound for any single wait or request timeout.
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Validate configuration
/// Currently validates:
/// - Budgets and waits are non-zero and at most an hour, poll interval fits
///   inside the wait
/// - At least one target, each with a locator and a title
pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    let collector = &config.collector;
    if collector.max_items == 0 {
        return Err(invalid("collector.max_items cannot be 0"));
    }
    if collector.wait_timeout_secs == 0 {
        return Err(invalid("collector.wait_timeout_secs cannot be 0"));
    }
    if collector.wait_timeout_secs > MAX_TIMEOUT_SECS {
        return Err(invalid(format!(
            "collector.wait_timeout_secs cannot exceed {}",
            MAX_TIMEOUT_SECS
        )));
    }
    if collector.poll_interval_ms == 0 {
        return Err(invalid("collector.poll_interval_ms cannot be 0"));
    }
    if collector.poll_interval_ms > collector.wait_timeout_secs.saturating_mul(1000) {
        return Err(invalid(
            "collector.poll_interval_ms cannot exceed collector.wait_timeout_secs",
        ));
    }
    if config.session.request_timeout_secs == 0 {
        return Err(invalid("session.request_timeout_secs cannot be 0"));
    }
    if config.session.request_timeout_secs > MAX_TIMEOUT_SECS {
        return Err(invalid(format!(
            "session.request_timeout_secs cannot exceed {}",
            MAX_TIMEOUT_SECS
        )));
    }

    if config.targets.is_empty() {
        return Err(invalid("at least one [[targets]] entry is required"));
    }
    for (i, target) in config.targets.iter().enumerate() {
        if target.locator.trim().is_empty() {
            return Err(invalid(format!("targets[{}].locator cannot be empty", i)));
        }
        if target.title.trim().is_empty() {
            return Err(invalid(format!("targets[{}].title cannot be empty", i)));
        }
    }

    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}
