use chrono::FixedOffset;

use crate::app_config::{AppConfig, Environment, TitleMatch};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let sprout_api_token = require("SPROUT_API_TOKEN")?;
    let sprout_customer_id = require("SPROUT_CUSTOMER_ID")?;
    let google_client_id = require("GOOGLE_CLIENT_ID")?;
    let google_client_secret = require("GOOGLE_CLIENT_SECRET")?;
    let google_refresh_token = require("GOOGLE_REFRESH_TOKEN")?;
    let google_drive_folder_id = require("GOOGLE_DRIVE_FOLDER_ID")?;

    let env = parse_environment(&or_default("SPROUTSYNC_ENV", "development"))?;
    let log_level = or_default("SPROUTSYNC_LOG_LEVEL", "info");
    let sprout_base_url = or_default("SPROUT_BASE_URL", "https://api.sproutsocial.com/v1/");
    let title_prefix = or_default("SPROUTSYNC_TITLE_PREFIX", "Sprout Analytics");
    let title_match = parse_title_match(&or_default("SPROUTSYNC_TITLE_MATCH", "anchored"))?;

    let offset_minutes = or_default("SPROUTSYNC_TITLE_UTC_OFFSET_MINUTES", "0")
        .parse::<i32>()
        .map_err(|e| invalid("SPROUTSYNC_TITLE_UTC_OFFSET_MINUTES", e.to_string()))?;
    let title_utc_offset = offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            invalid(
                "SPROUTSYNC_TITLE_UTC_OFFSET_MINUTES",
                format!("{offset_minutes} minutes is outside +/-24h"),
            )
        })?;

    let lookback_days = parse_u32("SPROUTSYNC_LOOKBACK_DAYS", "30")?;
    if lookback_days == 0 {
        return Err(invalid(
            "SPROUTSYNC_LOOKBACK_DAYS",
            "must be at least 1".to_string(),
        ));
    }

    let max_retries = parse_u32("SPROUTSYNC_MAX_RETRIES", "5")?;
    let retry_initial_delay_ms = parse_u64("SPROUTSYNC_RETRY_INITIAL_DELAY_MS", "2000")?;
    let retry_max_delay_ms = parse_u64("SPROUTSYNC_RETRY_MAX_DELAY_MS", "120000")?;
    if retry_max_delay_ms < retry_initial_delay_ms {
        return Err(invalid(
            "SPROUTSYNC_RETRY_MAX_DELAY_MS",
            format!(
                "max delay ({retry_max_delay_ms}) must be >= initial delay ({retry_initial_delay_ms})"
            ),
        ));
    }

    let token_refresh_threshold_secs = parse_u64("SPROUTSYNC_TOKEN_REFRESH_THRESHOLD_SECS", "300")?;
    let group_success_delay_secs = parse_u64("SPROUTSYNC_GROUP_SUCCESS_DELAY_SECS", "60")?;
    let group_failure_delay_secs = parse_u64("SPROUTSYNC_GROUP_FAILURE_DELAY_SECS", "30")?;
    let request_timeout_secs = parse_u64("SPROUTSYNC_REQUEST_TIMEOUT_SECS", "30")?;
    let schedule_cron = or_default("SPROUTSYNC_SCHEDULE_CRON", "0 0 6 * * *");

    Ok(AppConfig {
        env,
        log_level,
        sprout_api_token,
        sprout_customer_id,
        sprout_base_url,
        google_client_id,
        google_client_secret,
        google_refresh_token,
        google_drive_folder_id,
        title_prefix,
        title_match,
        title_utc_offset,
        lookback_days,
        max_retries,
        retry_initial_delay_ms,
        retry_max_delay_ms,
        token_refresh_threshold_secs,
        group_success_delay_secs,
        group_failure_delay_secs,
        request_timeout_secs,
        schedule_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SPROUTSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_title_match(s: &str) -> Result<TitleMatch, ConfigError> {
    match s {
        "anchored" => Ok(TitleMatch::Anchored),
        "contains" => Ok(TitleMatch::Contains),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SPROUTSYNC_TITLE_MATCH".to_string(),
            reason: format!("expected 'anchored' or 'contains', got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
