use chrono::FixedOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the document locator decides a listed name belongs to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    /// Name equals the base pattern or continues with the "Last Updated" suffix.
    Anchored,
    /// Name contains the base pattern anywhere.
    Contains,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub sprout_api_token: String,
    pub sprout_customer_id: String,
    pub sprout_base_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_refresh_token: String,
    pub google_drive_folder_id: String,
    pub title_prefix: String,
    pub title_match: TitleMatch,
    pub title_utc_offset: FixedOffset,
    pub lookback_days: u32,
    pub max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub token_refresh_threshold_secs: u64,
    pub group_success_delay_secs: u64,
    pub group_failure_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub schedule_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sprout_api_token", &"[redacted]")
            .field("sprout_customer_id", &self.sprout_customer_id)
            .field("sprout_base_url", &self.sprout_base_url)
            .field("google_client_id", &self.google_client_id)
            .field("google_client_secret", &"[redacted]")
            .field("google_refresh_token", &"[redacted]")
            .field("google_drive_folder_id", &self.google_drive_folder_id)
            .field("title_prefix", &self.title_prefix)
            .field("title_match", &self.title_match)
            .field("title_utc_offset", &self.title_utc_offset)
            .field("lookback_days", &self.lookback_days)
            .field("max_retries", &self.max_retries)
            .field("retry_initial_delay_ms", &self.retry_initial_delay_ms)
            .field("retry_max_delay_ms", &self.retry_max_delay_ms)
            .field(
                "token_refresh_threshold_secs",
                &self.token_refresh_threshold_secs,
            )
            .field("group_success_delay_secs", &self.group_success_delay_secs)
            .field("group_failure_delay_secs", &self.group_failure_delay_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("schedule_cron", &self.schedule_cron)
            .finish()
    }
}
