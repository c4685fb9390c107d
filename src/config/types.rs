use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::Target;
use crate::collector::CollectorConfig;
use crate::http_session::{DEFAULT_USER_AGENT, HttpSettings};
use crate::wait::WaitPolicy;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// Per-target budgets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorSettings {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            max_rounds: default_max_rounds(),
            wait_timeout_secs: default_wait_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl CollectorSettings {
    pub fn to_collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            max_items: self.max_items,
            max_rounds: self.max_rounds,
            wait: WaitPolicy {
                timeout: Duration::from_secs(self.wait_timeout_secs),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
        }
    }
}

fn default_max_items() -> usize {
    1000
}

fn default_max_rounds() -> usize {
    100
}

fn default_wait_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// Raw Cookie header. Prefer `REVIEW_SCRAPE__SESSION__COOKIE` over the file.
    #[serde(default, skip_serializing)]
    pub cookie: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            cookie: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SessionSettings {
    pub fn to_http_settings(&self) -> HttpSettings {
        HttpSettings {
            user_agent: self.user_agent.clone(),
            accept_language: self.accept_language.clone(),
            cookie: self.cookie.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub append: bool,
    /// Prefix new files with a UTF-8 BOM so spreadsheet tools detect the encoding.
    #[serde(default = "default_true")]
    pub bom: bool,
    #[serde(default = "default_true")]
    pub include_site: bool,
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            append: true,
            bom: true,
            include_site: true,
            debug_dir: None,
            summary_path: None,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("reviews.csv")
}

fn default_true() -> bool {
    true
}
