pub mod history;
pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::aggregator::{FailurePolicy, DEFAULT_MAX_CONCURRENT_FETCHES};

pub use history::{PathHistory, Theme};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL of the tree/file service. Endpoints are `{server_url}/tree` and
    /// `{server_url}/file`.
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub failure_policy: FailurePolicy,
    pub theme: Theme,
    pub path_history: PathHistory,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        settings::load_config(None)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: 30,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            failure_policy: FailurePolicy::default(),
            theme: Theme::default(),
            path_history: PathHistory::default(),
        }
    }
}
