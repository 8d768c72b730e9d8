use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Largest page the Gmail listing endpoint will return.
pub const MAX_PAGE_SIZE: u32 = 500;

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Tuning for a single pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `maxResults` sent with every listing call.
    pub page_size: u32,
    /// Upper bound on concurrently running detail fetches.
    pub concurrency: usize,
    /// Longest the dispatcher stays suspended on an empty queue before
    /// re-checking its state.
    pub idle_backoff: Duration,
    pub cache_path: PathBuf,
    pub top_n: usize,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            page_size: env_u32("SENDER_STATS_PAGE_SIZE", MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            concurrency: env_usize("SENDER_STATS_CONCURRENCY", num_cpus::get() * 4).max(1),
            idle_backoff: env_duration_millis("SENDER_STATS_IDLE_BACKOFF_MS", 100),
            cache_path: PathBuf::from(env_string(
                "SENDER_STATS_CACHE_PATH",
                "./cache/messages.bin",
            )),
            top_n: env_usize("SENDER_STATS_TOP_N", 30),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Connection settings for the Gmail REST API.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub base_url: String,
    pub user_id: String,
    pub request_timeout: Duration,
}

impl GmailConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("GMAIL_API_URL", "https://gmail.googleapis.com"),
            user_id: env_string("GMAIL_USER_ID", "me"),
            request_timeout: env_duration_millis("GMAIL_TIMEOUT_MS", 30_000),
        }
    }
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
