use crate::egress::EgressScheme;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Shelfwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

impl Config {
    /// Looks up a site by its exact name
    pub fn site(&self, name: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// Sites that the supervisor should launch
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|s| s.enabled)
    }
}

/// HTTP client behavior shared by every site
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// User agents rotated across requests; a built-in list is used when empty
    #[serde(rename = "user-agents", default)]
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agents: Vec::new(),
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

/// Egress pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// Address (host:port) of the preferred egress point
    #[serde(rename = "preferred-address", default = "default_preferred_address")]
    pub preferred_address: String,

    /// Scheme spoken by the preferred egress point
    #[serde(rename = "preferred-scheme", default = "default_preferred_scheme")]
    pub preferred_scheme: EgressScheme,

    /// Page listing public egress points
    #[serde(rename = "listing-url", default = "default_listing_url")]
    pub listing_url: String,

    /// Cap on pool length, preferred candidate included
    #[serde(rename = "max-candidates", default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Pools shorter than this trigger a listing re-fetch
    #[serde(rename = "min-viable", default = "default_min_viable")]
    pub min_viable: usize,

    /// Listing fetches per acquisition before a short pool is accepted
    #[serde(rename = "listing-attempts", default = "default_listing_attempts")]
    pub listing_attempts: u32,

    /// Delay between listing re-fetches (milliseconds)
    #[serde(rename = "listing-retry-delay", default = "default_listing_retry_delay")]
    pub listing_retry_delay: u64,

    /// Pool refreshes allowed per session before it aborts
    #[serde(rename = "max-global-refreshes", default = "default_max_global_refreshes")]
    pub max_global_refreshes: u32,

    /// Items fetched directly when the listing service is unreachable
    #[serde(rename = "degraded-batch", default = "default_degraded_batch")]
    pub degraded_batch: usize,

    /// Delay between direct fetches in degraded mode (milliseconds)
    #[serde(rename = "degraded-delay", default = "default_degraded_delay")]
    pub degraded_delay: u64,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            preferred_address: default_preferred_address(),
            preferred_scheme: default_preferred_scheme(),
            listing_url: default_listing_url(),
            max_candidates: default_max_candidates(),
            min_viable: default_min_viable(),
            listing_attempts: default_listing_attempts(),
            listing_retry_delay: default_listing_retry_delay(),
            max_global_refreshes: default_max_global_refreshes(),
            degraded_batch: default_degraded_batch(),
            degraded_delay: default_degraded_delay(),
        }
    }
}

impl EgressConfig {
    pub fn listing_retry_delay(&self) -> Duration {
        Duration::from_millis(self.listing_retry_delay)
    }

    pub fn degraded_delay(&self) -> Duration {
        Duration::from_millis(self.degraded_delay)
    }
}

/// Shared dataset configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Path to the SQLite dataset file
    pub path: String,

    /// Save attempts before a reconcile gives up
    #[serde(rename = "save-attempts", default = "default_save_attempts")]
    pub save_attempts: u32,

    /// Base of the randomized delay between save attempts (milliseconds)
    #[serde(rename = "save-base-delay", default = "default_save_base_delay")]
    pub save_base_delay: u64,
}

impl DatasetConfig {
    pub fn save_base_delay(&self) -> Duration {
        Duration::from_millis(self.save_base_delay)
    }
}

/// Worker process supervision
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    /// Maximum number of site workers running at once
    #[serde(rename = "max-concurrent-sites", default = "default_max_concurrent_sites")]
    pub max_concurrent_sites: usize,

    /// Pause between consecutive worker launches (milliseconds)
    #[serde(rename = "launch-stagger", default = "default_launch_stagger")]
    pub launch_stagger: u64,

    /// Directory holding per-site run summaries
    #[serde(rename = "stats-dir", default = "default_stats_dir")]
    pub stats_dir: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sites: default_max_concurrent_sites(),
            launch_stagger: default_launch_stagger(),
            stats_dir: default_stats_dir(),
        }
    }
}

/// A retail site checked by one worker session
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site name as stored in the dataset's site column
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Route requests through the egress pool; direct fetches otherwise
    #[serde(rename = "use-egress-pool", default = "default_true")]
    pub use_egress_pool: bool,

    /// Sleep a random time in [min-sleep, max-sleep] before each request
    #[serde(rename = "human-delay", default)]
    pub human_delay: bool,

    #[serde(rename = "min-sleep", default = "default_min_sleep")]
    pub min_sleep: u64,

    #[serde(rename = "max-sleep", default = "default_max_sleep")]
    pub max_sleep: u64,

    #[serde(rename = "between-items-delay", default = "default_between_items_delay")]
    pub between_items_delay: u64,

    #[serde(rename = "between-retries-delay", default = "default_between_retries_delay")]
    pub between_retries_delay: u64,

    /// Rate-limit backoffs allowed per item
    #[serde(rename = "rate-limit-retries", default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,

    /// Base of the exponential rate-limit backoff (milliseconds)
    #[serde(rename = "rate-limit-base-delay", default = "default_rate_limit_base_delay")]
    pub rate_limit_base_delay: u64,

    /// CSS selector of the element holding the price
    #[serde(rename = "price-selector")]
    pub price_selector: String,

    /// CSS selector of the element holding availability text; whole body when absent
    #[serde(rename = "stock-selector", default)]
    pub stock_selector: Option<String>,

    /// Case-insensitive phrases that mark a product as unavailable
    #[serde(rename = "out-of-stock-markers", default)]
    pub out_of_stock_markers: Vec<String>,
}

impl SiteConfig {
    pub fn min_sleep(&self) -> Duration {
        Duration::from_millis(self.min_sleep)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep)
    }

    pub fn between_items_delay(&self) -> Duration {
        Duration::from_millis(self.between_items_delay)
    }

    pub fn between_retries_delay(&self) -> Duration {
        Duration::from_millis(self.between_retries_delay)
    }

    pub fn rate_limit_base_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_base_delay)
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_preferred_address() -> String {
    "192.168.101.27:8080".to_string()
}

fn default_preferred_scheme() -> EgressScheme {
    EgressScheme::Http
}

fn default_listing_url() -> String {
    "https://free-proxy-list.net/".to_string()
}

fn default_max_candidates() -> usize {
    100
}

fn default_min_viable() -> usize {
    5
}

fn default_listing_attempts() -> u32 {
    3
}

fn default_listing_retry_delay() -> u64 {
    3_000
}

fn default_max_global_refreshes() -> u32 {
    4
}

fn default_degraded_batch() -> usize {
    5
}

fn default_degraded_delay() -> u64 {
    500
}

fn default_save_attempts() -> u32 {
    5
}

fn default_save_base_delay() -> u64 {
    20_000
}

fn default_max_concurrent_sites() -> usize {
    20
}

fn default_launch_stagger() -> u64 {
    1_000
}

fn default_stats_dir() -> String {
    "./stats".to_string()
}

fn default_min_sleep() -> u64 {
    1_000
}

fn default_max_sleep() -> u64 {
    4_000
}

fn default_between_items_delay() -> u64 {
    1_000
}

fn default_between_retries_delay() -> u64 {
    2_000
}

fn default_rate_limit_retries() -> u32 {
    3
}

fn default_rate_limit_base_delay() -> u64 {
    60_000
}
