//! Service configuration.

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/kazi-entitlements").
    pub data_dir: String,

    /// Frontend URL used for dashboard/catalog redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Artificial settlement delay in milliseconds.
    ///
    /// Stands in for the round-trip of a real gateway; tests set it to 0.
    pub settle_delay_ms: u64,

    /// Interval of the idle trial-expiry sweep, in seconds.
    pub sweep_interval_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parsed("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parsed(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            settle_delay_ms: env_parsed("SETTLE_DELAY_MS", defaults.settle_delay_ms),
            sweep_interval_seconds: env_parsed(
                "SWEEP_INTERVAL_SECONDS",
                defaults.sweep_interval_seconds,
            ),
        }
    }

    /// The dashboard URL users are redirected to after activation.
    #[must_use]
    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.frontend_url)
    }

    /// The plan catalog URL used by denial upsells.
    #[must_use]
    pub fn plans_url(&self) -> String {
        format!("{}/premium", self.frontend_url)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/kazi-entitlements".into(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            settle_delay_ms: 1500,
            sweep_interval_seconds: 60,
        }
    }
}
