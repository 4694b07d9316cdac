//! Server configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparsable numeric values
//! fall back to the defaults of [`AppConfig::default`].

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level server configuration.
///
/// Loaded once at startup via [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to bind the HTTP/WebSocket server to.
    pub listen_addr: SocketAddr,

    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,

    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,

    /// Upper bound for queueing one frame to one connection.
    pub send_timeout: Duration,

    /// Upper bound for one account lookup during authentication.
    pub auth_lookup_timeout: Duration,

    /// Frames buffered per connection before sends start waiting.
    pub outbound_queue_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: None,
            database_max_connections: 10,
            database_connect_timeout_secs: 5,
            send_timeout: Duration::from_millis(2_000),
            auth_lookup_timeout: Duration::from_millis(1_000),
            outbound_queue_capacity: 64,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(addr) => addr.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections: parse_env(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_connect_timeout_secs: parse_env(
                "DATABASE_CONNECT_TIMEOUT_SECS",
                defaults.database_connect_timeout_secs,
            ),
            send_timeout: parse_env_millis("SEND_TIMEOUT_MS", defaults.send_timeout),
            auth_lookup_timeout: parse_env_millis(
                "AUTH_LOOKUP_TIMEOUT_MS",
                defaults.auth_lookup_timeout,
            ),
            outbound_queue_capacity: parse_env(
                "OUTBOUND_QUEUE_CAPACITY",
                defaults.outbound_queue_capacity,
            )
            .max(1),
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable holding milliseconds. Zero is rejected.
fn parse_env_millis(key: &str, default: Duration) -> Duration {
    match parse_env::<u64>(key, 0) {
        0 => default,
        ms => Duration::from_millis(ms),
    }
}
