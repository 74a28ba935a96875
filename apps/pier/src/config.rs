use std::env;
#[cfg(test)]
use std::sync::Mutex;

/// Pier application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// The serving location the websocket endpoint is derived from
    /// (defaults to local loopback).
    pub server: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server = env::var("PIER_SERVER").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        // Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
        let server = if server.starts_with("localhost:") {
            server.replacen("localhost", "127.0.0.1", 1)
        } else {
            server
        };
        Self { server }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "127.0.0.1:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    // Mutex to ensure environment variable tests don't run in parallel
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn default_config_points_at_loopback() {
        let config = Config::default();
        assert_eq!(config.server, "127.0.0.1:8080");
    }

    #[test]
    fn from_env_falls_back_to_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::remove_var("PIER_SERVER");
        let config = Config::from_env();
        assert_eq!(config.server, "127.0.0.1:8080");
    }

    #[test]
    fn from_env_reads_and_normalizes_server() {
        let _lock = ENV_MUTEX.lock().unwrap();
        env::set_var("PIER_SERVER", "localhost:9000");
        let config = Config::from_env();
        assert_eq!(config.server, "127.0.0.1:9000");
        env::remove_var("PIER_SERVER");
    }
}
