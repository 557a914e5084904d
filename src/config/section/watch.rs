//! `[watch]` section configuration.
//!
//! Watch daemon settings: debounce window, service reply timeout, and the
//! HTTP front-end address for external build requests.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 3721                 # HTTP port number
//! debounce_ms = 200           # Quiescence window after the last change
//! reply_timeout_ms = 30000    # Max wait for a compiler service reply
//! ```
//!
//! Use `interface = "0.0.0.0"` to accept build requests from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Watch daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number for external build requests.
    pub port: u16,

    /// Quiescence window in milliseconds: a build starts only after the
    /// project has been edit-free for this long.
    pub debounce_ms: u64,

    /// How long to wait for a compiler service reply before treating the
    /// service as crashed, in milliseconds.
    pub reply_timeout_ms: u64,
}

impl WatchSection {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3721,
            debounce_ms: 200,
            reply_timeout_ms: 30_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_watch_config() {
        let config = test_parse_config(
            "[watch]\ninterface = \"0.0.0.0\"\nport = 8080\ndebounce_ms = 50",
        );

        assert_eq!(
            config.watch.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.watch.port, 8080);
        assert_eq!(config.watch.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.watch.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.watch.port, 3721);
        assert_eq!(config.watch.debounce(), Duration::from_millis(200));
        assert_eq!(config.watch.reply_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_watch_config_partial_override() {
        let config = test_parse_config("[watch]\nport = 3000");

        assert_eq!(config.watch.port, 3000);
        // interface and windows keep defaults
        assert_eq!(
            config.watch.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.watch.debounce_ms, 200);
    }
}
