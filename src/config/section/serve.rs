//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5277                 # HTTP port number (retries the next 9 if taken)
//! workers = 32                # Request threads; each long-poll holds one
//! poll_timeout = 10000        # Default long-poll wait (ms)
//! max_poll_timeout = 60000    # Upper bound for `?timeout=` (ms)
//! poll_delay = 300            # Browser pause between polls (ms)
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::PollTimeouts;

/// Preview server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    pub port: u16,

    /// Size of the request thread pool.
    pub workers: usize,

    pub poll_timeout: u64,

    pub max_poll_timeout: u64,

    pub poll_delay: u64,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
            workers: 32,
            poll_timeout: 10_000,
            max_poll_timeout: 60_000,
            poll_delay: 300,
        }
    }
}

impl ServeConfig {
    pub fn timeouts(&self) -> PollTimeouts {
        PollTimeouts {
            default: Duration::from_millis(self.poll_timeout),
            max: Duration::from_millis(self.max_poll_timeout),
        }
    }

    pub(in crate::config) fn validate(&self, errors: &mut Vec<String>) {
        if self.port == 0 {
            errors.push("[serve.port] must not be 0".into());
        }
        if self.workers == 0 {
            errors.push("[serve.workers] must be at least 1".into());
        }
        if self.poll_timeout == 0 {
            errors.push("[serve.poll_timeout] must be greater than 0".into());
        }
        if self.poll_timeout > self.max_poll_timeout {
            errors.push(format!(
                "[serve.poll_timeout] ({}) exceeds [serve.max_poll_timeout] ({})",
                self.poll_timeout, self.max_poll_timeout
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::time::Duration;

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nworkers = 4\npoll_timeout = 500",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.workers, 4);
        assert_eq!(config.serve.timeouts().default, Duration::from_millis(500));
        assert_eq!(config.serve.timeouts().max, Duration::from_secs(60));
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 5277);
        assert_eq!(config.serve.workers, 32);
        assert_eq!(config.serve.poll_timeout, 10_000);
        assert_eq!(config.serve.poll_delay, 300);
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_serve_config_validation() {
        let mut errors = Vec::new();
        test_parse_config("").serve.validate(&mut errors);
        assert!(errors.is_empty());

        let config = test_parse_config(
            "[serve]\nport = 0\nworkers = 0\npoll_timeout = 70000",
        );
        config.serve.validate(&mut errors);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("serve.port"));
        assert!(errors[2].contains("max_poll_timeout"));
    }
}
