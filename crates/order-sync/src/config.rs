use std::path::PathBuf;
use std::time::Duration;

/// Order system configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ORDER_SYNC_CACHE_DIR | unset (in-memory) | directory for the persisted local cache |
/// | ORDER_SYNC_REMOTE_TIMEOUT_MS | 5000 | bound on every remote store call |
/// | ORDER_SYNC_STORE_BUFFER | 32 | store actor channel capacity |
/// | ORDER_SYNC_LOCAL_ONLY | false | run without a remote store |
///
/// ```ignore
/// ORDER_SYNC_CACHE_DIR=/tmp/orders ORDER_SYNC_LOCAL_ONLY=true cargo run
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` keeps the cache in memory for the life of the process.
    pub cache_dir: Option<PathBuf>,
    pub remote_timeout: Duration,
    pub store_buffer: usize,
    pub local_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            remote_timeout: Duration::from_millis(5000),
            store_buffer: 32,
            local_only: false,
        }
    }
}

impl Config {
    /// Loads configuration from the environment. Unset or unparsable values use the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: var("ORDER_SYNC_CACHE_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            remote_timeout: var("ORDER_SYNC_REMOTE_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.remote_timeout),
            store_buffer: var("ORDER_SYNC_STORE_BUFFER")
                .and_then(|n| n.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.store_buffer),
            local_only: var("ORDER_SYNC_LOCAL_ONLY")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.local_only),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(lookup(&[]), Config::default());
    }

    #[test]
    fn test_overrides() {
        let config = lookup(&[
            ("ORDER_SYNC_CACHE_DIR", "/tmp/orders"),
            ("ORDER_SYNC_REMOTE_TIMEOUT_MS", "250"),
            ("ORDER_SYNC_STORE_BUFFER", "8"),
            ("ORDER_SYNC_LOCAL_ONLY", "TRUE"),
        ]);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/orders")));
        assert_eq!(config.remote_timeout, Duration::from_millis(250));
        assert_eq!(config.store_buffer, 8);
        assert!(config.local_only);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let config = lookup(&[
            ("ORDER_SYNC_REMOTE_TIMEOUT_MS", "soon"),
            ("ORDER_SYNC_STORE_BUFFER", "0"),
            ("ORDER_SYNC_LOCAL_ONLY", "nah"),
        ]);
        assert_eq!(config, Config::default());
    }
}
