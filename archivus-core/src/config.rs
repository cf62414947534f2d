//! # Configuration
//!
//! A minimal, framework-agnostic configuration system based on a flat
//! string key/value store — no TOML/YAML/JSON config-format crate, so every
//! deployment stays free to choose how it loads values in.
//!
//! ## Setting and reading values
//! ```rust
//! use archivus_core::Config;
//! let mut config = Config::new();
//!
//! config.set("max_file_size", "104857600");
//! config.set("ai.rate_limit_rpm", "60");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_u64("max_file_size"), Some(104_857_600));
//! ```
//!
//! ## Environment overrides
//! Values are ordinarily loaded from environment variables using an
//! `ARCHIVUS__SECTION__KEY` → `section.key` convention:
//!
//! ```rust
//! use archivus_core::Config;
//! pub fn load_env_config(config: &mut Config, prefix: &str) {
//!     for (key, value) in std::env::vars() {
//!         if let Some(stripped) = key.strip_prefix(prefix) {
//!             let normalized = stripped.to_lowercase().replace("__", ".");
//!             config.set(normalized, value);
//!         }
//!     }
//! }
//! ```
//!
//! ```bash
//! export ARCHIVUS__AI__RATE_LIMIT_RPM=120
//! ```

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Load from the process environment using the `ARCHIVUS__SECTION__KEY`
    /// convention.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.load_env("ARCHIVUS__");
        config
    }

    /// Merge environment variables matching `prefix` into this config.
    pub fn load_env(&mut self, prefix: &str) {
        for (key, value) in std::env::vars() {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Freeze into an immutable, cheaply-cloneable snapshot.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse::<f64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    pub fn get_duration_ms(&self, key: &str) -> Option<Duration> {
        self.get_u64(key).map(Duration::from_millis)
    }

    // ---- Typed accessors with the §6.4 documented defaults ----

    pub fn max_file_size(&self) -> u64 {
        self.get_u64("max_file_size").unwrap_or(100 * 1024 * 1024)
    }

    pub fn allowed_content_types(&self) -> Vec<String> {
        self.get_string("allowed_content_types")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn enable_ai_processing(&self) -> bool {
        self.get_bool("enable_ai_processing").unwrap_or(true)
    }

    pub fn enable_duplicate_check(&self) -> bool {
        self.get_bool("enable_duplicate_check").unwrap_or(true)
    }

    pub fn auto_generate_thumbnails(&self) -> bool {
        self.get_bool("auto_generate_thumbnails").unwrap_or(true)
    }

    pub fn max_concurrent_jobs(&self) -> usize {
        self.get_usize("max_concurrent_jobs").unwrap_or(4)
    }

    pub fn poll_interval(&self) -> Duration {
        self.get_duration_ms("poll_interval_ms")
            .unwrap_or(Duration::from_millis(500))
    }

    pub fn ai_rate_limit_rpm(&self) -> u64 {
        self.get_u64("ai.rate_limit_rpm").unwrap_or(60)
    }

    pub fn ai_timeout(&self) -> Duration {
        self.get_u64("ai.timeout_seconds")
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30))
    }

    pub fn ai_retry_attempts(&self) -> u32 {
        self.get_usize("ai.retry_attempts").unwrap_or(3) as u32
    }

    pub fn ai_model(&self) -> String {
        self.get_string("ai.model").unwrap_or_else(|| "default".to_string())
    }

    pub fn ai_max_tokens(&self) -> u32 {
        self.get_usize("ai.max_tokens").unwrap_or(4096) as u32
    }

    pub fn ai_temperature(&self) -> f64 {
        self.get_f64("ai.temperature").unwrap_or(0.2)
    }

    pub fn quota_default_storage_bytes(&self) -> u64 {
        self.get_u64("quota.default_storage_bytes")
            .unwrap_or(10 * 1024 * 1024 * 1024)
    }

    pub fn quota_default_api_count(&self) -> u64 {
        self.get_u64("quota.default_api_count").unwrap_or(10_000)
    }

    /// Per-tier storage quota, keyed `quota.<tier>.storage_bytes`; falls back
    /// to the §4.2 tier table when unset.
    pub fn quota_tier_storage_bytes(&self, tier: &str) -> u64 {
        let default = match tier {
            "starter" => 5 * 1024 * 1024 * 1024,
            "professional" => 50 * 1024 * 1024 * 1024,
            "enterprise" => 500 * 1024 * 1024 * 1024,
            _ => self.quota_default_storage_bytes(),
        };
        self.get_u64(&format!("quota.{tier}.storage_bytes")).unwrap_or(default)
    }

    /// Per-tier API quota, keyed `quota.<tier>.api_count`; falls back to the
    /// §4.2 tier table when unset.
    pub fn quota_tier_api_count(&self, tier: &str) -> u64 {
        let default = match tier {
            "starter" => 1_000,
            "professional" => 10_000,
            "enterprise" => 100_000,
            _ => self.quota_default_api_count(),
        };
        self.get_u64(&format!("quota.{tier}.api_count")).unwrap_or(default)
    }

    pub fn password_min_length(&self) -> usize {
        self.get_usize("password.min_length").unwrap_or(12)
    }

    pub fn mfa_enabled(&self) -> bool {
        self.get_bool("mfa.enabled").unwrap_or(false)
    }

    pub fn session_ttl(&self) -> Duration {
        self.get_duration_ms("session_ttl").unwrap_or(Duration::from_secs(3600))
    }

    pub fn rate_limit_window(&self) -> Duration {
        self.get_duration_ms("rate_limit_window").unwrap_or(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_keys_fall_back_to_documented_defaults() {
        let snapshot = Config::new().snapshot();
        assert_eq!(snapshot.max_concurrent_jobs(), 4);
        assert_eq!(snapshot.ai_rate_limit_rpm(), 60);
        assert!(snapshot.enable_ai_processing());
    }

    #[test]
    fn set_values_round_trip_through_snapshot() {
        let mut config = Config::new();
        config.set("max_concurrent_jobs", "32");
        config.set("ai.model", "gpt-doc-extract");
        let snapshot = config.snapshot();
        assert_eq!(snapshot.max_concurrent_jobs(), 32);
        assert_eq!(snapshot.ai_model(), "gpt-doc-extract");
    }

    #[test]
    fn env_prefix_is_normalized_to_dotted_keys() {
        std::env::set_var("ARCHIVUS_TEST__AI__RATE_LIMIT_RPM", "120");
        let mut config = Config::new();
        config.load_env("ARCHIVUS_TEST__");
        assert_eq!(config.get("ai.rate_limit_rpm"), Some("120"));
        std::env::remove_var("ARCHIVUS_TEST__AI__RATE_LIMIT_RPM");
    }
}
