//! Configuration module
//!
//! Settings shared by every workflow: AWS region, where ledgers are written, paging and
//! notification wait behaviour, the content provider endpoint and tokens, and the object
//! store backend. Values come from the environment (a `.env` file is honoured); CLI flags
//! override individual fields after loading.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Platform;
use crate::storage_types::StorageBackend;

// Common constants
const PER_PAGE: u32 = 25;
const RECEIVE_WAIT_SECS: i32 = 20;
const MAX_RECEIVE_WAIT_SECS: i32 = 20;
const VIMEO_API_URL: &str = "https://api.vimeo.com";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct VaultyConfig {
    pub aws_region: Option<String>,
    /// Directory ledgers and catalogs are written to.
    pub base_path: PathBuf,
    pub per_page: u32,
    /// Maximum time to wait for a job notification. `None` waits indefinitely.
    pub listen_timeout: Option<Duration>,
    /// Long-poll duration of a single queue receive.
    pub receive_wait_secs: i32,
    /// Delete topic, queue and subscription once a coordinated job ends.
    pub cleanup_notifications: bool,
    pub vimeo_api_url: String,
    pub vimeo_tokens: HashMap<Platform, String>,
    pub storage_backend: StorageBackend,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    /// `text` or `json`
    pub log_format: String,
}

impl VaultyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_path = resolve_base_path(lookup("VAULTY_BASE_PATH").as_deref());

        let per_page = match lookup("VAULTY_PER_PAGE") {
            Some(v) => v
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("VAULTY_PER_PAGE must be a number: {}", e))?,
            None => PER_PAGE,
        };

        let listen_timeout = match lookup("VAULTY_LISTEN_TIMEOUT_SECS") {
            Some(v) if !v.trim().is_empty() => {
                let secs = v.parse::<u64>().map_err(|e| {
                    anyhow::anyhow!("VAULTY_LISTEN_TIMEOUT_SECS must be a number: {}", e)
                })?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let receive_wait_secs = lookup("VAULTY_RECEIVE_WAIT_SECS")
            .and_then(|v| v.parse::<i32>().ok())
            .unwrap_or(RECEIVE_WAIT_SECS);

        let cleanup_notifications = lookup("VAULTY_CLEANUP_NOTIFICATIONS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let vimeo_tokens = Platform::ALL
            .iter()
            .filter_map(|p| lookup(&p.token_env_var()).map(|token| (*p, token)))
            .collect();

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(v) => v.parse::<StorageBackend>()?,
            None => StorageBackend::S3,
        };

        let config = VaultyConfig {
            aws_region: lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")),
            base_path,
            per_page,
            listen_timeout,
            receive_wait_secs,
            cleanup_notifications,
            vimeo_api_url: lookup("VIMEO_API_URL").unwrap_or_else(|| VIMEO_API_URL.to_string()),
            vimeo_tokens,
            storage_backend,
            s3_endpoint: lookup("S3_ENDPOINT"),
            local_storage_path: lookup("LOCAL_STORAGE_PATH"),
            log_format: lookup("VAULTY_LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.per_page == 0 {
            return Err(anyhow::anyhow!("VAULTY_PER_PAGE must be greater than zero"));
        }

        if !(0..=MAX_RECEIVE_WAIT_SECS).contains(&self.receive_wait_secs) {
            return Err(anyhow::anyhow!(
                "VAULTY_RECEIVE_WAIT_SECS must be between 0 and {}",
                MAX_RECEIVE_WAIT_SECS
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH to be set"
            ));
        }

        Ok(())
    }

    pub fn vimeo_token(&self, platform: Platform) -> Option<&str> {
        self.vimeo_tokens.get(&platform).map(String::as_str)
    }

    /// Override the base path; non-existent paths fall back to the current directory.
    pub fn with_base_path(mut self, base_path: Option<&str>) -> Self {
        if base_path.is_some() {
            self.base_path = resolve_base_path(base_path);
        }
        self
    }
}

/// Absolute base directory for run files.
///
/// A path that is empty or does not exist falls back to the current directory.
pub fn resolve_base_path(base_path: Option<&str>) -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match base_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if Path::new(p).exists() => {
            let path = PathBuf::from(p);
            if path.is_absolute() {
                path
            } else {
                cwd.join(path)
            }
        }
        _ => cwd,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = VaultyConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.per_page, 25);
        assert_eq!(config.listen_timeout, None);
        assert_eq!(config.receive_wait_secs, 20);
        assert!(!config.cleanup_notifications);
        assert_eq!(config.storage_backend, StorageBackend::S3);
        assert_eq!(config.vimeo_api_url, "https://api.vimeo.com");
    }

    #[test]
    fn reads_overrides_and_tokens() {
        let config = VaultyConfig::from_lookup(lookup_from(&[
            ("VAULTY_PER_PAGE", "50"),
            ("VAULTY_LISTEN_TIMEOUT_SECS", "3600"),
            ("VAULTY_CLEANUP_NOTIFICATIONS", "true"),
            ("VIMEO_ACCESS_TOKEN_OPENSAP", "tok"),
            ("AWS_REGION", "eu-central-1"),
        ]))
        .unwrap();
        assert_eq!(config.per_page, 50);
        assert_eq!(config.listen_timeout, Some(Duration::from_secs(3600)));
        assert!(config.cleanup_notifications);
        assert_eq!(config.vimeo_token(Platform::OpenSap), Some("tok"));
        assert_eq!(config.vimeo_token(Platform::OpenHpi), None);
        assert_eq!(config.aws_region.as_deref(), Some("eu-central-1"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(VaultyConfig::from_lookup(lookup_from(&[("VAULTY_PER_PAGE", "0")])).is_err());
        assert!(
            VaultyConfig::from_lookup(lookup_from(&[("VAULTY_RECEIVE_WAIT_SECS", "60")])).is_err()
        );
        assert!(
            VaultyConfig::from_lookup(lookup_from(&[("STORAGE_BACKEND", "local")])).is_err()
        );
    }

    #[test]
    fn missing_base_path_falls_back_to_cwd() {
        let cwd = env::current_dir().unwrap();
        assert_eq!(resolve_base_path(None), cwd);
        assert_eq!(resolve_base_path(Some("")), cwd);
        assert_eq!(resolve_base_path(Some("/definitely/not/here/vaulty")), cwd);
    }

    #[test]
    fn existing_base_path_is_kept() {
        let dir = std::env::temp_dir();
        assert_eq!(resolve_base_path(dir.to_str()), dir);
    }
}
