//! Data-only task options, loadable from YAML or JSON.
//!
//! ```yaml
//! uid: users
//! retry_on_error: 3
//! retry_on_error_delay_ms: 250
//! prevent_new_request_duration_ms: 1000
//! cache:
//!   enable_cache: true
//!   cache_id: users
//!   cache_expiry_ms: 60000
//! ```
//!
//! camelCase spellings (`retryOnError`, `cacheExpiry`, ...) are accepted as aliases.

use crate::cache::CacheConfig;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskOptions {
    pub uid: Option<String>,
    #[serde(alias = "retryOnError")]
    pub retry_on_error: u32,
    #[serde(alias = "retryOnErrorDelay")]
    pub retry_on_error_delay_ms: Option<u64>,
    #[serde(alias = "preventNewRequestDuration")]
    pub prevent_new_request_duration_ms: Option<u64>,
    pub cache: CacheOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOptions {
    #[serde(alias = "enableCache")]
    pub enable_cache: bool,
    #[serde(alias = "cacheId")]
    pub cache_id: Option<String>,
    #[serde(alias = "cacheExpiry")]
    pub cache_expiry_ms: Option<u64>,
}

impl TaskOptions {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let options: Self = serde_yaml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(&self.uid, Some(uid) if uid.trim().is_empty()) {
            return Err(invalid("uid", "must not be empty"));
        }
        if matches!(&self.cache.cache_id, Some(id) if id.trim().is_empty()) {
            return Err(invalid("cache.cache_id", "must not be empty"));
        }
        Ok(())
    }

    pub fn retry_on_error_delay(&self) -> Option<Duration> {
        self.retry_on_error_delay_ms.map(Duration::from_millis)
    }

    pub fn prevent_new_request_duration(&self) -> Option<Duration> {
        self.prevent_new_request_duration_ms.map(Duration::from_millis)
    }

    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new().with_enabled(self.cache.enable_cache);
        if let Some(id) = &self.cache.cache_id {
            config = config.with_cache_id(id.clone());
        }
        if let Some(ms) = self.cache.cache_expiry_ms {
            config = config.with_expiry(Duration::from_millis(ms));
        }
        config
    }
}

fn invalid(field: &str, details: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid task option `{}`", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("task_options"),
    )
}
