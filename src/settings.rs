//! Shared-configuration snapshot.
//!
//! Trial duration and the external backend URL live in a shared config
//! service. Rather than a mutable global, the current values are held as an
//! immutable [`SettingsSnapshot`] behind a [`SettingsCache`], refreshed at
//! startup and on each scheduler pass; a failed fetch keeps the last-known
//! snapshot.

use crate::error::{PlanwatchError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Immutable view of the shared configuration at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub trial_duration_days: u32,
    /// Base URL of the external backend receiving notifications. None until
    /// the shared config service has supplied one.
    pub backend_url: Option<String>,
}

/// Payload shape served by the shared config service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    pub trial_duration_days: Option<u32>,
    pub backend_url: Option<String>,
}

/// Client for the shared config service.
#[async_trait]
pub trait SharedConfigClient: Send + Sync {
    async fn fetch(&self) -> Result<RemoteSettings>;
}

/// HTTP client for the shared config service.
pub struct HttpSharedConfigClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSharedConfigClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("planwatch")
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl SharedConfigClient for HttpSharedConfigClient {
    async fn fetch(&self) -> Result<RemoteSettings> {
        let url = format!("{}/settings", self.base_url.trim_end_matches('/'));

        let response = self.client.get(&url).send().await.map_err(|e| {
            PlanwatchError::config_unavailable(format!("settings fetch failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(PlanwatchError::config_unavailable(format!(
                "settings fetch returned status {}",
                response.status()
            )));
        }

        response.json::<RemoteSettings>().await.map_err(|e| {
            PlanwatchError::config_unavailable(format!("settings payload invalid: {}", e))
        })
    }
}

/// Holds the last-known settings snapshot.
pub struct SettingsCache {
    client: Option<Arc<dyn SharedConfigClient>>,
    snapshot: RwLock<SettingsSnapshot>,
}

impl SettingsCache {
    /// Create a cache seeded with the configured default trial duration and
    /// no backend URL. `client` is None when no shared config service is
    /// configured, in which case the seed values are permanent.
    #[must_use]
    pub fn new(client: Option<Arc<dyn SharedConfigClient>>, default_trial_days: u32) -> Self {
        Self {
            client,
            snapshot: RwLock::new(SettingsSnapshot {
                trial_duration_days: default_trial_days,
                backend_url: None,
            }),
        }
    }

    /// Current snapshot without a fetch.
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.snapshot.read().unwrap().clone()
    }

    /// Fetch fresh settings and swap the snapshot.
    ///
    /// On fetch failure the last-known snapshot is kept and a warning
    /// logged; this never fails the caller's pass. Fields absent from the
    /// remote payload (or a zero trial duration) also keep their last-known
    /// values.
    pub async fn refresh(&self) -> SettingsSnapshot {
        let Some(client) = &self.client else {
            return self.snapshot();
        };

        match client.fetch().await {
            Ok(remote) => {
                let mut snapshot = self.snapshot.write().unwrap();
                if let Some(days) = remote.trial_duration_days {
                    if days > 0 {
                        snapshot.trial_duration_days = days;
                    }
                }
                if remote.backend_url.is_some() {
                    snapshot.backend_url = remote.backend_url;
                }
                snapshot.clone()
            }
            Err(e) => {
                tracing::warn!(
                    target: "planwatch::settings",
                    error = %e,
                    "Shared config fetch failed, keeping last-known settings"
                );
                self.snapshot()
            }
        }
    }
}
