//! Outbound notification calls to the external backend.
//!
//! Dispatch is best-effort: failures are reported to the caller as
//! [`PlanwatchError::NotificationDispatch`] so they can be logged and the
//! scheduler pass continues. Missing backend configuration is treated the
//! same way — skipped, never fatal to the process.

use crate::config::NotifierConfig;
use crate::error::{PlanwatchError, Result};
use crate::plan::evaluator::WarningKind;
use crate::settings::SettingsSnapshot;
use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Header carrying the service-to-service shared secret.
pub const SERVICE_SECRET_HEADER: &str = "x-service-secret";

/// Outbound notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a payment warning ahead of a trial or billing deadline.
    async fn send_warning(
        &self,
        settings: &SettingsSnapshot,
        website_id: &str,
        kind: WarningKind,
        days_until: i64,
        reference_date: NaiveDate,
    ) -> Result<()>;

    /// Signal the external backend to downgrade a website whose trial ended.
    async fn send_trial_ended(&self, settings: &SettingsSnapshot, website_id: &str) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentWarningPayload {
    r#type: &'static str,
    days_until_event: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_billing_date: Option<NaiveDate>,
}

/// HTTP notifier hitting the external backend with a bounded per-call
/// timeout.
pub struct HttpNotifier {
    client: reqwest::Client,
    secret: Option<SecretString>,
}

impl HttpNotifier {
    #[must_use]
    pub fn new(config: &NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("planwatch")
            .build()
            .unwrap_or_default();
        Self {
            client,
            secret: config.service_secret.clone(),
        }
    }

    /// Resolve the backend URL and secret, or fail the call.
    fn target<'a>(&'a self, settings: &'a SettingsSnapshot) -> Result<(&'a str, &'a SecretString)> {
        let url = settings
            .backend_url
            .as_deref()
            .ok_or_else(|| PlanwatchError::dispatch("backend URL not configured"))?;
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| PlanwatchError::dispatch("service secret not configured"))?;
        Ok((url.trim_end_matches('/'), secret))
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_warning(
        &self,
        settings: &SettingsSnapshot,
        website_id: &str,
        kind: WarningKind,
        days_until: i64,
        reference_date: NaiveDate,
    ) -> Result<()> {
        let (base, secret) = self.target(settings)?;
        let url = format!("{}/websites/{}/payment-warning", base, website_id);

        let payload = PaymentWarningPayload {
            r#type: kind.as_str(),
            days_until_event: days_until,
            // Billing warnings carry the deadline; the trial end date is the
            // backend's own bookkeeping.
            next_billing_date: match kind {
                WarningKind::Billing => Some(reference_date),
                WarningKind::Trial => None,
            },
        };

        let response = self
            .client
            .post(&url)
            .header(SERVICE_SECRET_HEADER, secret.expose_secret())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlanwatchError::dispatch(format!(
                "payment warning for {} returned status {}",
                website_id,
                response.status()
            )));
        }

        tracing::info!(
            target: "planwatch::notifier",
            website_id = %website_id,
            kind = kind.as_str(),
            days_until = days_until,
            "Payment warning dispatched"
        );
        Ok(())
    }

    async fn send_trial_ended(&self, settings: &SettingsSnapshot, website_id: &str) -> Result<()> {
        let (base, secret) = self.target(settings)?;
        let url = format!("{}/websites/{}/free-trial-ended", base, website_id);

        let response = self
            .client
            .put(&url)
            .header(SERVICE_SECRET_HEADER, secret.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PlanwatchError::dispatch(format!(
                "trial-ended action for {} returned status {}",
                website_id,
                response.status()
            )));
        }

        tracing::info!(
            target: "planwatch::notifier",
            website_id = %website_id,
            "Trial-ended downgrade dispatched"
        );
        Ok(())
    }
}

/// Mock notifier for testing.
#[cfg(test)]
pub mod test {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedCall {
        Warning {
            website_id: String,
            kind: WarningKind,
            days_until: i64,
            reference_date: NaiveDate,
        },
        TrialEnded {
            website_id: String,
        },
    }

    /// Records every dispatch attempt; can be told to fail them all.
    #[derive(Default)]
    pub struct RecordingNotifier {
        calls: Mutex<Vec<RecordedCall>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn outcome(&self) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(PlanwatchError::dispatch("injected failure"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_warning(
            &self,
            _settings: &SettingsSnapshot,
            website_id: &str,
            kind: WarningKind,
            days_until: i64,
            reference_date: NaiveDate,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(RecordedCall::Warning {
                website_id: website_id.to_string(),
                kind,
                days_until,
                reference_date,
            });
            self.outcome()
        }

        async fn send_trial_ended(
            &self,
            _settings: &SettingsSnapshot,
            website_id: &str,
        ) -> Result<()> {
            self.calls.lock().unwrap().push(RecordedCall::TrialEnded {
                website_id: website_id.to_string(),
            });
            self.outcome()
        }
    }
}
