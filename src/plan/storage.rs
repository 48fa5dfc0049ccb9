//! Storage trait for plan state.
//!
//! Implement [`PlanStore`] to persist plan state to your database. The
//! in-memory implementation is used for development and testing.

use crate::error::{PlanwatchError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::state::{NotificationFlag, PlanState};

/// Trait for storing plan state, one row per website.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Create or fully replace a website's tracked dates.
    ///
    /// Resets every notification flag and clears the scheduler-run marker: a
    /// new plan period restarts the notification state machine from scratch.
    /// `created_at` is preserved across updates.
    async fn upsert(
        &self,
        website_id: &str,
        plan_id: &str,
        free_trial_start_date: Option<NaiveDate>,
        next_billing_date: NaiveDate,
    ) -> Result<PlanState>;

    /// Update only the billing date, resetting only the billing flags.
    ///
    /// Fails with `NotFound` if the website is unknown.
    async fn update_billing_date(
        &self,
        website_id: &str,
        next_billing_date: NaiveDate,
    ) -> Result<PlanState>;

    /// All plan state rows, for a scheduler pass. Order is irrelevant.
    async fn get_all(&self) -> Result<Vec<PlanState>>;

    /// Set exactly the named flags to true (never false) and bump
    /// `updated_at`. Also stamps `last_scheduler_run`.
    ///
    /// Fails with `NotFound` if the website is unknown.
    async fn update_flags(&self, website_id: &str, flags: &[NotificationFlag]) -> Result<()>;

    /// Null the trial start date and reset all trial flags.
    ///
    /// Used once a lapsed trial has been fully actioned; callers treat
    /// failures as best-effort.
    async fn clear_trial(&self, website_id: &str) -> Result<()>;

    /// Storage connectivity probe for the health check.
    async fn ping(&self) -> Result<()> {
        self.get_all().await.map(|_| ())
    }
}

/// In-memory plan store backed by a `HashMap`.
#[derive(Clone, Default)]
pub struct InMemoryPlanStore {
    inner: Arc<RwLock<HashMap<String, PlanState>>>,
}

impl InMemoryPlanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a single plan state (for tests and diagnostics).
    pub fn get(&self, website_id: &str) -> Option<PlanState> {
        self.inner.read().unwrap().get(website_id).cloned()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn upsert(
        &self,
        website_id: &str,
        plan_id: &str,
        free_trial_start_date: Option<NaiveDate>,
        next_billing_date: NaiveDate,
    ) -> Result<PlanState> {
        let now = Utc::now();
        let mut rows = self.inner.write().unwrap();

        let state = match rows.get(website_id) {
            Some(existing) => {
                let mut replaced = PlanState::new(
                    website_id,
                    plan_id,
                    free_trial_start_date,
                    Some(next_billing_date),
                    now,
                );
                replaced.created_at = existing.created_at;
                replaced
            }
            None => PlanState::new(
                website_id,
                plan_id,
                free_trial_start_date,
                Some(next_billing_date),
                now,
            ),
        };

        rows.insert(website_id.to_string(), state.clone());
        Ok(state)
    }

    async fn update_billing_date(
        &self,
        website_id: &str,
        next_billing_date: NaiveDate,
    ) -> Result<PlanState> {
        let mut rows = self.inner.write().unwrap();
        let state = rows
            .get_mut(website_id)
            .ok_or_else(|| PlanwatchError::not_found(format!("website {}", website_id)))?;

        state.next_billing_date = Some(next_billing_date);
        state.flags.reset_billing();
        state.updated_at = Utc::now();
        Ok(state.clone())
    }

    async fn get_all(&self) -> Result<Vec<PlanState>> {
        Ok(self.inner.read().unwrap().values().cloned().collect())
    }

    async fn update_flags(&self, website_id: &str, flags: &[NotificationFlag]) -> Result<()> {
        let mut rows = self.inner.write().unwrap();
        let state = rows
            .get_mut(website_id)
            .ok_or_else(|| PlanwatchError::not_found(format!("website {}", website_id)))?;

        for flag in flags {
            state.flags.set(*flag);
        }
        let now = Utc::now();
        state.updated_at = now;
        state.last_scheduler_run = Some(now);
        Ok(())
    }

    async fn clear_trial(&self, website_id: &str) -> Result<()> {
        let mut rows = self.inner.write().unwrap();
        let state = rows
            .get_mut(website_id)
            .ok_or_else(|| PlanwatchError::not_found(format!("website {}", website_id)))?;

        state.free_trial_start_date = None;
        state.flags.reset_trial();
        state.updated_at = Utc::now();
        Ok(())
    }
}
