//! Plan state model: tracked dates and notification flags per website.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One notification threshold's dedup flag.
///
/// A set flag means the corresponding event has been dispatched at least
/// once for the current tracking period. It is a dedup marker, not a
/// delivery receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationFlag {
    TrialNotified5d,
    TrialNotified3d,
    TrialNotified1d,
    TrialEndedActionTaken,
    BillingNotified5d,
    BillingNotified3d,
    BillingNotified1d,
}

/// Per-threshold notification flags, all false for a fresh tracking period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFlags {
    pub trial_notified_5d: bool,
    pub trial_notified_3d: bool,
    pub trial_notified_1d: bool,
    pub trial_ended_action_taken: bool,
    pub billing_notified_5d: bool,
    pub billing_notified_3d: bool,
    pub billing_notified_1d: bool,
}

impl NotificationFlags {
    pub fn is_set(&self, flag: NotificationFlag) -> bool {
        match flag {
            NotificationFlag::TrialNotified5d => self.trial_notified_5d,
            NotificationFlag::TrialNotified3d => self.trial_notified_3d,
            NotificationFlag::TrialNotified1d => self.trial_notified_1d,
            NotificationFlag::TrialEndedActionTaken => self.trial_ended_action_taken,
            NotificationFlag::BillingNotified5d => self.billing_notified_5d,
            NotificationFlag::BillingNotified3d => self.billing_notified_3d,
            NotificationFlag::BillingNotified1d => self.billing_notified_1d,
        }
    }

    /// Set a single flag to true. Flags are never unset here; only
    /// [`PlanState`] lifecycle operations (upsert, clear-trial) reset them.
    pub fn set(&mut self, flag: NotificationFlag) {
        match flag {
            NotificationFlag::TrialNotified5d => self.trial_notified_5d = true,
            NotificationFlag::TrialNotified3d => self.trial_notified_3d = true,
            NotificationFlag::TrialNotified1d => self.trial_notified_1d = true,
            NotificationFlag::TrialEndedActionTaken => self.trial_ended_action_taken = true,
            NotificationFlag::BillingNotified5d => self.billing_notified_5d = true,
            NotificationFlag::BillingNotified3d => self.billing_notified_3d = true,
            NotificationFlag::BillingNotified1d => self.billing_notified_1d = true,
        }
    }

    /// Reset the trial flags, leaving billing flags untouched.
    pub fn reset_trial(&mut self) {
        self.trial_notified_5d = false;
        self.trial_notified_3d = false;
        self.trial_notified_1d = false;
        self.trial_ended_action_taken = false;
    }

    /// Reset the billing flags, leaving trial flags untouched.
    pub fn reset_billing(&mut self) {
        self.billing_notified_5d = false;
        self.billing_notified_3d = false;
        self.billing_notified_1d = false;
    }

    pub fn any_set(&self) -> bool {
        self.trial_notified_5d
            || self.trial_notified_3d
            || self.trial_notified_1d
            || self.trial_ended_action_taken
            || self.billing_notified_5d
            || self.billing_notified_3d
            || self.billing_notified_1d
    }
}

/// Persisted plan state for one website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanState {
    /// Opaque website identifier, immutable after creation.
    pub website_id: String,
    /// Subscription plan identifier.
    pub plan_id: String,
    /// None means no active trial tracking.
    pub free_trial_start_date: Option<NaiveDate>,
    /// None means no billing-cycle tracking.
    pub next_billing_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Reserved marker: stamped when the scheduler updates flags, cleared on
    /// upsert, never read by the evaluator.
    pub last_scheduler_run: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub flags: NotificationFlags,
}

impl PlanState {
    /// Create a fresh plan state with all flags clear.
    pub fn new(
        website_id: impl Into<String>,
        plan_id: impl Into<String>,
        free_trial_start_date: Option<NaiveDate>,
        next_billing_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            website_id: website_id.into(),
            plan_id: plan_id.into(),
            free_trial_start_date,
            next_billing_date,
            created_at: now,
            updated_at: now,
            last_scheduler_run: None,
            flags: NotificationFlags::default(),
        }
    }
}
