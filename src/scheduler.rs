//! Periodic scheduler running the threshold evaluator over all plans.
//!
//! One pass: refresh the shared-config snapshot, load every plan, evaluate
//! each independently, dispatch the resulting events and persist the dedup
//! flags. A failure on one plan is logged and the pass moves on to the next.

use crate::error::Result;
use crate::notifier::Notifier;
use crate::plan::evaluator::{self, PlanEvent};
use crate::plan::state::PlanState;
use crate::plan::storage::PlanStore;
use crate::settings::{SettingsCache, SettingsSnapshot};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Scheduler {
    store: Arc<dyn PlanStore>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<SettingsCache>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn PlanStore>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<SettingsCache>,
    ) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    /// Spawn the scheduler loop on the runtime.
    ///
    /// Returns the task handle and a shutdown sender; sending on it stops
    /// the loop after the current tick.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> (JoinHandle<()>, mpsc::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            self.run(interval, shutdown_rx).await;
        });
        (handle, shutdown_tx)
    }

    /// Run the loop: one pass immediately, then one per interval.
    ///
    /// No overlap prevention: a slow pass and the next tick may interleave.
    /// That is safe because flag updates are idempotent and the evaluator is
    /// pure.
    pub async fn run(&self, interval: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            target: "planwatch::scheduler",
            interval_seconds = interval.as_secs(),
            "Scheduler started"
        );

        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!(target: "planwatch::scheduler", "Shutdown signal received, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_pass(Utc::now().date_naive()).await;
                }
            }
        }

        tracing::info!(target: "planwatch::scheduler", "Scheduler stopped");
    }

    /// One full evaluation pass over all plans.
    pub async fn run_pass(&self, today: NaiveDate) {
        let settings = self.settings.refresh().await;

        let plans = match self.store.get_all().await {
            Ok(plans) => plans,
            Err(e) => {
                tracing::error!(
                    target: "planwatch::scheduler",
                    error = %e,
                    "Failed to load plan states, skipping pass"
                );
                return;
            }
        };

        tracing::debug!(
            target: "planwatch::scheduler",
            plan_count = plans.len(),
            trial_duration_days = settings.trial_duration_days,
            %today,
            "Scheduler pass started"
        );

        for plan in &plans {
            if let Err(e) = self.process_plan(&settings, today, plan).await {
                tracing::error!(
                    target: "planwatch::scheduler",
                    website_id = %plan.website_id,
                    error = %e,
                    "Failed to process plan, continuing pass"
                );
            }
        }
    }

    /// Evaluate one plan, dispatch its events and persist the flags.
    ///
    /// Flags record dispatch *attempts*: a failed outbound call still sets
    /// the flag, so a persistently failing backend suppresses that one
    /// alert rather than retrying it forever.
    async fn process_plan(
        &self,
        settings: &SettingsSnapshot,
        today: NaiveDate,
        plan: &PlanState,
    ) -> Result<()> {
        let events = evaluator::evaluate(today, settings.trial_duration_days, plan);
        if events.is_empty() {
            return Ok(());
        }

        let mut attempted = Vec::with_capacity(events.len());
        let mut trial_ended = false;

        for event in &events {
            let dispatch = match event {
                PlanEvent::Warning {
                    kind,
                    days_until,
                    reference_date,
                } => {
                    self.notifier
                        .send_warning(settings, &plan.website_id, *kind, *days_until, *reference_date)
                        .await
                }
                PlanEvent::TrialEnded => {
                    trial_ended = true;
                    self.notifier
                        .send_trial_ended(settings, &plan.website_id)
                        .await
                }
            };

            if let Err(e) = dispatch {
                tracing::warn!(
                    target: "planwatch::scheduler",
                    website_id = %plan.website_id,
                    error = %e,
                    "Notification dispatch failed; flag recorded anyway"
                );
            }
            attempted.push(event.flag());
        }

        self.store.update_flags(&plan.website_id, &attempted).await?;

        if trial_ended {
            // Best-effort: the lapsed trial has been actioned, stop tracking it.
            if let Err(e) = self.store.clear_trial(&plan.website_id).await {
                tracing::warn!(
                    target: "planwatch::scheduler",
                    website_id = %plan.website_id,
                    error = %e,
                    "Failed to clear lapsed trial"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::test::{RecordedCall, RecordingNotifier};
    use crate::plan::evaluator::WarningKind;
    use crate::plan::storage::InMemoryPlanStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: InMemoryPlanStore,
        notifier: Arc<RecordingNotifier>,
        scheduler: Scheduler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryPlanStore::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let settings = Arc::new(SettingsCache::new(None, 14));
        let scheduler = Scheduler::new(
            Arc::new(store.clone()),
            notifier.clone(),
            settings,
        );
        Fixture {
            store,
            notifier,
            scheduler,
        }
    }

    #[tokio::test]
    async fn test_pass_dispatches_warning_and_sets_flag() {
        let f = fixture();
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 2, 1))
            .await
            .unwrap();

        f.scheduler.run_pass(date(2024, 1, 9)).await;

        assert_eq!(
            f.notifier.calls(),
            vec![RecordedCall::Warning {
                website_id: "site-1".to_string(),
                kind: WarningKind::Trial,
                days_until: 5,
                reference_date: date(2024, 1, 14),
            }]
        );
        let state = f.store.get("site-1").unwrap();
        assert!(state.flags.trial_notified_5d);
        assert!(state.last_scheduler_run.is_some());
    }

    #[tokio::test]
    async fn test_pass_is_idempotent_for_a_day() {
        let f = fixture();
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 2, 1))
            .await
            .unwrap();

        f.scheduler.run_pass(date(2024, 1, 9)).await;
        f.scheduler.run_pass(date(2024, 1, 9)).await;

        // The flag gates the second pass: one dispatch only.
        assert_eq!(f.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_still_sets_flag() {
        let f = fixture();
        f.notifier.set_fail(true);
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 2, 1))
            .await
            .unwrap();

        f.scheduler.run_pass(date(2024, 1, 9)).await;

        // Attempt-based flags: the warning is not retried next pass.
        assert!(f.store.get("site-1").unwrap().flags.trial_notified_5d);
        f.scheduler.run_pass(date(2024, 1, 9)).await;
        assert_eq!(f.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_trial_ended_dispatches_and_clears_trial() {
        let f = fixture();
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 2, 1))
            .await
            .unwrap();

        // Trial ended 10 days ago; one downgrade regardless of lateness.
        f.scheduler.run_pass(date(2024, 1, 24)).await;

        assert_eq!(
            f.notifier.calls(),
            vec![RecordedCall::TrialEnded {
                website_id: "site-1".to_string(),
            }]
        );
        let state = f.store.get("site-1").unwrap();
        assert!(state.free_trial_start_date.is_none());

        // Next pass: trial tracking is gone, nothing re-fires.
        f.scheduler.run_pass(date(2024, 1, 25)).await;
        assert_eq!(f.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_plans_are_processed_independently() {
        let f = fixture();
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 2, 1))
            .await
            .unwrap();
        f.store
            .upsert("site-2", "pro", Some(date(2024, 1, 5)), date(2024, 2, 1))
            .await
            .unwrap();

        // site-1 hits the 5-day threshold; site-2 is mid-trial and quiet.
        f.scheduler.run_pass(date(2024, 1, 9)).await;

        let calls = f.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(
            &calls[0],
            RecordedCall::Warning { website_id, .. } if website_id == "site-1"
        ));
        assert!(!f.store.get("site-2").unwrap().flags.any_set());
    }

    #[tokio::test]
    async fn test_trial_and_billing_flags_in_one_pass() {
        let f = fixture();
        f.store
            .upsert("site-1", "pro", Some(date(2024, 1, 1)), date(2024, 1, 16))
            .await
            .unwrap();

        f.scheduler.run_pass(date(2024, 1, 13)).await;

        let state = f.store.get("site-1").unwrap();
        assert!(state.flags.trial_notified_1d);
        assert!(state.flags.billing_notified_3d);
        assert_eq!(f.notifier.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let f = fixture();
        let scheduler = Arc::new(f.scheduler);
        let (handle, shutdown_tx) = scheduler.spawn(Duration::from_secs(3600));

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap();
    }
}
