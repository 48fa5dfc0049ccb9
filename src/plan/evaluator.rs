//! Threshold evaluation for plan state.
//!
//! Pure date arithmetic: given today's date, the configured trial duration
//! and one plan's stored state, decide which one-time events fire on this
//! pass. No I/O happens here; dispatch and flag persistence are the
//! scheduler's job.

use chrono::{Duration, NaiveDate};

use super::state::{NotificationFlag, PlanState};

/// Warning day-offsets, shared by trial and billing evaluation.
const WARNING_THRESHOLDS: [i64; 3] = [5, 3, 1];

/// Signed whole days from `a` to `b`; positive when `b` is after `a`.
///
/// Inputs are calendar dates, so the subtraction is exact — any time-of-day
/// component has already been truncated away by the types.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Last inclusive day of a trial: start plus (duration − 1) days.
///
/// A 14-day trial starting 2024-01-01 runs through 2024-01-14.
pub fn trial_end_date(start: NaiveDate, duration_days: u32) -> NaiveDate {
    start + Duration::days(i64::from(duration_days) - 1)
}

/// Which deadline a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    Trial,
    Billing,
}

impl WarningKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Billing => "billing",
        }
    }
}

/// An event the scheduler must dispatch exactly once per tracking period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEvent {
    /// Non-terminal notice ahead of a deadline. `days_until` is one of 5, 3
    /// or 1; `reference_date` is the deadline the warning counts down to.
    Warning {
        kind: WarningKind,
        days_until: i64,
        reference_date: NaiveDate,
    },
    /// Terminal action: the trial has lapsed and the website must be
    /// downgraded.
    TrialEnded,
}

impl PlanEvent {
    /// The dedup flag this event sets once dispatched.
    #[must_use]
    pub fn flag(&self) -> NotificationFlag {
        match self {
            Self::TrialEnded => NotificationFlag::TrialEndedActionTaken,
            Self::Warning {
                kind: WarningKind::Trial,
                days_until: 5,
                ..
            } => NotificationFlag::TrialNotified5d,
            Self::Warning {
                kind: WarningKind::Trial,
                days_until: 3,
                ..
            } => NotificationFlag::TrialNotified3d,
            Self::Warning {
                kind: WarningKind::Trial,
                ..
            } => NotificationFlag::TrialNotified1d,
            Self::Warning {
                kind: WarningKind::Billing,
                days_until: 5,
                ..
            } => NotificationFlag::BillingNotified5d,
            Self::Warning {
                kind: WarningKind::Billing,
                days_until: 3,
                ..
            } => NotificationFlag::BillingNotified3d,
            Self::Warning {
                kind: WarningKind::Billing,
                ..
            } => NotificationFlag::BillingNotified1d,
        }
    }
}

/// Evaluate one plan against today's date.
///
/// Warnings fire on exact day-offset equality gated on the matching unset
/// flag; the terminal trial action fires whenever the trial end is today or
/// in the past (covering missed passes) and its flag is unset. Equality
/// gating means a warning threshold silently skips if no pass observes that
/// exact day — a known tradeoff of the fixed polling interval, not a bug.
pub fn evaluate(today: NaiveDate, trial_duration_days: u32, plan: &PlanState) -> Vec<PlanEvent> {
    let mut events = Vec::new();

    if let Some(start) = plan.free_trial_start_date {
        let end = trial_end_date(start, trial_duration_days);
        let days_remaining = days_between(today, end);

        for days in WARNING_THRESHOLDS {
            let event = PlanEvent::Warning {
                kind: WarningKind::Trial,
                days_until: days,
                reference_date: end,
            };
            if days_remaining == days && !plan.flags.is_set(event.flag()) {
                events.push(event);
            }
        }

        if days_remaining <= 0 && !plan.flags.is_set(NotificationFlag::TrialEndedActionTaken) {
            events.push(PlanEvent::TrialEnded);
        }
    }

    if let Some(billing_date) = plan.next_billing_date {
        let days_until_billing = days_between(today, billing_date);

        for days in WARNING_THRESHOLDS {
            let event = PlanEvent::Warning {
                kind: WarningKind::Billing,
                days_until: days,
                reference_date: billing_date,
            };
            if days_until_billing == days && !plan.flags.is_set(event.flag()) {
                events.push(event);
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn plan(trial: Option<NaiveDate>, billing: Option<NaiveDate>) -> PlanState {
        PlanState::new("site-1", "pro", trial, billing, Utc::now())
    }

    #[test]
    fn test_days_between_signs() {
        let a = date(2024, 1, 1);
        let b = date(2024, 1, 9);
        assert_eq!(days_between(a, b), 8);
        assert_eq!(days_between(b, a), -8);
        assert_eq!(days_between(a, a), 0);
    }

    #[test]
    fn test_days_between_antisymmetric() {
        let pairs = [
            (date(2024, 1, 1), date(2024, 3, 15)),
            (date(2023, 12, 31), date(2024, 1, 1)),
            (date(2024, 2, 28), date(2024, 3, 1)), // leap year
        ];
        for (a, b) in pairs {
            assert_eq!(days_between(a, b), -days_between(b, a));
        }
    }

    #[test]
    fn test_trial_end_date_is_last_inclusive_day() {
        assert_eq!(trial_end_date(date(2024, 1, 1), 14), date(2024, 1, 14));
        assert_eq!(trial_end_date(date(2024, 1, 1), 1), date(2024, 1, 1));
        assert_eq!(trial_end_date(date(2024, 2, 20), 14), date(2024, 3, 4));
    }

    #[test]
    fn test_five_day_warning_fires_once() {
        // trialStart=2024-01-01, duration=14 -> trialEndDate=2024-01-14.
        let mut p = plan(Some(date(2024, 1, 1)), None);
        let today = date(2024, 1, 9); // daysRemaining == 5

        let events = evaluate(today, 14, &p);
        assert_eq!(
            events,
            vec![PlanEvent::Warning {
                kind: WarningKind::Trial,
                days_until: 5,
                reference_date: date(2024, 1, 14),
            }]
        );

        // Same day, flag now set: nothing fires.
        p.flags.set(NotificationFlag::TrialNotified5d);
        assert!(evaluate(today, 14, &p).is_empty());
    }

    #[test]
    fn test_three_and_one_day_trial_warnings() {
        let p = plan(Some(date(2024, 1, 1)), None);
        let events = evaluate(date(2024, 1, 11), 14, &p);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].flag(), NotificationFlag::TrialNotified3d);

        let events = evaluate(date(2024, 1, 13), 14, &p);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].flag(), NotificationFlag::TrialNotified1d);
    }

    #[test]
    fn test_trial_ended_fires_on_end_day() {
        let p = plan(Some(date(2024, 1, 1)), None);
        // daysRemaining == 0: the trial ends today.
        let events = evaluate(date(2024, 1, 14), 14, &p);
        assert_eq!(events, vec![PlanEvent::TrialEnded]);
    }

    #[test]
    fn test_trial_ended_fires_once_regardless_of_lateness() {
        let mut p = plan(Some(date(2024, 1, 1)), None);

        // Ended 10 days ago, action untaken: exactly one action event.
        let events = evaluate(date(2024, 1, 24), 14, &p);
        assert_eq!(events, vec![PlanEvent::TrialEnded]);

        // Action taken: nothing more, ever.
        p.flags.set(NotificationFlag::TrialEndedActionTaken);
        assert!(evaluate(date(2024, 1, 24), 14, &p).is_empty());
        assert!(evaluate(date(2024, 3, 1), 14, &p).is_empty());
    }

    #[test]
    fn test_ended_scenario_day_after_end() {
        // now=2024-01-15 -> daysRemaining == -1.
        let p = plan(Some(date(2024, 1, 1)), None);
        let events = evaluate(date(2024, 1, 15), 14, &p);
        assert_eq!(events, vec![PlanEvent::TrialEnded]);
    }

    #[test]
    fn test_warning_skipped_day_does_not_fire_later() {
        // Equality gating: at daysRemaining == 4 nothing fires, and the
        // missed 5-day threshold is not made up.
        let p = plan(Some(date(2024, 1, 1)), None);
        assert!(evaluate(date(2024, 1, 10), 14, &p).is_empty());
    }

    #[test]
    fn test_billing_three_day_warning() {
        let mut p = plan(None, Some(date(2024, 3, 10)));

        let events = evaluate(date(2024, 3, 7), 14, &p);
        assert_eq!(
            events,
            vec![PlanEvent::Warning {
                kind: WarningKind::Billing,
                days_until: 3,
                reference_date: date(2024, 3, 10),
            }]
        );

        p.flags.set(NotificationFlag::BillingNotified3d);
        assert!(evaluate(date(2024, 3, 7), 14, &p).is_empty());
    }

    #[test]
    fn test_no_billing_passed_action() {
        // Billing lapse handling belongs to the external billing system.
        let p = plan(None, Some(date(2024, 3, 10)));
        assert!(evaluate(date(2024, 3, 11), 14, &p).is_empty());
        assert!(evaluate(date(2024, 4, 1), 14, &p).is_empty());
    }

    #[test]
    fn test_trial_and_billing_fire_in_same_pass() {
        // Independent conditions: a 1-day trial warning and a 3-day billing
        // warning can land on the same pass.
        let p = plan(Some(date(2024, 1, 1)), Some(date(2024, 1, 16)));
        let events = evaluate(date(2024, 1, 13), 14, &p);

        let flags: Vec<_> = events.iter().map(PlanEvent::flag).collect();
        assert_eq!(
            flags,
            vec![
                NotificationFlag::TrialNotified1d,
                NotificationFlag::BillingNotified3d,
            ]
        );
    }

    #[test]
    fn test_no_tracking_no_events() {
        let p = plan(None, None);
        assert!(evaluate(date(2024, 1, 1), 14, &p).is_empty());
    }
}
