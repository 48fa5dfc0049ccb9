//! HTTP surface for plan-state management.
//!
//! Both endpoints sit behind the API-key middleware. Request bodies are
//! validated by hand so malformed input comes back as a 400 with a field
//! message rather than a bare rejection.

use crate::app::AppContext;
use crate::error::{PlanwatchError, Result};
use crate::plan::state::PlanState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{post, put},
};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPlanStateRequest {
    pub website_id: Option<String>,
    pub plan_id: Option<String>,
    pub free_trial_start_date: Option<String>,
    pub next_billing_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillingDateRequest {
    pub next_billing_date: Option<String>,
}

fn require_field<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PlanwatchError::validation(format!("{field} is required"))),
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%F").map_err(|_| {
        PlanwatchError::validation(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

/// POST /plan-states
///
/// Records or replaces the tracked plan state for a website. Any existing
/// notification flags are cleared so the new cycle starts fresh.
pub async fn upsert_plan_state(
    State(ctx): State<AppContext>,
    Json(body): Json<UpsertPlanStateRequest>,
) -> Result<Json<PlanState>> {
    let website_id = require_field(&body.website_id, "websiteId")?;
    let plan_id = require_field(&body.plan_id, "planId")?;
    let next_billing = require_field(&body.next_billing_date, "nextBillingDate")?;
    let next_billing_date = parse_date(next_billing, "nextBillingDate")?;

    let trial_start = body
        .free_trial_start_date
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_date(v, "freeTrialStartDate"))
        .transpose()?;

    let state = ctx
        .store
        .upsert(website_id, plan_id, trial_start, next_billing_date)
        .await?;

    tracing::info!(
        target: "planwatch::api",
        website_id = %state.website_id,
        plan_id = %state.plan_id,
        "plan state upserted"
    );

    Ok(Json(state))
}

/// PUT /plan-states/{website_id}/update-billing-date
///
/// Moves the billing date for an already tracked website and re-arms the
/// billing warnings. Trial flags are left untouched.
pub async fn update_billing_date(
    State(ctx): State<AppContext>,
    Path(website_id): Path<String>,
    Json(body): Json<UpdateBillingDateRequest>,
) -> Result<Json<PlanState>> {
    let next_billing = require_field(&body.next_billing_date, "nextBillingDate")?;
    let next_billing_date = parse_date(next_billing, "nextBillingDate")?;

    let state = ctx
        .store
        .update_billing_date(&website_id, next_billing_date)
        .await?;

    tracing::info!(
        target: "planwatch::api",
        website_id = %state.website_id,
        next_billing_date = %next_billing_date,
        "billing date updated"
    );

    Ok(Json(state))
}

/// Creates the plan-state router
pub fn plan_routes() -> Router<AppContext> {
    Router::new()
        .route("/plan-states", post(upsert_plan_state))
        .route(
            "/plan-states/{website_id}/update-billing-date",
            put(update_billing_date),
        )
}
