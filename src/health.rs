//! Health check endpoint reporting storage connectivity.

use crate::app::AppContext;
use crate::plan::storage::PlanStore;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of probing a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregate health report. Unhealthy maps to a 503 so load balancers can
/// pull the instance.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: Vec<ComponentHealth>,
}

impl HealthResponse {
    pub fn from_checks(checks: Vec<ComponentHealth>) -> Self {
        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        };
        Self { status, checks }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let code = match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };
        (code, Json(self)).into_response()
    }
}

/// Probes the plan-state store.
pub async fn check_store(store: &Arc<dyn PlanStore>) -> ComponentHealth {
    match store.ping().await {
        Ok(()) => ComponentHealth {
            name: "storage",
            status: HealthStatus::Healthy,
            message: None,
        },
        Err(e) => ComponentHealth {
            name: "storage",
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
        },
    }
}

/// Handler for the health endpoint. Unauthenticated by design.
pub async fn health_handler(State(ctx): State<AppContext>) -> HealthResponse {
    HealthResponse::from_checks(vec![check_store(&ctx.store).await])
}

pub fn health_routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::storage::InMemoryPlanStore;

    #[tokio::test]
    async fn test_store_check_healthy() {
        let store: Arc<dyn PlanStore> = Arc::new(InMemoryPlanStore::new());
        let result = check_store(&store).await;
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.name, "storage");
    }

    #[test]
    fn test_any_unhealthy_component_degrades_the_report() {
        let report = HealthResponse::from_checks(vec![
            ComponentHealth {
                name: "storage",
                status: HealthStatus::Healthy,
                message: None,
            },
            ComponentHealth {
                name: "settings",
                status: HealthStatus::Unhealthy,
                message: Some("down".to_string()),
            },
        ]);
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.checks.len(), 2);
    }

    #[test]
    fn test_empty_report_is_healthy() {
        let report = HealthResponse::from_checks(Vec::new());
        assert_eq!(report.status, HealthStatus::Healthy);
    }
}
