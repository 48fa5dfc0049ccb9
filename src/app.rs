//! Application wiring: shared context and router assembly.

use crate::config::Config;
use crate::health::health_routes;
use crate::notifier::{HttpNotifier, Notifier};
use crate::plan::routes::plan_routes;
use crate::plan::storage::{InMemoryPlanStore, PlanStore};
use crate::security::require_api_key;
use crate::settings::{HttpSharedConfigClient, SettingsCache, SharedConfigClient};
use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler and to the scheduler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn PlanStore>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<SettingsCache>,
}

impl AppContext {
    pub fn builder(config: Config) -> AppContextBuilder {
        AppContextBuilder::new(config)
    }
}

/// Builder for [`AppContext`] with swappable backends.
pub struct AppContextBuilder {
    config: Config,
    store: Option<Arc<dyn PlanStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: Option<Arc<SettingsCache>>,
}

impl AppContextBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: None,
            notifier: None,
            settings: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_settings(mut self, settings: Arc<SettingsCache>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> AppContext {
        let config = Arc::new(self.config);

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryPlanStore::new()));

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(HttpNotifier::new(&config.notifier)));

        let settings = self.settings.unwrap_or_else(|| {
            let client: Option<Arc<dyn SharedConfigClient>> =
                config.settings.base_url.as_deref().map(|base_url| {
                    Arc::new(HttpSharedConfigClient::new(base_url, config.settings.timeout))
                        as Arc<dyn SharedConfigClient>
                });
            Arc::new(SettingsCache::new(
                client,
                config.scheduler.default_trial_days,
            ))
        });

        AppContext {
            config,
            store,
            notifier,
            settings,
        }
    }
}

/// Assembles the full router: authenticated plan routes plus the open
/// health endpoint, with request tracing on everything.
pub fn build_router(ctx: AppContext) -> Router {
    let protected = plan_routes().layer(middleware::from_fn_with_state(
        ctx.clone(),
        require_api_key,
    ));

    Router::new()
        .merge(protected)
        .merge(health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
