use anyhow::Context;
use planwatch::{AppContext, ConfigBuilder, Scheduler, build_router};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;

    planwatch::init_tracing_with_config(&config);

    let addr = config.server.addr().context("invalid listen address")?;
    let interval = Duration::from_secs(config.scheduler.interval_seconds);

    let ctx = AppContext::builder(config).build();

    ctx.store
        .ping()
        .await
        .context("plan-state store is unreachable")?;

    // Warm the settings cache so the first scheduler pass and the first
    // requests see remote values when the config service is up.
    ctx.settings.refresh().await;

    let scheduler = Arc::new(Scheduler::new(
        ctx.store.clone(),
        ctx.notifier.clone(),
        ctx.settings.clone(),
    ));
    let (scheduler_handle, scheduler_shutdown) = scheduler.spawn(interval);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(target: "planwatch", %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!(target: "planwatch", "shutting down scheduler");
    let _ = scheduler_shutdown.send(()).await;
    let _ = scheduler_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "planwatch", error = %e, "failed to listen for ctrl-c");
    }
}
