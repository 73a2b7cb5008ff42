//! mailwave server binary

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use mailwave::campaigns::CampaignScheduler;
use mailwave::config::AppConfig;
use mailwave::state::AppState;
use mailwave::{handlers, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing();

    let config = AppConfig::load().context("loading configuration")?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::connect(config)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations")
        .run(&state.pool)
        .await
        .context("running migrations")?;

    if state.config.scheduler.enabled {
        let scheduler = CampaignScheduler::new(
            Arc::clone(&state.sender),
            Arc::clone(&state.campaigns),
            Duration::from_secs(state.config.scheduler.poll_interval_secs),
        );
        tokio::spawn(scheduler.run());
    }

    let app = handlers::router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "mailwave listening");
    axum::serve(listener, app).await?;
    Ok(())
}
