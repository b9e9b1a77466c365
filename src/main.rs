mod codeforces;
mod config;
mod controllers;
mod init;
mod models;
mod notify;
mod result;
mod scoring;

pub use crate::result::Result;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use sqlx::PgPool;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<config::Config>,
    db: PgPool,
    archive: Arc<codeforces::ProblemArchive>,
    notifier: notify::Notifier,
}

#[tokio::main]
async fn main() -> Result {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cfg = config::build();

    let db = init::db::init_pg_pool(&cfg).await?;

    let archive = Arc::new(codeforces::ProblemArchive::new(
        cfg.problem_archive_url.clone(),
    ));

    let notifier = notify::Notifier::new();

    // Real-time transport plugs in here; until one is attached this
    // subscriber drains events so delivery stays fire-and-forget.
    let mut events = notifier.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(notification) => tracing::debug!(?notification, "notification"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification subscriber lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let addr: SocketAddr = format!("{}:{}", cfg.server_host, cfg.server_port).parse()?;

    let state = AppState {
        cfg: Arc::new(cfg),
        db,
        archive,
        notifier,
    };

    let router = Router::new();

    let router = controllers::add_routes(router);

    let router = router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(Duration::from_secs(30))),
    );

    tracing::info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    return Ok(());
}
