mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use lobby_api::guestbook;
use lobby_api::middleware::{MAX_REQUESTS, RateLimiter, WINDOW, rate_limit};
use lobby_api::ntfy;
use lobby_api::state::{AppState, AppStateInner};
use lobby_store::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lobby=debug,lobby_api=debug,lobby_store=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let config = Config::from_env()?;

    // Shared state
    let store = Store::new(config.store_url.clone(), config.store_key.clone());
    let notifier = lobby_api::notify::Notifier::new(
        config.ntfy_guestbook_url.clone(),
        config.ntfy_relay_url.clone(),
    );
    let state: AppState = Arc::new(AppStateInner { store, notifier });

    // Routes
    let mut app = Router::new()
        .route("/", get(lobby_api::greeting))
        .route("/guestbook", get(guestbook::list_entries))
        .route("/guestbook", post(guestbook::post_entry))
        .route("/ntfy", post(ntfy::relay_notification))
        .with_state(state);

    if config.dev_mode {
        info!("Dev mode: rate limiting disabled");
    } else {
        let limiter = Arc::new(RateLimiter::new(WINDOW, MAX_REQUESTS));
        app = app.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
    }

    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Lobby server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
