//! Citypass API server
//!
//! Wires configuration, PostgreSQL, the payment gateway client, the pending
//! purchase reaper and the HTTP API together.
//!
//! ## REST Endpoints
//!
//! - `POST /api/subscriptions/checkout` - Open a charge
//! - `POST /api/subscriptions/confirm` - Confirm a paid charge
//! - `GET /api/subscriptions` - Subscription list
//! - `GET /api/subscriptions/cities/:city_id` - Grant for one city
//! - `GET /api/subscriptions/transactions` - Payment history
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::get;
use axum::Router;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use citypass::adapters::http::{subscription_router, SubscriptionAppState};
use citypass::adapters::{
    HttpPaymentGateway, PendingPurchaseReaper, PostgresCatalogReader, PostgresSubscriptionReader,
    PostgresSubscriptionStore,
};
use citypass::config::{AppConfig, LogFormat, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.server)?;
    config.validate().context("validating configuration")?;

    tracing::info!(
        environment = ?config.server.environment,
        gateway = %config.gateway.base_url,
        "Starting citypass"
    );

    let pool = connect(&config).await?;

    let store = Arc::new(PostgresSubscriptionStore::new(pool.clone()));
    let state = SubscriptionAppState {
        catalog: Arc::new(PostgresCatalogReader::new(pool.clone())),
        store: store.clone(),
        reader: Arc::new(PostgresSubscriptionReader::new(pool.clone())),
        gateway: Arc::new(HttpPaymentGateway::new(config.gateway.client_config())),
        settings: config.subscription_settings(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = if config.subscription.reaper_enabled {
        let reaper = PendingPurchaseReaper::new(store, config.subscription.reaper_config());
        Some(tokio::spawn(async move { reaper.run(shutdown_rx).await }))
    } else {
        tracing::info!("Pending purchase reaper disabled");
        None
    };

    let app = build_router(state, &config.server);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = reaper_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Reaper task failed");
        }
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .context("parsing log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
    }
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = &config.database;
    let pool = PgPoolOptions::new()
        .min_connections(db.min_connections)
        .max_connections(db.max_connections)
        .acquire_timeout(db.acquire_timeout())
        .idle_timeout(db.idle_timeout())
        .max_lifetime(db.max_lifetime())
        .connect(db.url.expose_secret())
        .await
        .context("connecting to PostgreSQL")?;
    tracing::info!(max_connections = db.max_connections, "Database pool created");

    if db.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("Migrations applied");
    }
    Ok(pool)
}

fn build_router(state: SubscriptionAppState, server: &ServerConfig) -> Router {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(TimeoutLayer::new(server.request_timeout()));

    Router::new()
        .nest("/api", subscription_router())
        .layer(middleware)
        .route("/health", get(|| async { StatusCode::OK }))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
