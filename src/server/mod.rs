use crate::accounts::AccountRegistry;
use crate::config::Config;
use crate::convert::ConversionService;
use crate::storage::BlobStore;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod auth;
pub mod routes_accounts;
pub mod routes_convert;
pub mod routes_storage;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub conversion: Arc<ConversionService>,
    /// Account flows; None when the store is not configured
    pub accounts: Option<Arc<AccountRegistry>>,
    /// Blob store proxy target; None when the store is not configured
    pub store: Option<Arc<BlobStore>>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let protected = Router::new()
        .route("/convert", post(routes_convert::convert))
        .route("/upload", post(routes_storage::upload))
        .route("/register", post(routes_accounts::register))
        .route("/login", post(routes_accounts::login));

    let protected = if ctx.config.server.auth.enabled {
        protected.layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::bearer_auth_middleware,
        ))
    } else {
        protected
    };

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        // Produced artifacts are exposed read-only, keyed by
        // request-id/filename
        .nest_service("/output", ServeDir::new(&ctx.config.encoder.output_dir))
        .layer(DefaultBodyLimit::max(ctx.config.server.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Build the application context from config.
pub fn build_context(config: Config) -> Result<AppContext> {
    let conversion = Arc::new(ConversionService::new(&config.encoder)?);

    let (accounts, store) = if config.store.enabled {
        (
            Some(Arc::new(AccountRegistry::new(&config.store))),
            Some(Arc::new(BlobStore::new(&config.store))),
        )
    } else {
        tracing::warn!("Store not configured; /upload, /register and /login will return 503");
        (None, None)
    };

    Ok(AppContext {
        config: Arc::new(config),
        conversion,
        accounts,
        store,
    })
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    tokio::fs::create_dir_all(&config.encoder.output_dir)
        .await
        .context("Failed to create output directory")?;
    tokio::fs::create_dir_all(&config.encoder.work_dir)
        .await
        .context("Failed to create work directory")?;

    let ctx = build_context(config)?;
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
