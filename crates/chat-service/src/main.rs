//! Console Chat
//!
//! Entry point for the chat service.
//!
//! # Startup
//!
//! 1. Initialize tracing
//! 2. Load configuration from environment
//! 3. Install the Prometheus recorder
//! 4. Generate this process's token signing secret
//! 5. Connect the credential store and cache
//! 6. Serve HTTP and WebSocket traffic until SIGINT/SIGTERM
//! 7. Stop chat sessions and drain for at most `SHUTDOWN_GRACE_SECONDS`

use chat_service::auth::TokenKeys;
use chat_service::config::{Config, StorageBackend};
use chat_service::hub::ChatHub;
use chat_service::observability::metrics::init_metrics_recorder;
use chat_service::repositories::{
    InMemoryCredentialCache, InMemoryCredentialStore, PgCredentialStore, RedisCredentialCache,
};
use chat_service::routes::{self, AppState};
use chat_service::services::UserDirectory;
use common::secret::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_service=debug,chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Console Chat");

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        storage = ?config.storage,
        peer_write_timeout_ms = config.peer_write_timeout.as_millis(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to initialize metrics recorder");
        e
    })?;

    let tokens = Arc::new(TokenKeys::generate(config.token_ttl).map_err(|e| {
        error!(error = %e, "Failed to generate token secret");
        e
    })?);
    info!(
        token_ttl_seconds = tokens.ttl().as_secs(),
        "Token signing secret generated"
    );

    let directory = connect_directory(&config).await?;

    let bind_address = config.bind_address.clone();
    let shutdown_grace = config.shutdown_grace;

    let shutdown_token = CancellationToken::new();
    let connections = TaskTracker::new();

    let state = Arc::new(AppState {
        hub: Arc::new(
            ChatHub::new(config.peer_write_timeout).with_shutdown(shutdown_token.child_token()),
        ),
        directory,
        tokens,
        connections: connections.clone(),
        config,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!(error = %e, "Invalid bind address");
        e
    })?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind listener");
        e
    })?;
    info!(addr = %addr, "Console Chat listening");

    let server_token = shutdown_token.child_token();
    let mut server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_token.cancelled().await;
                info!("HTTP server no longer accepting connections");
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "HTTP server failed");
        }
    });

    tokio::select! {
        () = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown...");
        }
        _ = &mut server => {
            warn!("HTTP server exited before shutdown signal");
            return Ok(());
        }
    }

    // Stops accepting, and stops every chat session's reader.
    shutdown_token.cancel();
    connections.close();

    let drain = async {
        if let Err(e) = (&mut server).await {
            warn!(error = %e, "HTTP server task failed during shutdown");
        }
        connections.wait().await;
    };
    let drained = tokio::time::timeout(shutdown_grace, drain).await.is_ok();

    if drained {
        info!("In-flight requests and chat sessions drained");
    } else {
        warn!(
            grace_seconds = shutdown_grace.as_secs(),
            open_sessions = connections.len(),
            "Grace period elapsed, abandoning remaining connections"
        );
        server.abort();
    }

    info!("Console Chat shutdown complete");
    Ok(())
}

/// Build the user directory for the configured backend.
async fn connect_directory(config: &Config) -> Result<UserDirectory, Box<dyn std::error::Error>> {
    match &config.storage {
        StorageBackend::Postgres {
            database_url,
            redis_url,
        } => {
            info!("Connecting to database...");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(database_url.expose_secret())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to database");
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to run migrations");
                    e
                })?;
            info!("Database connection established");

            let cache =
                RedisCredentialCache::connect(redis_url.expose_secret(), config.cache_ttl).await?;
            info!("Redis connection established");

            Ok(UserDirectory::new(
                Arc::new(PgCredentialStore::new(pool)),
                Arc::new(cache),
            ))
        }
        StorageBackend::InMemory => {
            warn!("DATABASE_URL and REDIS_URL unset, using in-memory credential storage");
            Ok(UserDirectory::new(
                Arc::new(InMemoryCredentialStore::new()),
                Arc::new(InMemoryCredentialCache::new(config.cache_ttl)),
            ))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
