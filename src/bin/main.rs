#![warn(clippy::all)]

mod api;
mod config;
mod database;
mod error;
mod media;
mod recipes;
mod store;
mod viewer;

use std::error::Error;

use tokio::{net::TcpListener, runtime::Runtime, signal::ctrl_c};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, trace_span};
use tracing_subscriber::{fmt::format::FmtSpan, prelude::*, EnvFilter, Registry};

use crate::{
    api::AppState, config::Config, database::connection::establish_pooled_connection,
    media::MediaStorage,
};

fn main() -> Result<(), Box<dyn Error>> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .pretty();
    let subscriber = Registry::default()
        .with(stdout_log)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = Runtime::new()?;
    runtime.block_on(start())
}

async fn start() -> Result<(), Box<dyn Error>> {
    let config = {
        let span = trace_span!("starting foodgram");
        let _guard = span.enter();
        Config::load()?
    };

    let pool = establish_pooled_connection(&config.database_url, config.pool_size)?;
    let media = MediaStorage::new(config.media_root.clone(), &config.media_url);
    std::fs::create_dir_all(media.root())?;

    let mut app = api::router(AppState::new(pool, media));

    let media_path = config.media_url.trim_end_matches('/');
    if media_path.starts_with('/') {
        app = app.nest_service(media_path, ServeDir::new(&config.media_root));
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
