// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use commerce_auth_server::{
    api::router,
    config::{AppConfig, TlsPaths},
    state::AppState,
    telemetry::init_tracing,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(config.log_format) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server terminated with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr()?;
    let state = AppState::from_config(&config)?;
    let app = router(state, config.request_timeout);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    match &config.tls {
        Some(paths) => serve_https(app, addr, paths, shutdown_token).await?,
        None => serve_http(app, addr, shutdown_token).await?,
    }

    info!("Server stopped gracefully");
    Ok(())
}

async fn serve_https(
    app: Router,
    addr: SocketAddr,
    paths: &TlsPaths,
    shutdown_token: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    // axum-server is built without a default provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;

    let handle = Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_token.cancelled().await;
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!(%addr, "Commerce auth server listening on https (docs at /docs)");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

async fn serve_http(
    app: Router,
    addr: SocketAddr,
    shutdown_token: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    warn!("TLS_CERT_PATH/TLS_KEY_PATH not set; serving plain HTTP");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Commerce auth server listening on http (docs at /docs)");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel `shutdown_token`.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
}
