// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hodl_relay::{
    api::router,
    config::{self, LogFormat},
    lnd::{LightningNode, LndClient},
    relay::RelayEngine,
    state::AppState,
};

/// Time given to in-flight HTTP requests once shutdown starts.
const HTTP_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(10);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config::log_format(&config::process_env) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let env = config::process_env;
    let lnd_config = config::load_lnd_config(&env).unwrap_or_else(|e| {
        error!(error_code = e.code(), error = %e, "Invalid LND configuration");
        std::process::exit(1);
    });
    let server_config = config::load_server_config(&env).unwrap_or_else(|e| {
        error!(error_code = e.code(), error = %e, "Invalid server configuration");
        std::process::exit(1);
    });
    let policy = config::load_relay_policy(&env).unwrap_or_else(|e| {
        error!(error_code = e.code(), error = %e, "Invalid relay policy");
        std::process::exit(1);
    });

    let node: Arc<dyn LightningNode> =
        Arc::new(LndClient::new(lnd_config).expect("Failed to build LND client"));

    // Authenticate once up front; a node we cannot talk to is fatal.
    let wallet = node
        .get_wallet_info()
        .await
        .expect("Failed to authenticate to LND");
    info!(
        is_authenticated_to_lnd = true,
        pubkey = %wallet.public_key,
        alias = %wallet.alias,
        block_height = wallet.current_block_height,
        synced = wallet.is_synced_to_chain,
        "Connected to Lightning node"
    );

    let shutdown = CancellationToken::new();
    let state = AppState::new(node.clone(), RelayEngine::new(node, policy, shutdown.clone()));
    let relay = state.relay.clone();
    let app = router(state);

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
            handle.graceful_shutdown(Some(HTTP_GRACE_PERIOD));
        }
    });

    let addr = server_config.addr;
    let served = match server_config.tls {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .expect("Failed to load TLS certificate and key");
            info!(%addr, "HODL relay listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!(%addr, "HODL relay listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    };

    if let Err(e) = served {
        error!(error = %e, "HTTP server failed");
    }

    relay.shutdown().await;
    info!("HODL relay stopped");
}
