//! Save endpoint entrypoint.

use inplace_server::{config::env_flag_enabled, serve_router, AppState, Config, DEFAULT_PORT};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn wants_help(args: &[String]) -> anyhow::Result<bool> {
    let mut help = false;
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => help = true,
            value => {
                anyhow::bail!(
                    "Unexpected argument: '{}'. Configuration is read from the environment; use --help.",
                    value
                );
            }
        }
    }
    Ok(help)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inplace=info,inplace_server=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if wants_help(&args)? {
        print_help();
        return Ok(());
    }

    let config = Config::from_env();
    if config.csrf_token.is_some() {
        tracing::info!("CSRF token checks enabled");
    }
    if let Some(path) = &config.edit_log {
        tracing::info!("Appending accepted edits to {}", path.display());
    }
    let state = AppState::new(config.clone());

    let allow_public = env_flag_enabled("ALLOW_PUBLIC_ACCESS");
    if allow_public {
        tracing::warn!("Public access enabled - server will accept requests from any origin");
    }

    let bind_addr = inplace_server::resolve_bind_address(&config, allow_public);
    if !bind_addr.ip().is_loopback() {
        tracing::warn!(
            "Binding to non-localhost address: {} - ensure proper security measures are in place",
            bind_addr
        );
    }

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr().unwrap_or(bind_addr);
    tracing::info!("Save endpoint running at http://{}/api/save", actual_addr);

    let store = state.store.clone();
    serve_router(listener, state, allow_public, shutdown_signal()).await?;
    tracing::info!("Stopped after {} accepted edit(s)", store.history().len());
    Ok(())
}

fn print_help() {
    println!("inplace save endpoint\n");
    println!("Usage: inplace-server [--help]\n");
    println!("Environment variables:");
    println!("  PORT              Server port (default: {})", DEFAULT_PORT);
    println!(
        "  BIND              Override bind address (e.g. 0.0.0.0:{})",
        DEFAULT_PORT
    );
    println!("  MAX_BODY_SIZE     Maximum request body in bytes (default: 1MB)");
    println!("  CSRF_TOKEN        Require this token on every save");
    println!("  EDIT_LOG          Append accepted edits to this file");
    println!("  ALLOW_PUBLIC_ACCESS  Allow CORS from any origin");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
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
}
