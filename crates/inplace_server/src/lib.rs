//! Reference persistence endpoint for in-place edits (API, handlers, and shared state).

/// Environment-driven server configuration.
pub mod config;
/// HTTP error mapping for API handlers.
pub mod error;
/// HTTP handlers for save, source and edit endpoints.
pub mod handlers;
/// In-memory edit store with optional log file.
pub mod store;

pub use config::Config;
pub use error::HttpError;
pub use inplace_core::constants::DEFAULT_PORT;
pub use store::{EditRecord, EditStore};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<EditStore>,
    pub sources: Arc<BTreeMap<String, Value>>,
}

impl AppState {
    /// Construct shared application state with the default option sources.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    ///
    /// # Returns
    /// A new [`AppState`] with an empty edit store.
    pub fn new(config: Config) -> Self {
        Self::with_sources(config, handlers::sources::default_sources())
    }

    /// Construct shared application state serving `sources`.
    ///
    /// # Arguments
    /// - `config`: Loaded configuration.
    /// - `sources`: Option sources keyed by name.
    ///
    /// # Returns
    /// A new [`AppState`] with an empty edit store.
    pub fn with_sources(config: Config, sources: BTreeMap<String, Value>) -> Self {
        let store = Arc::new(EditStore::new(config.edit_log.clone()));
        Self {
            config: Arc::new(config),
            store,
            sources: Arc::new(sources),
        }
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
///
/// # Returns
/// Configured `axum::Router`.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from env var overrides and security policy.
///
/// # Arguments
/// - `config`: Server configuration containing the configured `port`.
/// - `allow_public_access`: Whether non-loopback bind targets are permitted.
///
/// # Returns
/// A validated socket address that enforces loopback when public access is disabled.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], config.port));
    let requested = match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

fn local_origins(port: u16) -> Vec<HeaderValue> {
    [
        format!("http://localhost:{}", port),
        format!("http://127.0.0.1:{}", port),
    ]
    .into_iter()
    .filter_map(|origin| origin.parse().ok())
    .collect()
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if allow_public_access {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(local_origins(cors_port)))
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
    };

    Router::new()
        .route(
            "/api/save",
            post(handlers::save::save_edit).fallback(handlers::save::method_not_allowed),
        )
        .route("/api/sources", get(handlers::sources::list_sources))
        .route("/api/sources/:name", get(handlers::sources::get_source))
        .route("/api/edits", get(handlers::edits::list_edits))
        .route("/api/edits/:name/:pk", get(handlers::edits::get_edit))
        .with_state(state.clone())
        .layer(
            tower::ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(state.config.max_body_size))
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Run the Axum server with graceful shutdown support.
///
/// # Arguments
/// - `listener`: Bound TCP listener for the server.
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
/// - `shutdown_signal`: Future that resolves when shutdown should start.
///
/// # Returns
/// `Ok(())` when the server exits cleanly.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

#[cfg(test)]
mod tests {
    use super::listener_cors_port;
    use super::resolve_bind_address;
    use super::Config;
    use inplace_core::constants::DEFAULT_PORT;
    use inplace_core::env::{env_lock, EnvGuard};
    use std::net::SocketAddr;

    fn config_with_port(port: u16) -> Config {
        Config {
            port,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn listener_cors_port_uses_bound_listener_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener");
        let expected = listener.local_addr().expect("listener addr").port();
        let resolved = listener_cors_port(&listener, DEFAULT_PORT);
        assert_eq!(resolved, expected);
    }

    // BIND is process-global, so the cases share one test.
    #[test]
    fn resolve_bind_address_enforces_loopback_and_falls_back_on_bad_input() {
        let _lock = env_lock().lock().expect("env lock");
        let config = config_with_port(4040);
        let _unset = EnvGuard::remove("BIND");
        let loopback = resolve_bind_address(&config, false);
        assert_eq!(loopback, SocketAddr::from(([127, 0, 0, 1], 4040)));

        let public_bind = EnvGuard::set("BIND", "0.0.0.0:4040");
        let forced = resolve_bind_address(&config, false);
        assert_eq!(forced.ip().to_string(), "127.0.0.1");
        assert_eq!(forced.port(), 4040);
        let public = resolve_bind_address(&config, true);
        assert_eq!(public.ip().to_string(), "0.0.0.0");

        drop(public_bind);

        let _bad_bind = EnvGuard::set("BIND", "bad:host");
        let fallback = resolve_bind_address(&config, false);
        assert_eq!(fallback, SocketAddr::from(([127, 0, 0, 1], 4040)));
    }
}
