//! Shared integration-test server bootstrap helpers.

use axum_test::TestServer;
use inplace_server::{create_app, AppState, Config};
use std::path::Path;
use std::sync::Arc;

pub(crate) fn test_config() -> Config {
    Config {
        port: 0,
        ..Config::default()
    }
}

pub(crate) fn test_config_with_log(log_path: &Path) -> Config {
    Config {
        edit_log: Some(log_path.to_path_buf()),
        ..test_config()
    }
}

pub(crate) fn test_server_for_config(config: Config) -> (TestServer, AppState) {
    let state = AppState::new(config);
    let app = create_app(state.clone(), false);
    let server = TestServer::new(app).expect("server");
    (server, state)
}

pub(crate) fn setup_test_server() -> (TestServer, Arc<inplace_server::EditStore>) {
    let (server, state) = test_server_for_config(test_config());
    (server, state.store)
}
