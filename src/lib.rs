//! Root crate facade for the in-place editing engine and its save endpoint.

pub use inplace_core::*;

/// Reference persistence endpoint.
pub use inplace_server as server;
