//! HTTP API (enabled by the `ui` feature).

mod server;

pub use server::{router, serve, AppState};
