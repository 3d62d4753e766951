//! HTTP/WebSocket surface: handlers, router, and server runner.

pub mod handler;
mod runner;
mod signal;
mod state;

pub use runner::{build_router, run_server};
pub use state::{AppState, ConnectQuery};
