//! Room-based WebSocket chat hub.
//!
//! Clients join logical rooms over a WebSocket; messages broadcast to room
//! members through a single serialized dispatch loop, with history replay
//! for late joiners and fire-and-forget persistence that never blocks
//! delivery. See the `hub` module for the core.

// layers
pub mod domain;
pub mod hub;
pub mod infrastructure;
pub mod lifecycle;
pub mod ui;

// shared library
pub mod common;
pub mod config;
