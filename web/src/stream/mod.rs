//! Event stream HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the streaming endpoint.
//! The broadcast machinery (Broker, registry, framing) lives in the `sse`
//! crate.

pub(crate) mod handler;
