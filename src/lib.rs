//! # Streaming HTTP Server Toolkit
//!
//! This library provides the building blocks for a reactive HTTP/1.1 server:
//! a streaming exchange engine, a WebSocket upgrade path, and a composable
//! routing chain dispatching requests to handler resources.
//!
//! # Library Design
//!
//! Each component can be used as a standalone building block, or combined
//! through the ready to use APIs in [`server`] and [`routing`].
//!
//! ## Definitions
//!
//! - [`uri`] request targets and path normalisation ([RFC3986])
//! - [`headers`] HTTP header fields and typed codecs ([RFC9110 Section 5])
//! - [`http`] HTTP semantics ([RFC9110])
//! - [`body`] streaming message bodies
//!
//! ## Behaviors
//!
//! - [`h1`] HTTP/1.1 exchange engine ([RFC9112])
//! - [`ws`] WebSocket framing and upgrade ([RFC6455])
//!
//! ## User Abstraction
//!
//! - [`service`] abstract user defined logic
//! - [`routing`] criteria based request dispatch
//!
//! ## Integrations
//!
//! - [`server`] all in one API to run a http server
//!
//! [RFC3986]: <https://www.rfc-editor.org/rfc/rfc3986.html>
//! [RFC6455]: <https://www.rfc-editor.org/rfc/rfc6455.html>
//! [RFC9110]: <https://www.rfc-editor.org/rfc/rfc9110.html>
//! [RFC9110 Section 5]: <https://www.rfc-editor.org/rfc/rfc9110.html#name-fields>
//! [RFC9112]: <https://www.rfc-editor.org/rfc/rfc9112.html>
#![warn(missing_debug_implementations)]

mod log;
mod config;
pub mod common;

// definitions
pub mod uri;
pub mod headers;
pub mod http;
pub mod body;

// HTTP protocol
pub mod h1;
pub mod ws;

// user abstraction
pub mod service;
pub mod routing;

// integration
pub mod server;

pub use config::ServerConfig;

/// Type erased error used across service boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
