//! API Testbed Library
//!
//! A smoke-test backend exercising plain HTTP verbs, a server-sent-events
//! stream and a WebSocket echo handler.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod net;
pub mod observability;
pub mod security;
pub mod service;

pub use config::schema::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
