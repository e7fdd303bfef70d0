//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → request.rs (request ID)
//!     → handlers.rs (verb endpoints → service)
//!     → sse.rs (timestamp event stream)
//!     → websocket.rs (echo sessions)
//! ```

pub mod handlers;
pub mod request;
pub mod server;
pub mod sse;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError};
