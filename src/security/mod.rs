//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight, allowed origins)
//!     → limits.rs (request body size)
//!     → handler
//!     → headers.rs (security response headers)
//! ```

pub mod cors;
pub mod headers;
pub mod limits;
