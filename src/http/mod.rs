//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout)
//!     → response.rs (pin snapshot, classify request)
//!     → server.rs proxy_handler (translate masked path, forward upstream)
//!     → response.rs (mask headers and body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestClassifier, X_REQUEST_ID};
pub use response::BodyMasked;
pub use server::{AppState, HttpServer, ServeError};
