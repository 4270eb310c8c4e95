//! Path-masking reverse proxy library.
//!
//! Sits in front of a WordPress-style application, hides its internal
//! directory names behind operator-chosen segments, and keeps a web-server
//! rewrite block in step with the configuration.

pub mod admin;
pub mod artifact;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod masking;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use masking::{MaskControl, MaskSnapshot};
