//! hostgate: host-based HTTPS reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client (TLS) ──▶ net::tls / net::acme ──▶ http::server
//!                                                  │
//!                        ┌─────────────────────────┴──────────┐
//!                        ▼                                    ▼
//!                 http::control (/_/reload)          http::pipeline
//!                        │                                    │
//!                        ▼                                    ▼
//!                 routing::table  ◀── lookup ──  correlation, X-Forwarded-For
//!                 (ArcSwap snapshot)                          │
//!                                                             ▼
//!                                              backend ──▶ marker header
//!                                                             │
//!                                                             ▼
//!                                              observability::access_log
//!
//!     ACME mode: net::challenge answers HTTP-01 on port2 beside the HTTPS listener.
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use routing::RoutingTable;
