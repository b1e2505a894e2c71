//! Network layer subsystem: certificates and the challenge listener.
//!
//! # Data Flow
//! ```text
//! Static mode:
//!     sslCertPath + sslKeyPath → tls.rs (StaticCertResolver) → HTTPS listener
//!
//! ACME mode:
//!     hostWhitelist → whitelist.rs → acme.rs (AcmeCertResolver) → HTTPS listener
//!                                  → challenge.rs (HTTP-01 on port2)
//! ```
//!
//! # Design Decisions
//! - Certificate failures fail the handshake, never the process
//! - Names outside the whitelist never reach the ACME client

pub mod acme;
pub mod challenge;
pub mod tls;
pub mod whitelist;

pub use acme::{AcmeCertResolver, AcmeProvider, AcquisitionState, ChallengeResponder};
pub use challenge::ChallengeListener;
pub use tls::{CertificateProvider, StaticCertResolver, TlsError};
pub use whitelist::{HostRejection, HostWhitelist};
