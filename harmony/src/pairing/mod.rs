//! Mobile pairing module providing code registration, redemption, and
//! bearer token management.
//!
//! This module implements the pairing handshake with:
//! - An in-memory, expiring, single-use connection code registry
//! - JWT mobile tokens (30-day expiry)
//! - Delegated desktop identity token verification
//! - A background sweeper purging unredeemed codes
//!
//! ## Example
//!
//! ```no_run
//! use harmony::pairing::{CodeRegistry, Identity, sweeper};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = CodeRegistry::new();
//!     let handle = sweeper::spawn(registry.clone(), Duration::from_secs(60));
//!
//!     let identity = Identity {
//!         username: "alice".to_string(),
//!         display_name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     registry.register("ABC123", identity, 600).await;
//!
//!     // ... serve requests ...
//!
//!     handle.stop().await;
//! }
//! ```

pub mod errors;
pub mod models;
pub mod registry;
pub mod sweeper;
pub mod tokens;

pub use errors::{PairingError, PairingResult};
pub use models::{DesktopClaims, Identity, MobileClaims};
pub use registry::CodeRegistry;
pub use sweeper::SweeperHandle;
pub use tokens::{DesktopTokenVerifier, TokenManager, MOBILE_TOKEN_TYPE};
