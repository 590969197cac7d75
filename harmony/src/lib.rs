//! # Harmony
//!
//! Core library for the Harmony project dashboard's mobile pairing service.
//!
//! Pairing bridges a desktop-authenticated dashboard session to a new,
//! previously-unauthenticated mobile client. The desktop registers a short
//! connection code while authenticated; the mobile app exchanges that code
//! exactly once for a long-lived bearer token.
//!
//! ## Core Modules
//!
//! - [`pairing`]: connection code registry, token issuing/verification, and
//!   the background expiry sweeper
//!
//! ## Example
//!
//! ```no_run
//! use harmony::pairing::{CodeRegistry, Identity, TokenManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = CodeRegistry::new();
//!     let tokens = TokenManager::new("signing_secret".to_string());
//!
//!     let identity = Identity {
//!         username: "alice".to_string(),
//!         display_name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!
//!     registry.register("ABC123", identity, 600).await;
//!
//!     // Later, from the mobile client:
//!     let identity = registry.redeem("ABC123").await?;
//!     let token = tokens.issue(&identity)?;
//!     println!("Paired {} with token {token}", identity.username);
//!     Ok(())
//! }
//! ```

/// Mobile pairing: connection codes, bearer tokens, and expiry sweeping.
pub mod pairing;

pub use pairing::{
    CodeRegistry, DesktopClaims, DesktopTokenVerifier, Identity, MobileClaims, PairingError,
    PairingResult, TokenManager,
};
