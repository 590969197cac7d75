//! Pairing data models.

use serde::{Deserialize, Serialize};

/// Identity snapshot of the dashboard user who registered a connection code.
///
/// Captured at registration time and never re-fetched, so later profile
/// changes are not reflected in tokens minted from this snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

/// JWT claims carried by an issued mobile bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileClaims {
    pub sub: String,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "tokenType")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl MobileClaims {
    /// Identity represented by these claims.
    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            display_name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// JWT claims carried by the desktop dashboard's delegated identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopClaims {
    pub sub: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub iss: String,
    pub exp: i64,
}
