//! Bearer token issuing and verification.

use super::errors::{PairingError, PairingResult};
use super::models::{DesktopClaims, Identity, MobileClaims};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

/// Claim value marking a token as a mobile pairing credential.
pub const MOBILE_TOKEN_TYPE: &str = "mobile";

/// Issues and verifies mobile bearer tokens.
///
/// Tokens are stateless: validity is carried entirely in the signed claims,
/// so a token survives process restarts and dies only by expiry or by the
/// signing secret being rotated.
#[derive(Clone)]
pub struct TokenManager {
    secret: String,
    token_duration: Duration,
}

impl TokenManager {
    /// Create a new token manager
    ///
    /// # Arguments
    ///
    /// * `secret` - Secret key for JWT signing, process-wide and read-only
    ///   after startup
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            token_duration: Duration::days(30),
        }
    }

    /// Mint a signed mobile token carrying the paired identity.
    ///
    /// # Errors
    ///
    /// * `PairingError::Jwt` - signing failed
    pub fn issue(&self, identity: &Identity) -> PairingResult<String> {
        self.issue_at(identity, Utc::now())
    }

    fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> PairingResult<String> {
        let claims = MobileClaims {
            sub: identity.username.clone(),
            username: identity.username.clone(),
            name: identity.display_name.clone(),
            email: identity.email.clone(),
            token_type: MOBILE_TOKEN_TYPE.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.token_duration).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify a mobile token's signature, expiry, and type.
    ///
    /// Stateless check: the signature alone is trusted, the code registry
    /// is never consulted.
    ///
    /// # Errors
    ///
    /// * `PairingError::Jwt` - bad signature, expired, or malformed claims
    /// * `PairingError::InvalidTokenType` - a well-signed token that is not
    ///   a mobile pairing credential
    pub fn verify(&self, token: &str) -> PairingResult<MobileClaims> {
        let token_data = decode::<MobileClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        if token_data.claims.token_type != MOBILE_TOKEN_TYPE {
            return Err(PairingError::InvalidTokenType);
        }
        Ok(token_data.claims)
    }
}

/// Verifies delegated identity tokens minted by the desktop dashboard.
///
/// The registration endpoint trusts these claims as the identity snapshot
/// for the connection code, so both the signature and the issuer are
/// checked before any claim is read.
#[derive(Clone)]
pub struct DesktopTokenVerifier {
    secret: String,
    issuer: String,
}

impl DesktopTokenVerifier {
    /// Create a new verifier
    ///
    /// # Arguments
    ///
    /// * `secret` - Shared secret the dashboard signs identity tokens with
    /// * `issuer` - Expected `iss` claim value
    pub fn new(secret: String, issuer: String) -> Self {
        Self { secret, issuer }
    }

    /// Verify a desktop identity token and return its claims.
    ///
    /// # Errors
    ///
    /// * `PairingError::Jwt` - bad signature, wrong issuer, expired, or
    ///   malformed claims
    pub fn verify(&self, token: &str) -> PairingResult<DesktopClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<DesktopClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}
