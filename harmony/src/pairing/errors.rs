//! Pairing error types.

use thiserror::Error;

/// Pairing errors
#[derive(Debug, Error)]
pub enum PairingError {
    /// Connection code was never registered or already consumed
    #[error("Connection code not found")]
    CodeNotFound,

    /// Connection code was registered but its TTL elapsed
    #[error("Connection code expired")]
    CodeExpired,

    /// Token is a valid JWT but not a mobile pairing token
    #[error("Not a mobile token")]
    InvalidTokenType,

    /// JWT token error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl PairingError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Unknown and expired codes are collapsed into one message so callers
    /// cannot enumerate which codes are live, and JWT errors are sanitized
    /// to hide token structure.
    pub fn client_message(&self) -> String {
        match self {
            PairingError::CodeNotFound | PairingError::CodeExpired => {
                "Invalid or expired connection code".to_string()
            }
            PairingError::InvalidTokenType | PairingError::Jwt(_) => {
                "Authentication failed".to_string()
            }
        }
    }
}

/// Result type for pairing operations
pub type PairingResult<T> = Result<T, PairingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_expired_share_a_client_message() {
        assert_eq!(
            PairingError::CodeNotFound.client_message(),
            PairingError::CodeExpired.client_message(),
        );
        assert_eq!(
            PairingError::CodeNotFound.client_message(),
            "Invalid or expired connection code"
        );
    }
}
