/*!
 * Error Handling for the facelock custody layer
 *
 * Provides a single error type for the AEAD vault, the key envelopes, the
 * secret custodian, the encoding vault and the access monitor, with numeric
 * error codes and user-facing messages.
 */

use thiserror::Error;

/// Error type for all custody and access operations
#[derive(Debug, Error)]
pub enum VaultError {
    /// An underlying primitive failed. Not retryable.
    #[error("Cryptographic operation failed: {operation} - {cause}")]
    CryptoError {
        operation: String,
        cause: String,
        error_code: u32,
    },

    /// Tag mismatch: tampered data or wrong key.
    #[error("Authentication failed: {operation}")]
    AuthenticationFailure { operation: String, error_code: u32 },

    #[error("Key unwrap failed: {scheme} - {cause}")]
    UnwrapError {
        scheme: String,
        cause: String,
        error_code: u32,
    },

    #[error("Corrupt template for '{identity}': {cause}")]
    CorruptTemplate {
        identity: String,
        cause: String,
        error_code: u32,
    },

    #[error("Persistence failed: {path} - {cause}")]
    PersistenceError {
        path: String,
        cause: String,
        error_code: u32,
    },

    #[error("Invalid parameter: {parameter} - {expected} - got {actual}")]
    InvalidParameter {
        parameter: String,
        expected: String,
        actual: String,
        error_code: u32,
    },

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Error code constants for different error categories
pub mod error_codes {
    // AEAD errors: 1000-1999
    pub const AEAD_INVALID_KEY_SIZE: u32 = 1001;
    pub const AEAD_INVALID_NONCE_SIZE: u32 = 1002;
    pub const AEAD_INVALID_TAG_SIZE: u32 = 1003;
    pub const AEAD_ENCRYPTION_FAILED: u32 = 1004;
    pub const AEAD_AUTHENTICATION_FAILED: u32 = 1005;

    // Envelope errors: 2000-2999
    pub const ENVELOPE_KEY_GENERATION_FAILED: u32 = 2001;
    pub const ENVELOPE_WRAP_FAILED: u32 = 2002;
    pub const ENVELOPE_UNWRAP_FAILED: u32 = 2003;
    pub const ENVELOPE_KEY_LENGTH_MISMATCH: u32 = 2004;
    pub const ENVELOPE_COPRIME_EXHAUSTED: u32 = 2005;
    pub const ENVELOPE_KEY_ENCODING_FAILED: u32 = 2006;

    // Custodian errors: 3000-3999
    pub const CUSTODIAN_PASSWORD_TOO_SHORT: u32 = 3001;
    pub const CUSTODIAN_CONFIRMATION_MISMATCH: u32 = 3002;
    pub const CUSTODIAN_INCONSISTENT_STATE: u32 = 3003;
    pub const CUSTODIAN_VERIFICATION_FAILED: u32 = 3004;

    // Vault errors: 4000-4999
    pub const VAULT_CORRUPT_TEMPLATE: u32 = 4001;
    pub const VAULT_INVALID_IDENTITY: u32 = 4002;
    pub const VAULT_SHAPE_MISMATCH: u32 = 4003;

    // Access errors: 5000-5999
    pub const ACCESS_LOG_CORRUPT: u32 = 5001;

    // Persistence errors: 6000-6999
    pub const PERSIST_WRITE_FAILED: u32 = 6001;
    pub const PERSIST_RENAME_FAILED: u32 = 6002;
    pub const PERSIST_READ_FAILED: u32 = 6003;
    pub const PERSIST_REMOVE_FAILED: u32 = 6004;
    pub const PERSIST_PARTIAL_SETUP: u32 = 6005;

    pub const INVALID_PARAMETER: u32 = 9999;
}

impl VaultError {
    /// Get the numeric error code for this error
    pub fn error_code(&self) -> u32 {
        match self {
            VaultError::CryptoError { error_code, .. } => *error_code,
            VaultError::AuthenticationFailure { error_code, .. } => *error_code,
            VaultError::UnwrapError { error_code, .. } => *error_code,
            VaultError::CorruptTemplate { error_code, .. } => *error_code,
            VaultError::PersistenceError { error_code, .. } => *error_code,
            VaultError::InvalidParameter { error_code, .. } => *error_code,
            VaultError::NotConfigured(_) => 9001,
            VaultError::SerializationError(_) => 9002,
        }
    }

    /// Get a user-friendly error message
    pub fn user_friendly_message(&self) -> String {
        match self {
            VaultError::CryptoError { operation, .. } => format!(
                "Cryptographic operation '{}' failed. Stored secrets were not changed.",
                operation
            ),
            VaultError::AuthenticationFailure { .. } => {
                "The stored data could not be authenticated. It may have been tampered with."
                    .to_string()
            }
            VaultError::UnwrapError { .. } => {
                "The stored key could not be recovered with the current private key.".to_string()
            }
            VaultError::CorruptTemplate { identity, .. } => format!(
                "The face template for '{}' is unreadable and was skipped. Re-register this user.",
                identity
            ),
            VaultError::PersistenceError { path, .. } => format!(
                "Could not save '{}'. Check file permissions and disk space.",
                path
            ),
            VaultError::InvalidParameter {
                parameter,
                expected,
                ..
            } => format!("Invalid '{}'. Expected {}.", parameter, expected),
            VaultError::NotConfigured(what) => {
                format!("{} is not set up yet. Run first-time setup.", what)
            }
            VaultError::SerializationError(_) => {
                "Stored data is malformed and could not be read.".to_string()
            }
        }
    }

    /// Get the error category/type as a string
    pub fn error_type(&self) -> &'static str {
        match self {
            VaultError::CryptoError { .. } => "CryptoError",
            VaultError::AuthenticationFailure { .. } => "AuthenticationFailure",
            VaultError::UnwrapError { .. } => "UnwrapError",
            VaultError::CorruptTemplate { .. } => "CorruptTemplate",
            VaultError::PersistenceError { .. } => "PersistenceError",
            VaultError::InvalidParameter { .. } => "InvalidParameter",
            VaultError::NotConfigured(_) => "NotConfigured",
            VaultError::SerializationError(_) => "SerializationError",
        }
    }

    /// Whether this error means "wrong secret" rather than a broken system
    pub fn is_fail_closed(&self) -> bool {
        matches!(
            self,
            VaultError::AuthenticationFailure { .. } | VaultError::UnwrapError { .. }
        )
    }
}

/// Convenience constructors for common error types
impl VaultError {
    pub fn crypto_error(operation: &str, cause: &str, error_code: u32) -> Self {
        VaultError::CryptoError {
            operation: operation.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn authentication_failure(operation: &str) -> Self {
        VaultError::AuthenticationFailure {
            operation: operation.to_string(),
            error_code: error_codes::AEAD_AUTHENTICATION_FAILED,
        }
    }

    pub fn unwrap_error(scheme: &str, cause: &str, error_code: u32) -> Self {
        VaultError::UnwrapError {
            scheme: scheme.to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn corrupt_template(identity: &str, cause: &str) -> Self {
        VaultError::CorruptTemplate {
            identity: identity.to_string(),
            cause: cause.to_string(),
            error_code: error_codes::VAULT_CORRUPT_TEMPLATE,
        }
    }

    pub fn persistence_error(path: &std::path::Path, cause: &str, error_code: u32) -> Self {
        VaultError::PersistenceError {
            path: path.display().to_string(),
            cause: cause.to_string(),
            error_code,
        }
    }

    pub fn invalid_parameter(parameter: &str, expected: &str, actual: &str) -> Self {
        VaultError::InvalidParameter {
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            error_code: error_codes::INVALID_PARAMETER,
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for VaultError {
    fn from(err: std::io::Error) -> Self {
        VaultError::PersistenceError {
            path: "<unknown>".to_string(),
            cause: err.to_string(),
            error_code: error_codes::PERSIST_READ_FAILED,
        }
    }
}

/// Result type alias for custody operations
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_code_generation() {
        let error = VaultError::unwrap_error(
            "ElGamal",
            "decoded key is 31 bytes",
            error_codes::ENVELOPE_KEY_LENGTH_MISMATCH,
        );
        assert_eq!(error.error_code(), error_codes::ENVELOPE_KEY_LENGTH_MISMATCH);
        assert_eq!(error.error_type(), "UnwrapError");
    }

    #[test]
    fn test_fail_closed_classification() {
        assert!(VaultError::authentication_failure("open").is_fail_closed());
        assert!(VaultError::unwrap_error("RSA-OAEP", "padding", 0).is_fail_closed());
        assert!(!VaultError::persistence_error(
            Path::new("data/admin_auth.json"),
            "disk full",
            error_codes::PERSIST_WRITE_FAILED
        )
        .is_fail_closed());
    }

    #[test]
    fn test_user_friendly_message() {
        let error = VaultError::corrupt_template("alice", "tag mismatch");
        let message = error.user_friendly_message();
        assert!(message.contains("alice"));
        assert!(!message.contains("tag mismatch"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let err: VaultError = serde_json::from_str::<Vec<u8>>("{").unwrap_err().into();
        assert_eq!(err.error_type(), "SerializationError");
    }
}
