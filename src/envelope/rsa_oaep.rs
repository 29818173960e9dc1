//! RSA-OAEP key envelope
//!
//! Symmetric keys are encrypted directly with OAEP padding over SHA-256.
//! Keys are persisted as PKCS#8 (private) and SPKI (public) PEM documents.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroize;

use super::{EnvelopeScheme, UnwrapKey, WrapKey};
use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::{SecureBytes, SecureString};

/// Default modulus size in bits
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Smallest modulus accepted for key generation
pub const MIN_RSA_BITS: usize = 1024;

/// Generated RSA key pair
#[derive(Clone)]
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use rsa::traits::PublicKeyParts;
        f.debug_struct("RsaKeyPair")
            .field("bits", &(self.public.size() * 8))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

impl RsaKeyPair {
    /// Generate a new RSA key pair with a `bits`-bit modulus
    pub fn generate(bits: usize) -> VaultResult<Self> {
        if bits < MIN_RSA_BITS {
            return Err(VaultError::invalid_parameter(
                "rsa_bits",
                &format!("at least {}", MIN_RSA_BITS),
                &bits.to_string(),
            ));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| {
            VaultError::crypto_error(
                "RSA key generation",
                &format!("Failed to generate RSA key: {}", e),
                error_codes::ENVELOPE_KEY_GENERATION_FAILED,
            )
        })?;
        let public = RsaPublicKey::from(&private);

        log::debug!("Generated {}-bit RSA key pair", bits);
        Ok(Self { private, public })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// Encode the private key as a PKCS#8 PEM document
    pub fn private_pem(&self) -> VaultResult<SecureString> {
        let pem = self.private.to_pkcs8_pem(LineEnding::LF).map_err(|e| {
            VaultError::crypto_error(
                "RSA encoding",
                &format!("Failed to encode RSA private key: {}", e),
                error_codes::ENVELOPE_KEY_ENCODING_FAILED,
            )
        })?;
        Ok(SecureString::new(pem.as_str()))
    }

    /// Encode the public key as an SPKI PEM document
    pub fn public_pem(&self) -> VaultResult<String> {
        self.public.to_public_key_pem(LineEnding::LF).map_err(|e| {
            VaultError::crypto_error(
                "RSA encoding",
                &format!("Failed to encode RSA public key: {}", e),
                error_codes::ENVELOPE_KEY_ENCODING_FAILED,
            )
        })
    }

    /// Decode a key pair from its PEM documents and check they belong together
    pub fn from_pem(private_pem: &str, public_pem: &str) -> VaultResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_pem(private_pem).map_err(|e| {
            VaultError::crypto_error(
                "RSA decoding",
                &format!("Failed to decode RSA private key: {}", e),
                error_codes::ENVELOPE_KEY_ENCODING_FAILED,
            )
        })?;
        let public = RsaPublicKey::from_public_key_pem(public_pem).map_err(|e| {
            VaultError::crypto_error(
                "RSA decoding",
                &format!("Failed to decode RSA public key: {}", e),
                error_codes::ENVELOPE_KEY_ENCODING_FAILED,
            )
        })?;

        if RsaPublicKey::from(&private) != public {
            return Err(VaultError::crypto_error(
                "RSA decoding",
                "public key does not match private key",
                error_codes::ENVELOPE_KEY_ENCODING_FAILED,
            ));
        }

        Ok(Self { private, public })
    }
}

impl WrapKey for RsaPublicKey {
    type Wrapped = Vec<u8>;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::RsaOaep
    }

    fn wrap_key(&self, symmetric_key: &[u8]) -> VaultResult<Vec<u8>> {
        self.encrypt(&mut OsRng, Oaep::new::<Sha256>(), symmetric_key)
            .map_err(|e| {
                VaultError::crypto_error(
                    "RSA-OAEP encryption",
                    &format!("Failed to wrap symmetric key: {}", e),
                    error_codes::ENVELOPE_WRAP_FAILED,
                )
            })
    }
}

impl UnwrapKey for RsaPrivateKey {
    type Wrapped = Vec<u8>;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::RsaOaep
    }

    fn unwrap_key(&self, wrapped: &Vec<u8>, expected_len: usize) -> VaultResult<SecureBytes> {
        let scheme = self.scheme().to_string();
        let mut key = self.decrypt(Oaep::new::<Sha256>(), wrapped).map_err(|e| {
            VaultError::unwrap_error(
                &scheme,
                &format!("OAEP decryption failed: {}", e),
                error_codes::ENVELOPE_UNWRAP_FAILED,
            )
        })?;

        if key.len() != expected_len {
            let actual = key.len();
            key.zeroize();
            return Err(VaultError::unwrap_error(
                &scheme,
                &format!("decoded key is {} bytes, expected {}", actual, expected_len),
                error_codes::ENVELOPE_KEY_LENGTH_MISMATCH,
            ));
        }

        Ok(SecureBytes::from(key))
    }
}

impl WrapKey for RsaKeyPair {
    type Wrapped = Vec<u8>;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::RsaOaep
    }

    fn wrap_key(&self, symmetric_key: &[u8]) -> VaultResult<Vec<u8>> {
        self.public.wrap_key(symmetric_key)
    }
}

impl UnwrapKey for RsaKeyPair {
    type Wrapped = Vec<u8>;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::RsaOaep
    }

    fn unwrap_key(&self, wrapped: &Vec<u8>, expected_len: usize) -> VaultResult<SecureBytes> {
        self.private.unwrap_key(wrapped, expected_len)
    }
}
