use aes_gcm::{
    aead::{generic_array::GenericArray, AeadCore, AeadInPlace, KeyInit, OsRng},
    Aes128Gcm, Aes256Gcm,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::SecureBytes;

/// Length of an AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of an AES-GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// Symmetric key sizes accepted by the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    /// 16-byte key, AES-128-GCM
    Aes128,
    /// 32-byte key, AES-256-GCM
    Aes256,
}

impl KeySize {
    pub fn len(self) -> usize {
        match self {
            KeySize::Aes128 => 16,
            KeySize::Aes256 => 32,
        }
    }

    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(KeySize::Aes128),
            32 => Some(KeySize::Aes256),
            _ => None,
        }
    }
}

/// The AEAD part of a sealed envelope: nonce, ciphertext and detached tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

/// AES-GCM cipher bound to one symmetric key
///
/// # Examples
///
/// ```
/// use facelock::aead::AeadVault;
///
/// let key = [0x42; 32];
/// let vault = AeadVault::new(&key).unwrap();
///
/// let sealed = vault.seal(b"Secret message", None).unwrap();
/// let opened = vault.open(&sealed, None).unwrap();
/// assert_eq!(opened.as_bytes(), b"Secret message");
/// ```
pub struct AeadVault {
    cipher: Cipher,
    key_size: KeySize,
}

impl std::fmt::Debug for AeadVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AeadVault")
            .field("key_size", &self.key_size)
            .field("cipher", &"[AES-GCM Cipher]")
            .finish()
    }
}

impl AeadVault {
    /// Create a cipher for a 16- or 32-byte key
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` for any other key length
    pub fn new(key: &[u8]) -> VaultResult<Self> {
        let key_size = KeySize::from_len(key.len()).ok_or_else(|| {
            VaultError::crypto_error(
                "Cipher initialization",
                &format!("key must be 16 or 32 bytes, got {}", key.len()),
                error_codes::AEAD_INVALID_KEY_SIZE,
            )
        })?;

        let cipher = match key_size {
            KeySize::Aes128 => Aes128Gcm::new_from_slice(key).map(Cipher::Aes128),
            KeySize::Aes256 => Aes256Gcm::new_from_slice(key).map(Cipher::Aes256),
        }
        .map_err(|e| {
            VaultError::crypto_error(
                "Cipher initialization",
                &e.to_string(),
                error_codes::AEAD_INVALID_KEY_SIZE,
            )
        })?;

        Ok(Self { cipher, key_size })
    }

    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Generate a random 12-byte nonce from the OS random source
    pub fn generate_nonce() -> Vec<u8> {
        Aes256Gcm::generate_nonce(&mut OsRng).to_vec()
    }

    /// Seal a plaintext under a fresh random nonce
    ///
    /// The associated data, if any, is authenticated but not stored; the
    /// same bytes must be supplied to [`AeadVault::open`].
    pub fn seal(
        &self,
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> VaultResult<SealedPayload> {
        let nonce = Self::generate_nonce();
        let aad = associated_data.unwrap_or(&[]);
        let mut buffer = plaintext.to_vec();

        let nonce_ref = GenericArray::from_slice(&nonce);
        let tag = match &self.cipher {
            Cipher::Aes128(c) => c.encrypt_in_place_detached(nonce_ref, aad, &mut buffer),
            Cipher::Aes256(c) => c.encrypt_in_place_detached(nonce_ref, aad, &mut buffer),
        }
        .map_err(|e| {
            VaultError::crypto_error(
                "Encryption failed",
                &format!("AES-GCM encryption failed: {}", e),
                error_codes::AEAD_ENCRYPTION_FAILED,
            )
        })?;

        Ok(SealedPayload {
            nonce,
            ciphertext: buffer,
            tag: tag.to_vec(),
        })
    }

    /// Open a sealed payload
    ///
    /// The tag is verified over the whole ciphertext before any plaintext is
    /// produced.
    ///
    /// # Errors
    ///
    /// * `InvalidParameter` if the nonce or tag has the wrong length
    /// * `AuthenticationFailure` if the tag does not verify
    pub fn open(
        &self,
        payload: &SealedPayload,
        associated_data: Option<&[u8]>,
    ) -> VaultResult<SecureBytes> {
        if payload.nonce.len() != NONCE_LEN {
            return Err(VaultError::InvalidParameter {
                parameter: "nonce".to_string(),
                expected: format!("{} bytes", NONCE_LEN),
                actual: format!("{} bytes", payload.nonce.len()),
                error_code: error_codes::AEAD_INVALID_NONCE_SIZE,
            });
        }
        if payload.tag.len() != TAG_LEN {
            return Err(VaultError::InvalidParameter {
                parameter: "tag".to_string(),
                expected: format!("{} bytes", TAG_LEN),
                actual: format!("{} bytes", payload.tag.len()),
                error_code: error_codes::AEAD_INVALID_TAG_SIZE,
            });
        }

        let aad = associated_data.unwrap_or(&[]);
        let nonce = GenericArray::from_slice(&payload.nonce);
        let tag = GenericArray::from_slice(&payload.tag);
        let mut buffer = SecureBytes::new(&payload.ciphertext);

        let result = match &self.cipher {
            Cipher::Aes128(c) => c.decrypt_in_place_detached(nonce, aad, buffer.as_bytes_mut(), tag),
            Cipher::Aes256(c) => c.decrypt_in_place_detached(nonce, aad, buffer.as_bytes_mut(), tag),
        };

        match result {
            Ok(()) => Ok(buffer),
            Err(_) => Err(VaultError::authentication_failure("AES-GCM open")),
        }
    }
}

/// Generate a one-time symmetric key from the OS random source
pub fn generate_key(size: KeySize) -> SecureBytes {
    let mut key = SecureBytes::zeroed(size.len());
    OsRng.fill_bytes(key.as_bytes_mut());
    key
}

/// Seal `plaintext` under `key` with a fresh nonce
pub fn seal(key: &[u8], plaintext: &[u8]) -> VaultResult<SealedPayload> {
    AeadVault::new(key)?.seal(plaintext, None)
}

/// Open a payload sealed by [`seal`]
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> VaultResult<SecureBytes> {
    let payload = SealedPayload {
        nonce: nonce.to_vec(),
        ciphertext: ciphertext.to_vec(),
        tag: tag.to_vec(),
    };
    AeadVault::new(key)?.open(&payload, None)
}
