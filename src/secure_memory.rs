//! Secure Memory Handling Utilities
//!
//! Containers for the sensitive material this crate handles in process
//! memory: unwrapped symmetric keys, the decrypted administrator password and
//! decrypted template bytes. Every container is zeroed when dropped and
//! redacts its contents from `Debug` output.

use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A container for sensitive bytes that is zeroed when dropped.
///
/// # Security Properties
///
/// 1. Automatically zeroes memory when dropped
/// 2. Never prints its contents through `Debug`
/// 3. Compares in constant time
///
/// # Example
///
/// ```
/// use facelock::secure_memory::SecureBytes;
///
/// let key = SecureBytes::new(&[0x01, 0x02, 0x03, 0x04]);
/// assert_eq!(key.len(), 4);
/// assert_eq!(format!("{:?}", key), "SecureBytes([REDACTED; 4])");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes {
    bytes: Vec<u8>,
}

impl SecureBytes {
    /// Create a new SecureBytes holding a copy of `data`
    pub fn new(data: &[u8]) -> Self {
        Self {
            bytes: data.to_vec(),
        }
    }

    /// Create a zero-filled buffer of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len],
        }
    }

    /// Get a reference to the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get a mutable reference to the underlying bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Constant-time comparison against a candidate byte string
    ///
    /// Lengths are compared first; the length of a secret is not treated as
    /// confidential.
    pub fn ct_eq_bytes(&self, other: &[u8]) -> bool {
        self.bytes.len() == other.len() && bool::from(self.bytes.as_slice().ct_eq(other))
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED; {}])", self.bytes.len())
    }
}

impl PartialEq for SecureBytes {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq_bytes(&other.bytes)
    }
}

impl Eq for SecureBytes {}

impl From<Vec<u8>> for SecureBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for SecureBytes {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// A password held in memory only as long as it is needed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Number of characters, not bytes
    pub fn char_count(&self) -> usize {
        self.inner.chars().count()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString([REDACTED])")
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self { inner: value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_bytes_redacts_debug() {
        let key = SecureBytes::new(b"super secret key");
        let printed = format!("{:?}", key);
        assert!(!printed.contains("super"));
        assert!(printed.contains("16"));
    }

    #[test]
    fn test_constant_time_equality() {
        let a = SecureBytes::new(b"correct horse");
        assert!(a.ct_eq_bytes(b"correct horse"));
        assert!(!a.ct_eq_bytes(b"correct horsf"));
        assert!(!a.ct_eq_bytes(b"correct"));
        assert_eq!(a, SecureBytes::from(b"correct horse".to_vec()));
    }

    #[test]
    fn test_secure_string_char_count() {
        let pwd = SecureString::from("pässwörd");
        assert_eq!(pwd.char_count(), 8);
        assert!(pwd.as_bytes().len() > 8);
        assert_eq!(format!("{:?}", pwd), "SecureString([REDACTED])");
    }

    #[test]
    fn test_explicit_zeroize() {
        let mut buf = SecureBytes::new(&[0xAA; 8]);
        buf.zeroize();
        assert!(buf.is_empty());
    }
}
