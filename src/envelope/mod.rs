//! Hybrid key envelopes
//!
//! A one-time symmetric key is sealed under an asymmetric public key and the
//! payload itself is sealed with the AEAD vault. Two asymmetric schemes are
//! provided:
//!
//! - El Gamal over a safe-prime group (discrete-log), used for the
//!   administrator password
//! - RSA with OAEP/SHA-256 padding (factoring), used for face templates
//!
//! Both implement [`WrapKey`] and [`UnwrapKey`], so the custodian and the
//! template vault never depend on the scheme they were configured with.

mod elgamal;
mod rsa_oaep;

pub use elgamal::*;
pub use rsa_oaep::*;

use std::fmt::{self, Display};

use crate::aead::{self, AeadVault, KeySize, SealedPayload};
use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::SecureBytes;

/// Public half of an envelope scheme
pub trait WrapKey {
    /// Scheme-specific wrapped key representation
    type Wrapped;

    fn scheme(&self) -> EnvelopeScheme;

    /// Encrypt a symmetric key under this public key
    fn wrap_key(&self, symmetric_key: &[u8]) -> VaultResult<Self::Wrapped>;
}

/// Private half of an envelope scheme
pub trait UnwrapKey {
    type Wrapped;

    fn scheme(&self) -> EnvelopeScheme;

    /// Recover a symmetric key of exactly `expected_len` bytes
    ///
    /// Any other length is reported as `UnwrapError` and never returned.
    fn unwrap_key(&self, wrapped: &Self::Wrapped, expected_len: usize)
        -> VaultResult<SecureBytes>;
}

/// Asymmetric scheme families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeScheme {
    ElGamal,
    RsaOaep,
}

impl Display for EnvelopeScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeScheme::ElGamal => write!(f, "ElGamal"),
            EnvelopeScheme::RsaOaep => write!(f, "RSA-OAEP"),
        }
    }
}

/// Key generation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeParams {
    /// Safe-prime group with a modulus of `bits` bits
    DiscreteLog { bits: usize },
    /// RSA modulus of `bits` bits
    Factoring { bits: usize },
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        EnvelopeParams::DiscreteLog {
            bits: DEFAULT_ELGAMAL_BITS,
        }
    }
}

/// A generated key pair of either scheme
#[derive(Debug)]
pub enum AsymmetricKeyPair {
    ElGamal(ElGamalKeyPair),
    Rsa(RsaKeyPair),
}

impl AsymmetricKeyPair {
    pub fn scheme(&self) -> EnvelopeScheme {
        match self {
            AsymmetricKeyPair::ElGamal(_) => EnvelopeScheme::ElGamal,
            AsymmetricKeyPair::Rsa(_) => EnvelopeScheme::RsaOaep,
        }
    }
}

/// Generate a key pair for the selected scheme using the OS random source
pub fn generate_keypair(params: EnvelopeParams) -> VaultResult<AsymmetricKeyPair> {
    match params {
        EnvelopeParams::DiscreteLog { bits } => {
            ElGamalKeyPair::generate(bits).map(AsymmetricKeyPair::ElGamal)
        }
        EnvelopeParams::Factoring { bits } => RsaKeyPair::generate(bits).map(AsymmetricKeyPair::Rsa),
    }
}

/// One secret sealed under one key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope<W> {
    pub wrapped_key: W,
    pub payload: SealedPayload,
}

/// Seal `plaintext` with a fresh one-time key wrapped under `public`
pub fn seal_hybrid<P: WrapKey>(
    public: &P,
    key_size: KeySize,
    plaintext: &[u8],
    associated_data: Option<&[u8]>,
) -> VaultResult<SealedEnvelope<P::Wrapped>> {
    let key = aead::generate_key(key_size);
    let payload = AeadVault::new(key.as_bytes())?.seal(plaintext, associated_data)?;
    let wrapped_key = public.wrap_key(key.as_bytes())?;
    Ok(SealedEnvelope {
        wrapped_key,
        payload,
    })
}

/// Open an envelope produced by [`seal_hybrid`]
pub fn open_hybrid<S: UnwrapKey>(
    private: &S,
    key_size: KeySize,
    envelope: &SealedEnvelope<S::Wrapped>,
    associated_data: Option<&[u8]>,
) -> VaultResult<SecureBytes> {
    let key = private.unwrap_key(&envelope.wrapped_key, key_size.len())?;
    if key.len() != key_size.len() {
        return Err(VaultError::unwrap_error(
            &private.scheme().to_string(),
            &format!("expected {} key bytes, got {}", key_size.len(), key.len()),
            error_codes::ENVELOPE_KEY_LENGTH_MISMATCH,
        ));
    }
    AeadVault::new(key.as_bytes())?.open(&envelope.payload, associated_data)
}

#[cfg(test)]
mod tests;
