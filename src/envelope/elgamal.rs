//! El Gamal key envelope over a safe-prime group
//!
//! The modulus `p = 2q + 1` is a safe prime and `g` generates the full
//! multiplicative group of order `p - 1`. A symmetric key is encoded as a
//! big-endian integer `m < p` and encrypted as `(g^k, m * y^k) mod p` with a
//! fresh ephemeral exponent `k` coprime to `p - 1`.

use std::fmt;

use num_bigint_dig::{prime::probably_prime, BigUint, RandBigInt, RandPrime};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::{EnvelopeScheme, UnwrapKey, WrapKey};
use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::SecureBytes;

/// Default modulus size in bits
pub const DEFAULT_ELGAMAL_BITS: usize = 512;

/// Smallest modulus accepted for key generation
pub const MIN_ELGAMAL_BITS: usize = 128;

/// Upper bound on ephemeral exponent draws before giving up
pub const COPRIME_MAX_ATTEMPTS: usize = 128;

const PRIME_TEST_ROUNDS: usize = 20;

/// Serde adapter storing big integers as lower-case hex strings
pub mod hex_int {
    use num_bigint_dig::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.trim().as_bytes(), 16)
            .ok_or_else(|| D::Error::custom(format!("invalid hex integer '{}'", text)))
    }
}

/// Public parameters `(p, g, y)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalPublicKey {
    #[serde(with = "hex_int")]
    pub p: BigUint,
    #[serde(with = "hex_int")]
    pub g: BigUint,
    #[serde(with = "hex_int")]
    pub y: BigUint,
}

/// Private parameters `(p, g, x)`; `y` is recomputed on demand
#[derive(Clone, Serialize, Deserialize)]
pub struct ElGamalPrivateKey {
    #[serde(with = "hex_int")]
    pub p: BigUint,
    #[serde(with = "hex_int")]
    pub g: BigUint,
    #[serde(with = "hex_int")]
    x: BigUint,
}

/// Two-component El Gamal ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalCiphertext {
    #[serde(with = "hex_int")]
    pub c1: BigUint,
    #[serde(with = "hex_int")]
    pub c2: BigUint,
}

/// Generated El Gamal key pair
#[derive(Debug, Clone)]
pub struct ElGamalKeyPair {
    public: ElGamalPublicKey,
    private: ElGamalPrivateKey,
}

impl fmt::Debug for ElGamalPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElGamalPrivateKey")
            .field("bits", &self.p.bits())
            .field("x", &"[REDACTED]")
            .finish()
    }
}

impl Drop for ElGamalPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl ElGamalPrivateKey {
    /// Recompute the matching public key
    pub fn public_key(&self) -> ElGamalPublicKey {
        ElGamalPublicKey {
            p: self.p.clone(),
            g: self.g.clone(),
            y: self.g.modpow(&self.x, &self.p),
        }
    }

    /// Whether this private key belongs to `public`
    pub fn matches(&self, public: &ElGamalPublicKey) -> bool {
        self.public_key() == *public
    }
}

impl ElGamalKeyPair {
    /// Generate a safe-prime group of `bits` bits, a generator and a secret
    /// exponent
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if `bits` is below [`MIN_ELGAMAL_BITS`]
    pub fn generate(bits: usize) -> VaultResult<Self> {
        if bits < MIN_ELGAMAL_BITS {
            return Err(VaultError::invalid_parameter(
                "elgamal_bits",
                &format!("at least {}", MIN_ELGAMAL_BITS),
                &bits.to_string(),
            ));
        }

        let mut rng = OsRng;
        let (p, q) = generate_safe_prime(&mut rng, bits);
        let one = BigUint::one();
        let two = BigUint::from(2u32);
        let p_minus_1 = &p - &one;

        let g = loop {
            let candidate = rng.gen_biguint_range(&two, &p_minus_1);
            if candidate.modpow(&two, &p) != one && candidate.modpow(&q, &p) != one {
                break candidate;
            }
        };

        let x = rng.gen_biguint_range(&two, &p_minus_1);
        let y = g.modpow(&x, &p);

        log::debug!("Generated {}-bit El Gamal group", p.bits());

        Ok(Self {
            public: ElGamalPublicKey {
                p: p.clone(),
                g: g.clone(),
                y,
            },
            private: ElGamalPrivateKey { p, g, x },
        })
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &ElGamalPrivateKey {
        &self.private
    }

    pub fn into_parts(self) -> (ElGamalPublicKey, ElGamalPrivateKey) {
        (self.public, self.private)
    }
}

/// Search for `p = 2q + 1` with both `p` and `q` prime and `p` exactly
/// `bits` bits long
fn generate_safe_prime(rng: &mut OsRng, bits: usize) -> (BigUint, BigUint) {
    loop {
        let q = rng.gen_prime(bits - 1);
        let p = q.clone() * 2u32 + 1u32;
        if p.bits() == bits && probably_prime(&p, PRIME_TEST_ROUNDS) {
            return (p, q);
        }
    }
}

impl WrapKey for ElGamalPublicKey {
    type Wrapped = ElGamalCiphertext;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::ElGamal
    }

    fn wrap_key(&self, symmetric_key: &[u8]) -> VaultResult<ElGamalCiphertext> {
        if symmetric_key.is_empty() || symmetric_key.len() * 8 >= self.p.bits() {
            return Err(VaultError::invalid_parameter(
                "symmetric_key",
                &format!("1..{} bits", self.p.bits() - 1),
                &format!("{} bits", symmetric_key.len() * 8),
            ));
        }

        let one = BigUint::one();
        let p_minus_1 = &self.p - &one;
        let mut rng = OsRng;

        let mut k = (0..COPRIME_MAX_ATTEMPTS)
            .map(|_| rng.gen_biguint_range(&one, &p_minus_1))
            .find(|k| k.gcd(&p_minus_1).is_one())
            .ok_or_else(|| {
                VaultError::crypto_error(
                    "El Gamal wrap",
                    "no ephemeral exponent coprime to the group order",
                    error_codes::ENVELOPE_COPRIME_EXHAUSTED,
                )
            })?;

        let mut m = BigUint::from_bytes_be(symmetric_key);
        let c1 = self.g.modpow(&k, &self.p);
        let c2 = (&m * &self.y.modpow(&k, &self.p)) % &self.p;

        k.zeroize();
        m.zeroize();

        Ok(ElGamalCiphertext { c1, c2 })
    }
}

impl UnwrapKey for ElGamalPrivateKey {
    type Wrapped = ElGamalCiphertext;

    fn scheme(&self) -> EnvelopeScheme {
        EnvelopeScheme::ElGamal
    }

    /// Recover a key of exactly `expected_len` bytes
    ///
    /// The decoded integer drops leading zero bytes, so a shorter value is
    /// left-padded back to `expected_len`. That is the only relaxation of the
    /// exact-length rule: a wider value is an `UnwrapError`, and a padded key
    /// that was not the sealed one still fails the AES-GCM tag check.
    fn unwrap_key(
        &self,
        wrapped: &ElGamalCiphertext,
        expected_len: usize,
    ) -> VaultResult<SecureBytes> {
        let scheme = self.scheme().to_string();
        let in_range = |c: &BigUint| !c.is_zero() && *c < self.p;
        if !in_range(&wrapped.c1) || !in_range(&wrapped.c2) {
            return Err(VaultError::unwrap_error(
                &scheme,
                "ciphertext component outside the group",
                error_codes::ENVELOPE_UNWRAP_FAILED,
            ));
        }

        // s^-1 = s^(p-2) mod p since p is prime
        let p_minus_2 = &self.p - BigUint::from(2u32);
        let mut s = wrapped.c1.modpow(&self.x, &self.p);
        let mut s_inv = s.modpow(&p_minus_2, &self.p);
        let mut m = (&wrapped.c2 * &s_inv) % &self.p;
        let mut bytes = m.to_bytes_be();
        s.zeroize();
        s_inv.zeroize();
        m.zeroize();

        if bytes.len() > expected_len {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(VaultError::unwrap_error(
                &scheme,
                &format!("decoded key is {} bytes, expected {}", actual, expected_len),
                error_codes::ENVELOPE_KEY_LENGTH_MISMATCH,
            ));
        }

        // Leading zero bytes are lost in the integer encoding
        let mut key = SecureBytes::zeroed(expected_len);
        key.as_bytes_mut()[expected_len - bytes.len()..].copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(key)
    }
}
