use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::SealedPayload;
use crate::envelope::SealedEnvelope;
use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::SecureBytes;

/// dtype tag written for `f64` little-endian vectors
pub const FLOAT64_DTYPE: &str = "float64";

/// One biometric sample
///
/// Decrypted vectors are zeroed when dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shape metadata stored next to the ciphertext
    pub fn shape(&self) -> Vec<usize> {
        vec![self.0.len()]
    }

    /// Little-endian `f64` encoding
    pub fn to_bytes(&self) -> SecureBytes {
        let mut bytes = SecureBytes::zeroed(self.0.len() * 8);
        for (chunk, value) in bytes.as_bytes_mut().chunks_exact_mut(8).zip(&self.0) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Decode bytes produced by [`FeatureVector::to_bytes`], checking them
    /// against the stored shape and dtype
    pub fn from_bytes(bytes: &[u8], shape: &[usize], dtype: &str) -> VaultResult<Self> {
        if dtype != FLOAT64_DTYPE {
            return Err(VaultError::InvalidParameter {
                parameter: "dtype".to_string(),
                expected: FLOAT64_DTYPE.to_string(),
                actual: dtype.to_string(),
                error_code: error_codes::VAULT_SHAPE_MISMATCH,
            });
        }

        // The shape is read back from disk and may be arbitrary
        let expected_len = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .and_then(|elements| elements.checked_mul(8));
        match expected_len {
            Some(len) if !shape.is_empty() && len == bytes.len() => {}
            _ => {
                return Err(VaultError::InvalidParameter {
                    parameter: "shape".to_string(),
                    expected: match expected_len {
                        Some(len) => format!("{} bytes for shape {:?}", len, shape),
                        None => format!("a representable size for shape {:?}", shape),
                    },
                    actual: format!("{} bytes", bytes.len()),
                    error_code: error_codes::VAULT_SHAPE_MISMATCH,
                });
            }
        }

        let values = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();
        Ok(Self(values))
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Serde adapter storing byte strings as standard base64
pub mod base64_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::decode(text.trim()).map_err(D::Error::custom)
    }
}

/// Sealed feature vector as stored under `users.<identity>.encoding`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedTemplate {
    /// RSA-OAEP wrapped one-time key
    #[serde(with = "base64_bytes")]
    pub aes_key: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub cipher: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub tag: Vec<u8>,
    pub shape: Vec<usize>,
    pub dtype: String,
}

impl EncodedTemplate {
    pub fn new(envelope: SealedEnvelope<Vec<u8>>, shape: Vec<usize>) -> Self {
        Self {
            aes_key: envelope.wrapped_key,
            nonce: envelope.payload.nonce,
            cipher: envelope.payload.ciphertext,
            tag: envelope.payload.tag,
            shape,
            dtype: FLOAT64_DTYPE.to_string(),
        }
    }

    pub fn envelope(&self) -> SealedEnvelope<Vec<u8>> {
        SealedEnvelope {
            wrapped_key: self.aes_key.clone(),
            payload: SealedPayload {
                nonce: self.nonce.clone(),
                ciphertext: self.cipher.clone(),
                tag: self.tag.clone(),
            },
        }
    }
}

/// Opaque per-user metadata
pub type TemplateMeta = BTreeMap<String, serde_json::Value>;

/// One registered identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub encoding: EncodedTemplate,
    #[serde(default)]
    pub meta: TemplateMeta,
}

impl TemplateRecord {
    /// Decode one stored record, reporting any malformed field as
    /// `CorruptTemplate` for `identity`
    pub fn from_value(identity: &str, value: &serde_json::Value) -> VaultResult<Self> {
        TemplateRecord::deserialize(value)
            .map_err(|e| VaultError::corrupt_template(identity, &e.to_string()))
    }
}

/// Contents of the template database file
///
/// Records stay as raw JSON until one is needed, so a damaged entry only
/// affects its own identity and is written back untouched by `register`
/// and `delete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDatabase {
    #[serde(default)]
    pub users: BTreeMap<String, serde_json::Value>,
}

impl TemplateDatabase {
    pub fn record(&self, identity: &str) -> Option<VaultResult<TemplateRecord>> {
        self.users
            .get(identity)
            .map(|value| TemplateRecord::from_value(identity, value))
    }

    /// Store `record`, returning whether an entry was replaced
    pub fn insert(&mut self, identity: &str, record: &TemplateRecord) -> VaultResult<bool> {
        let value = serde_json::to_value(record)?;
        Ok(self.users.insert(identity.to_string(), value).is_some())
    }
}

/// A decrypted template bound to its identity
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub identity: String,
    pub vector: FeatureVector,
}
