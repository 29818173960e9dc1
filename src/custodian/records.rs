//! On-disk layout of the administrator credential

use serde::{Deserialize, Serialize};

use crate::aead::SealedPayload;
use crate::envelope::{ElGamalCiphertext, ElGamalPublicKey, SealedEnvelope};

/// Serde adapter storing byte strings as lower-case hex
pub mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text.trim()).map_err(D::Error::custom)
    }
}

/// AES-GCM fields as stored in `admin_auth.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexSealedPayload {
    #[serde(with = "hex_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub tag: Vec<u8>,
}

impl From<SealedPayload> for HexSealedPayload {
    fn from(payload: SealedPayload) -> Self {
        Self {
            nonce: payload.nonce,
            ciphertext: payload.ciphertext,
            tag: payload.tag,
        }
    }
}

impl From<HexSealedPayload> for SealedPayload {
    fn from(record: HexSealedPayload) -> Self {
        Self {
            nonce: record.nonce,
            ciphertext: record.ciphertext,
            tag: record.tag,
        }
    }
}

/// The public credential record
///
/// Its presence means an administrator password has been configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCredentialRecord {
    pub elgamal_pub: ElGamalPublicKey,
    pub enc_aes_key: ElGamalCiphertext,
    pub aes_enc: HexSealedPayload,
}

impl AdminCredentialRecord {
    pub fn new(public: ElGamalPublicKey, envelope: SealedEnvelope<ElGamalCiphertext>) -> Self {
        Self {
            elgamal_pub: public,
            enc_aes_key: envelope.wrapped_key,
            aes_enc: envelope.payload.into(),
        }
    }

    pub fn envelope(&self) -> SealedEnvelope<ElGamalCiphertext> {
        SealedEnvelope {
            wrapped_key: self.enc_aes_key.clone(),
            payload: self.aes_enc.clone().into(),
        }
    }
}
