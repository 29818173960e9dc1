use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Deserialize;

use super::template::{
    EncodedTemplate, FeatureVector, Template, TemplateDatabase, TemplateMeta, TemplateRecord,
};
use crate::aead::KeySize;
use crate::config::{GateConfig, LoadPolicy};
use crate::envelope::{open_hybrid, seal_hybrid, RsaKeyPair};
use crate::error::{error_codes, VaultError, VaultResult};
use crate::storage::{self, FileMode};

/// Outcome of [`EncodingVault::load_all`]
#[derive(Debug, Default)]
pub struct LoadReport {
    pub templates: Vec<Template>,
    /// Identities whose records could not be opened
    pub corrupt: Vec<String>,
}

impl LoadReport {
    pub fn corrupt_count(&self) -> usize {
        self.corrupt.len()
    }
}

/// Registry of sealed face templates
#[derive(Debug, Clone)]
pub struct EncodingVault {
    db_path: PathBuf,
    private_path: PathBuf,
    public_path: PathBuf,
    rsa_bits: usize,
    load_policy: LoadPolicy,
}

impl EncodingVault {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            db_path: config.template_db_path(),
            private_path: config.rsa_private_path(),
            public_path: config.rsa_public_path(),
            rsa_bits: config.rsa_bits,
            load_policy: config.load_policy,
        }
    }

    /// Read the shared key pair, `None` if it was never generated
    fn load_keypair(&self) -> VaultResult<Option<RsaKeyPair>> {
        let private = storage::read_optional(&self.private_path)?;
        let public = storage::read_optional(&self.public_path)?;

        match (private, public) {
            (Some(private), Some(public)) => {
                let private = String::from_utf8(private)
                    .map_err(|e| VaultError::SerializationError(e.to_string()))?;
                let public = String::from_utf8(public)
                    .map_err(|e| VaultError::SerializationError(e.to_string()))?;
                RsaKeyPair::from_pem(&private, &public).map(Some)
            }
            (None, None) => Ok(None),
            (Some(_), None) => Err(VaultError::persistence_error(
                &self.public_path,
                "vault public key missing",
                error_codes::PERSIST_READ_FAILED,
            )),
            (None, Some(_)) => Err(VaultError::persistence_error(
                &self.private_path,
                "vault private key missing",
                error_codes::PERSIST_READ_FAILED,
            )),
        }
    }

    fn load_or_create_keypair(&self) -> VaultResult<RsaKeyPair> {
        if let Some(pair) = self.load_keypair()? {
            return Ok(pair);
        }

        log::info!("No vault keys found, generating a {}-bit RSA key pair", self.rsa_bits);
        let pair = RsaKeyPair::generate(self.rsa_bits)?;
        let private_pem = pair.private_pem()?;
        storage::write_atomic(&self.private_path, private_pem.as_bytes(), FileMode::OwnerOnly)?;

        if let Err(e) = storage::write_atomic(
            &self.public_path,
            pair.public_pem()?.as_bytes(),
            FileMode::Default,
        ) {
            if let Err(cleanup) = storage::remove_if_exists(&self.private_path) {
                log::error!("Vault private key left without public key: {}", cleanup);
            }
            return Err(e);
        }
        Ok(pair)
    }

    fn read_database(&self) -> VaultResult<TemplateDatabase> {
        Ok(storage::read_json(&self.db_path)?.unwrap_or_default())
    }

    /// Seal and store `vector` for `identity`, replacing any previous record
    pub fn register(&self, identity: &str, vector: &FeatureVector) -> VaultResult<()> {
        self.register_with_meta(identity, vector, TemplateMeta::new())
    }

    pub fn register_with_meta(
        &self,
        identity: &str,
        vector: &FeatureVector,
        meta: TemplateMeta,
    ) -> VaultResult<()> {
        if identity.trim().is_empty() {
            return Err(VaultError::InvalidParameter {
                parameter: "identity".to_string(),
                expected: "a non-empty name".to_string(),
                actual: format!("{:?}", identity),
                error_code: error_codes::VAULT_INVALID_IDENTITY,
            });
        }
        if vector.is_empty() || !vector.as_slice().iter().all(|v| v.is_finite()) {
            return Err(VaultError::invalid_parameter(
                "feature_vector",
                "a non-empty vector of finite values",
                &format!("{} values", vector.len()),
            ));
        }

        let pair = self.load_or_create_keypair()?;
        let plaintext = vector.to_bytes();
        let envelope = seal_hybrid(
            pair.public_key(),
            KeySize::Aes128,
            plaintext.as_bytes(),
            Some(identity.as_bytes()),
        )?;

        let mut database = self.read_database()?;
        let record = TemplateRecord {
            encoding: EncodedTemplate::new(envelope, vector.shape()),
            meta,
        };
        let replaced = database.insert(identity, &record)?;
        storage::write_json_atomic(&self.db_path, &database, FileMode::Default)?;

        if replaced {
            log::info!("Replaced template for '{}'", identity);
        } else {
            log::info!("Registered template for '{}'", identity);
        }
        Ok(())
    }

    fn open_record(
        &self,
        pair: &RsaKeyPair,
        identity: &str,
        value: &serde_json::Value,
    ) -> VaultResult<FeatureVector> {
        let record = TemplateRecord::from_value(identity, value)?;
        let encoding = &record.encoding;
        let plaintext = open_hybrid(
            pair.private_key(),
            KeySize::Aes128,
            &encoding.envelope(),
            Some(identity.as_bytes()),
        )?;
        FeatureVector::from_bytes(plaintext.as_bytes(), &encoding.shape, &encoding.dtype)
    }

    /// Decrypt every stored template
    ///
    /// Each record is decoded on its own. Under [`LoadPolicy::SkipCorrupt`]
    /// a record that is malformed or fails to open is logged and listed in
    /// [`LoadReport::corrupt`]; under
    /// [`LoadPolicy::Strict`] the first such record aborts the load with
    /// `CorruptTemplate`.
    pub fn load_all(&self) -> VaultResult<LoadReport> {
        let database = self.read_database()?;
        let mut report = LoadReport::default();
        if database.users.is_empty() {
            return Ok(report);
        }

        let pair = self.load_keypair()?.ok_or_else(|| {
            VaultError::persistence_error(
                &self.private_path,
                "templates exist but the vault key pair is missing",
                error_codes::PERSIST_READ_FAILED,
            )
        })?;

        for (identity, value) in &database.users {
            match self.open_record(&pair, identity, value) {
                Ok(vector) => report.templates.push(Template {
                    identity: identity.clone(),
                    vector,
                }),
                Err(e) => {
                    if self.load_policy == LoadPolicy::Strict {
                        return Err(match e {
                            VaultError::CorruptTemplate { .. } => e,
                            other => VaultError::corrupt_template(identity, &other.to_string()),
                        });
                    }
                    log::warn!("Skipping corrupt template for '{}': {}", identity, e);
                    report.corrupt.push(identity.clone());
                }
            }
        }

        log::info!(
            "Loaded {} templates ({} skipped)",
            report.templates.len(),
            report.corrupt_count()
        );
        Ok(report)
    }

    /// Remove the record for `identity`; returns whether one existed
    pub fn delete(&self, identity: &str) -> VaultResult<bool> {
        let mut database = self.read_database()?;
        if database.users.remove(identity).is_none() {
            return Ok(false);
        }
        storage::write_json_atomic(&self.db_path, &database, FileMode::Default)?;
        log::info!("Deleted template for '{}'", identity);
        Ok(true)
    }

    pub fn list_identities(&self) -> VaultResult<BTreeSet<String>> {
        Ok(self.read_database()?.users.into_keys().collect())
    }

    /// Metadata stored with `identity`, if registered
    ///
    /// Only the `meta` field is decoded, so it stays readable when the
    /// sealed encoding next to it is damaged.
    pub fn meta(&self, identity: &str) -> VaultResult<Option<TemplateMeta>> {
        let database = self.read_database()?;
        let value = match database.users.get(identity) {
            Some(value) => value,
            None => return Ok(None),
        };
        match value.get("meta") {
            None | Some(serde_json::Value::Null) => Ok(Some(TemplateMeta::new())),
            Some(meta) => TemplateMeta::deserialize(meta)
                .map(Some)
                .map_err(|e| VaultError::corrupt_template(identity, &e.to_string())),
        }
    }
}
