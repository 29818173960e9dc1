//! Runtime configuration
//!
//! All tunables of the custody layer and the access monitor, with the
//! defaults the gate ships with. A JSON file may override any subset of
//! fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::envelope::{DEFAULT_ELGAMAL_BITS, DEFAULT_RSA_BITS, MIN_ELGAMAL_BITS, MIN_RSA_BITS};
use crate::error::{VaultError, VaultResult};
use crate::storage;

pub const ADMIN_AUTH_FILE: &str = "admin_auth.json";
pub const ELGAMAL_PRIVATE_FILE: &str = "elgamal_priv.json";
pub const TEMPLATE_DB_FILE: &str = "faces.json";
pub const RSA_PRIVATE_FILE: &str = "private.pem";
pub const RSA_PUBLIC_FILE: &str = "public.pem";
pub const ACCESS_LOG_FILE: &str = "logs.json";

/// How the template vault reacts to undecryptable records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Skip and log corrupt records, load the rest
    SkipCorrupt,
    /// Fail the whole load on the first corrupt record
    Strict,
}

/// Gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Directory holding every persisted file
    pub data_dir: PathBuf,
    /// Face distance below which a probe matches a template
    pub tolerance: f64,
    /// Seconds the gate stays unlocked after the last match
    pub grace_seconds: f64,
    /// El Gamal modulus size for the admin credential
    pub elgamal_bits: usize,
    /// RSA modulus size for the template vault
    pub rsa_bits: usize,
    /// Minimum administrator password length in characters
    pub min_password_len: usize,
    /// Attempts allowed by interactive verification
    pub max_password_attempts: u32,
    pub load_policy: LoadPolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tolerance: 0.5,
            grace_seconds: 2.0,
            elgamal_bits: DEFAULT_ELGAMAL_BITS,
            rsa_bits: DEFAULT_RSA_BITS,
            min_password_len: 4,
            max_password_attempts: 3,
            load_policy: LoadPolicy::SkipCorrupt,
        }
    }
}

impl GateConfig {
    /// Defaults rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: &Path) -> VaultResult<Self> {
        let config: GateConfig = storage::read_json(path)?.ok_or_else(|| {
            VaultError::invalid_parameter(
                "config",
                "an existing configuration file",
                &path.display().to_string(),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> VaultResult<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(VaultError::invalid_parameter(
                "tolerance",
                "a positive number",
                &self.tolerance.to_string(),
            ));
        }
        if !(self.grace_seconds.is_finite() && self.grace_seconds >= 0.0) {
            return Err(VaultError::invalid_parameter(
                "grace_seconds",
                "a non-negative number",
                &self.grace_seconds.to_string(),
            ));
        }
        // The 32-byte password key must fit below the modulus
        if self.elgamal_bits < MIN_ELGAMAL_BITS.max(32 * 8 + 8) {
            return Err(VaultError::invalid_parameter(
                "elgamal_bits",
                "at least 264",
                &self.elgamal_bits.to_string(),
            ));
        }
        if self.rsa_bits < MIN_RSA_BITS {
            return Err(VaultError::invalid_parameter(
                "rsa_bits",
                &format!("at least {}", MIN_RSA_BITS),
                &self.rsa_bits.to_string(),
            ));
        }
        if self.max_password_attempts == 0 {
            return Err(VaultError::invalid_parameter(
                "max_password_attempts",
                "at least 1",
                "0",
            ));
        }
        Ok(())
    }

    pub fn admin_auth_path(&self) -> PathBuf {
        self.data_dir.join(ADMIN_AUTH_FILE)
    }

    pub fn elgamal_private_path(&self) -> PathBuf {
        self.data_dir.join(ELGAMAL_PRIVATE_FILE)
    }

    pub fn template_db_path(&self) -> PathBuf {
        self.data_dir.join(TEMPLATE_DB_FILE)
    }

    pub fn rsa_private_path(&self) -> PathBuf {
        self.data_dir.join(RSA_PRIVATE_FILE)
    }

    pub fn rsa_public_path(&self) -> PathBuf {
        self.data_dir.join(RSA_PUBLIC_FILE)
    }

    pub fn access_log_path(&self) -> PathBuf {
        self.data_dir.join(ACCESS_LOG_FILE)
    }
}
