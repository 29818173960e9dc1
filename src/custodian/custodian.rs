use std::path::PathBuf;

use super::records::AdminCredentialRecord;
use crate::aead::KeySize;
use crate::config::GateConfig;
use crate::envelope::{open_hybrid, seal_hybrid, ElGamalKeyPair, ElGamalPrivateKey};
use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::{SecureBytes, SecureString};
use crate::storage::{self, FileMode};

/// Configuration state of the administrator credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodianState {
    /// No password set; first-time setup is required
    Unconfigured,
    Configured,
}

/// Source of password entries for interactive verification
pub trait PasswordPrompt {
    /// Ask for a password; `None` means the user cancelled
    fn ask(&mut self, attempts_left: u32) -> Option<SecureString>;
}

impl<F> PasswordPrompt for F
where
    F: FnMut(u32) -> Option<SecureString>,
{
    fn ask(&mut self, attempts_left: u32) -> Option<SecureString> {
        self(attempts_left)
    }
}

/// Owner of the administrator password lifecycle
///
/// # Examples
///
/// ```no_run
/// use facelock::config::GateConfig;
/// use facelock::custodian::SecretCustodian;
///
/// let custodian = SecretCustodian::new(&GateConfig::with_data_dir("data"));
/// custodian.initialize("correct horse").unwrap();
/// assert!(custodian.verify("correct horse"));
/// assert!(!custodian.verify("battery staple"));
/// ```
#[derive(Debug, Clone)]
pub struct SecretCustodian {
    auth_path: PathBuf,
    private_path: PathBuf,
    elgamal_bits: usize,
    min_password_len: usize,
    max_attempts: u32,
}

impl SecretCustodian {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            auth_path: config.admin_auth_path(),
            private_path: config.elgamal_private_path(),
            elgamal_bits: config.elgamal_bits,
            min_password_len: config.min_password_len,
            max_attempts: config.max_password_attempts,
        }
    }

    /// Inspect the persisted files
    ///
    /// # Errors
    ///
    /// A credential record without its private key file is a fatal
    /// inconsistency and is reported as `PersistenceError`.
    pub fn state(&self) -> VaultResult<CustodianState> {
        match (self.auth_path.exists(), self.private_path.exists()) {
            (true, true) => Ok(CustodianState::Configured),
            (true, false) => Err(VaultError::persistence_error(
                &self.private_path,
                "credential record exists but its private key is missing",
                error_codes::CUSTODIAN_INCONSISTENT_STATE,
            )),
            (false, true) => {
                log::warn!(
                    "Ignoring orphaned private key {}",
                    self.private_path.display()
                );
                Ok(CustodianState::Unconfigured)
            }
            (false, false) => Ok(CustodianState::Unconfigured),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state(), Ok(CustodianState::Configured))
    }

    fn check_candidate(&self, candidate: &str) -> VaultResult<()> {
        let chars = candidate.chars().count();
        if chars < self.min_password_len {
            return Err(VaultError::InvalidParameter {
                parameter: "password".to_string(),
                expected: format!("at least {} characters", self.min_password_len),
                actual: format!("{} characters", chars),
                error_code: error_codes::CUSTODIAN_PASSWORD_TOO_SHORT,
            });
        }
        Ok(())
    }

    /// Seal `candidate` under a new key pair and persist it
    ///
    /// The credential record is written first, the private key second. If the
    /// second write fails the just-written record is removed again and a
    /// `PersistenceError` is returned; setup must then be retried from scratch.
    pub fn initialize(&self, candidate: &str) -> VaultResult<()> {
        self.check_candidate(candidate)?;

        let pair = ElGamalKeyPair::generate(self.elgamal_bits)?;
        let envelope = seal_hybrid(pair.public_key(), KeySize::Aes256, candidate.as_bytes(), None)?;
        let record = AdminCredentialRecord::new(pair.public_key().clone(), envelope);

        storage::write_json_atomic(&self.auth_path, &record, FileMode::Default)?;

        if let Err(e) =
            storage::write_json_atomic(&self.private_path, pair.private_key(), FileMode::OwnerOnly)
        {
            if let Err(cleanup) = storage::remove_if_exists(&self.auth_path) {
                log::error!(
                    "Credential record {} left without a private key: {}",
                    self.auth_path.display(),
                    cleanup
                );
            }
            return Err(VaultError::persistence_error(
                &self.private_path,
                &format!("private key not saved, setup must be repeated: {}", e),
                error_codes::PERSIST_PARTIAL_SETUP,
            ));
        }

        log::info!("Administrator password configured");
        Ok(())
    }

    /// First-time setup with a confirmation entry
    pub fn initialize_confirmed(&self, candidate: &str, confirmation: &str) -> VaultResult<()> {
        self.check_candidate(candidate)?;
        if candidate != confirmation {
            return Err(VaultError::InvalidParameter {
                parameter: "confirmation".to_string(),
                expected: "the same password twice".to_string(),
                actual: "a different password".to_string(),
                error_code: error_codes::CUSTODIAN_CONFIRMATION_MISMATCH,
            });
        }
        self.initialize(candidate)
    }

    fn open_password(&self) -> VaultResult<SecureBytes> {
        let record: AdminCredentialRecord = storage::read_json(&self.auth_path)?
            .ok_or_else(|| VaultError::NotConfigured("Administrator password".to_string()))?;
        let private: ElGamalPrivateKey = storage::read_json(&self.private_path)?.ok_or_else(|| {
            VaultError::persistence_error(
                &self.private_path,
                "private key missing",
                error_codes::CUSTODIAN_INCONSISTENT_STATE,
            )
        })?;

        if !private.matches(&record.elgamal_pub) {
            return Err(VaultError::unwrap_error(
                "ElGamal",
                "private key does not belong to the credential record",
                error_codes::ENVELOPE_UNWRAP_FAILED,
            ));
        }

        open_hybrid(&private, KeySize::Aes256, &record.envelope(), None)
    }

    /// Check `candidate` against the sealed password
    ///
    /// Every failure, including missing or damaged files, yields `false`.
    pub fn verify(&self, candidate: &str) -> bool {
        match self.open_password() {
            Ok(stored) => stored.ct_eq_bytes(candidate.as_bytes()),
            Err(e) => {
                log::debug!("Password check failed closed ({})", e.error_type());
                false
            }
        }
    }

    /// Prompt up to the configured number of attempts
    pub fn verify_interactive<P: PasswordPrompt>(&self, prompt: &mut P) -> bool {
        let stored = match self.open_password() {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Cannot load administrator credential: {}", e.error_type());
                return false;
            }
        };

        for attempt in 0..self.max_attempts {
            let entry = match prompt.ask(self.max_attempts - attempt) {
                Some(entry) => entry,
                None => return false,
            };
            if stored.ct_eq_bytes(entry.as_bytes()) {
                return true;
            }
            log::warn!(
                "Incorrect administrator password, {} attempts left",
                self.max_attempts - attempt - 1
            );
        }
        false
    }

    /// Replace the password after verifying the old one
    ///
    /// # Errors
    ///
    /// `AuthenticationFailure` if `old_password` does not verify; nothing is
    /// changed in that case.
    pub fn rotate(&self, old_password: &str, new_password: &str) -> VaultResult<()> {
        if !self.verify(old_password) {
            return Err(VaultError::AuthenticationFailure {
                operation: "password rotation".to_string(),
                error_code: error_codes::CUSTODIAN_VERIFICATION_FAILED,
            });
        }
        self.check_candidate(new_password)?;

        self.remove_material()?;
        self.initialize(new_password)?;
        log::info!("Administrator password rotated");
        Ok(())
    }

    /// Delete the credential record and private key
    pub fn remove_material(&self) -> VaultResult<()> {
        storage::remove_if_exists(&self.auth_path)?;
        storage::remove_if_exists(&self.private_path)?;
        Ok(())
    }

    /// Run first-time setup when unconfigured, otherwise verify interactively
    ///
    /// `setup` supplies a password and its confirmation. Returns whether the
    /// caller is now authenticated.
    pub fn ensure_and_verify<S, P>(&self, setup: S, prompt: &mut P) -> VaultResult<bool>
    where
        S: FnOnce() -> Option<(SecureString, SecureString)>,
        P: PasswordPrompt,
    {
        match self.state()? {
            CustodianState::Unconfigured => match setup() {
                Some((password, confirmation)) => {
                    self.initialize_confirmed(password.as_str(), confirmation.as_str())?;
                    Ok(true)
                }
                None => Ok(false),
            },
            CustodianState::Configured => Ok(self.verify_interactive(prompt)),
        }
    }
}
