/*!
 * facelock custody and access layer
 *
 * Core of a biometric console lock. Two kinds of secret are kept on disk:
 *
 * - The administrator password, sealed with AES-256-GCM under a one-time key
 *   that is wrapped with a per-setup El Gamal key pair
 * - Face templates, each sealed with AES-128-GCM under its own one-time key,
 *   all wrapped with one long-lived RSA-OAEP key pair
 *
 * The access monitor consumes the decrypted templates and drives a
 * `Locked` / `Unlocked` state machine with a grace period, reporting
 * transitions over a channel. Capture, face encoding and any user interface
 * are supplied by the caller.
 */

/// AES-GCM sealing with detached tags
pub mod aead;

/// Unlock state machine, evaluation loop and access log
pub mod access;

/// Runtime configuration and file layout
pub mod config;

/// Administrator password custody
pub mod custodian;

/// Asymmetric key wrapping (El Gamal and RSA-OAEP) and hybrid sealing
pub mod envelope;

/// Common error types
pub mod error;

/// Zeroize-on-drop containers for key material
pub mod secure_memory;

/// Atomic file persistence
pub mod storage;

/// Encrypted face template registry
pub mod vault;

pub use access::{AccessEvent, AccessLog, AccessState, AccessStateMachine, Monitor, MonitorEvent};
pub use config::{GateConfig, LoadPolicy};
pub use custodian::SecretCustodian;
pub use error::{VaultError, VaultResult};
pub use vault::{EncodingVault, FeatureVector, Template};

/// The types most callers need
pub mod prelude {
    pub use crate::access::{
        AccessEvent, AccessLog, AccessState, AccessStateMachine, CancellationToken, DistanceFn,
        EuclideanDistance, FeatureExtractor, FrameSource, GateSignal, Monitor, MonitorEvent,
    };
    pub use crate::aead::{AeadVault, KeySize, SealedPayload};
    pub use crate::config::{GateConfig, LoadPolicy};
    pub use crate::custodian::{CustodianState, PasswordPrompt, SecretCustodian};
    pub use crate::envelope::{open_hybrid, seal_hybrid, UnwrapKey, WrapKey};
    pub use crate::error::{VaultError, VaultResult};
    pub use crate::secure_memory::{SecureBytes, SecureString};
    pub use crate::vault::{EncodingVault, FeatureVector, LoadReport, Template};
}
