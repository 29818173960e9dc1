use super::*;
use crate::config::GateConfig;
use crate::error::{error_codes, VaultError};
use crate::secure_memory::SecureString;
use std::fs;
use tempfile::{tempdir, TempDir};

fn fresh_custodian() -> (TempDir, GateConfig, SecretCustodian) {
    let dir = tempdir().unwrap();
    let mut config = GateConfig::with_data_dir(dir.path());
    config.elgamal_bits = 320;
    let custodian = SecretCustodian::new(&config);
    (dir, config, custodian)
}

#[test]
fn test_unconfigured_by_default() {
    let (_dir, _config, custodian) = fresh_custodian();
    assert_eq!(custodian.state().unwrap(), CustodianState::Unconfigured);
    assert!(!custodian.is_configured());
    assert!(!custodian.verify("anything"));
}

#[test]
fn test_initialize_and_verify() {
    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("s3cret!").unwrap();

    assert_eq!(custodian.state().unwrap(), CustodianState::Configured);
    assert!(custodian.verify("s3cret!"));
    assert!(!custodian.verify("s3cret"));
    assert!(!custodian.verify("S3cret!"));
    assert!(!custodian.verify(""));

    let record: serde_json::Value =
        serde_json::from_slice(&fs::read(config.admin_auth_path()).unwrap()).unwrap();
    for field in ["p", "g", "y"] {
        assert!(record["elgamal_pub"][field].is_string());
    }
    assert!(record["enc_aes_key"]["c1"].is_string());
    assert_eq!(record["aes_enc"]["nonce"].as_str().unwrap().len(), 24);
    assert_eq!(record["aes_enc"]["tag"].as_str().unwrap().len(), 32);

    let private: serde_json::Value =
        serde_json::from_slice(&fs::read(config.elgamal_private_path()).unwrap()).unwrap();
    assert!(private["x"].is_string());
    assert_eq!(private["p"], record["elgamal_pub"]["p"]);
}

#[cfg(unix)]
#[test]
fn test_private_key_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("pass1234").unwrap();
    let mode = fs::metadata(config.elgamal_private_path())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_short_password_is_rejected_without_writing() {
    let (_dir, config, custodian) = fresh_custodian();
    let result = custodian.initialize("abc");
    assert!(matches!(
        result,
        Err(VaultError::InvalidParameter { error_code, .. })
            if error_code == error_codes::CUSTODIAN_PASSWORD_TOO_SHORT
    ));
    assert!(!config.admin_auth_path().exists());
    assert!(!config.elgamal_private_path().exists());
}

#[test]
fn test_confirmation_mismatch() {
    let (_dir, _config, custodian) = fresh_custodian();
    let result = custodian.initialize_confirmed("password", "passw0rd");
    assert!(matches!(
        result,
        Err(VaultError::InvalidParameter { error_code, .. })
            if error_code == error_codes::CUSTODIAN_CONFIRMATION_MISMATCH
    ));
    assert!(!custodian.is_configured());
}

#[test]
fn test_rotate() {
    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("first-pass").unwrap();
    let before = fs::read(config.admin_auth_path()).unwrap();

    let result = custodian.rotate("wrong-pass", "second-pass");
    assert!(matches!(result, Err(VaultError::AuthenticationFailure { .. })));
    assert_eq!(fs::read(config.admin_auth_path()).unwrap(), before);
    assert!(custodian.verify("first-pass"));

    custodian.rotate("first-pass", "second-pass").unwrap();
    assert!(custodian.verify("second-pass"));
    assert!(!custodian.verify("first-pass"));
    assert_ne!(fs::read(config.admin_auth_path()).unwrap(), before);
}

#[test]
fn test_rotate_to_short_password_keeps_old() {
    let (_dir, _config, custodian) = fresh_custodian();
    custodian.initialize("first-pass").unwrap();
    assert!(custodian.rotate("first-pass", "no").is_err());
    assert!(custodian.verify("first-pass"));
}

#[test]
fn test_missing_private_key_is_inconsistent() {
    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("pass1234").unwrap();
    fs::remove_file(config.elgamal_private_path()).unwrap();

    assert!(matches!(
        custodian.state(),
        Err(VaultError::PersistenceError { error_code, .. })
            if error_code == error_codes::CUSTODIAN_INCONSISTENT_STATE
    ));
    assert!(!custodian.verify("pass1234"));
}

#[test]
fn test_tampered_record_fails_closed() {
    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("pass1234").unwrap();

    let path = config.admin_auth_path();
    let mut record: AdminCredentialRecord =
        serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    record.aes_enc.ciphertext[0] ^= 0x01;
    fs::write(&path, serde_json::to_vec(&record).unwrap()).unwrap();

    assert!(!custodian.verify("pass1234"));
}

#[test]
fn test_foreign_private_key_fails_closed() {
    let (_dir, config, custodian) = fresh_custodian();
    custodian.initialize("pass1234").unwrap();
    let first_private = fs::read(config.elgamal_private_path()).unwrap();

    let (_other_dir, other_config, other) = fresh_custodian();
    other.initialize("pass1234").unwrap();
    fs::copy(other_config.elgamal_private_path(), config.elgamal_private_path()).unwrap();

    assert!(!custodian.verify("pass1234"));
    assert_ne!(fs::read(config.elgamal_private_path()).unwrap(), first_private);
}

#[test]
fn test_partial_setup_cleans_up_record() {
    let (_dir, config, custodian) = fresh_custodian();
    // A non-empty directory at the private key path makes the rename fail
    let blocker = config.elgamal_private_path();
    fs::create_dir_all(blocker.join("occupied")).unwrap();

    let result = custodian.initialize("pass1234");
    assert!(matches!(
        result,
        Err(VaultError::PersistenceError { error_code, .. })
            if error_code == error_codes::PERSIST_PARTIAL_SETUP
    ));
    assert!(!config.admin_auth_path().exists());
}

#[test]
fn test_verify_interactive_retries() {
    let (_dir, _config, custodian) = fresh_custodian();
    custodian.initialize("open-sesame").unwrap();

    let mut asked = Vec::new();
    let mut entries = vec!["nope", "open-sesame"].into_iter();
    let mut prompt = |left: u32| {
        asked.push(left);
        entries.next().map(SecureString::from)
    };
    assert!(custodian.verify_interactive(&mut prompt));
    assert_eq!(asked, vec![3, 2]);

    let mut calls = 0;
    let mut always_wrong = |_left: u32| {
        calls += 1;
        Some(SecureString::from("wrong"))
    };
    assert!(!custodian.verify_interactive(&mut always_wrong));
    assert_eq!(calls, 3);

    let mut cancelled = |_left: u32| -> Option<SecureString> { None };
    assert!(!custodian.verify_interactive(&mut cancelled));
}

#[test]
fn test_ensure_and_verify_runs_setup_once() {
    let (_dir, _config, custodian) = fresh_custodian();
    let mut unused = |_left: u32| -> Option<SecureString> { panic!("prompt not expected") };

    let authenticated = custodian
        .ensure_and_verify(
            || Some((SecureString::from("new-admin"), SecureString::from("new-admin"))),
            &mut unused,
        )
        .unwrap();
    assert!(authenticated);
    assert!(custodian.is_configured());

    let mut prompt = |_left: u32| Some(SecureString::from("new-admin"));
    let authenticated = custodian
        .ensure_and_verify(|| panic!("setup not expected"), &mut prompt)
        .unwrap();
    assert!(authenticated);
}
