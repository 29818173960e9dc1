use super::*;
use crate::error::VaultError;
use proptest::prelude::*;

#[test]
fn test_seal_open_aes256() {
    let key = generate_key(KeySize::Aes256);
    let plaintext = b"administrator password";

    let sealed = seal(key.as_bytes(), plaintext).unwrap();
    assert_eq!(sealed.nonce.len(), NONCE_LEN);
    assert_eq!(sealed.tag.len(), TAG_LEN);
    assert_ne!(&sealed.ciphertext[..], &plaintext[..]);

    let opened = open(key.as_bytes(), &sealed.nonce, &sealed.ciphertext, &sealed.tag).unwrap();
    assert_eq!(opened.as_bytes(), plaintext);
}

#[test]
fn test_seal_open_aes128() {
    let key = generate_key(KeySize::Aes128);
    let vault = AeadVault::new(key.as_bytes()).unwrap();
    assert_eq!(vault.key_size(), KeySize::Aes128);

    let sealed = vault.seal(b"feature bytes", None).unwrap();
    let opened = vault.open(&sealed, None).unwrap();
    assert_eq!(opened.as_bytes(), b"feature bytes");
}

#[test]
fn test_fresh_nonce_per_seal() {
    let key = generate_key(KeySize::Aes256);
    let vault = AeadVault::new(key.as_bytes()).unwrap();

    let a = vault.seal(b"same message", None).unwrap();
    let b = vault.seal(b"same message", None).unwrap();
    assert_ne!(a.nonce, b.nonce);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn test_invalid_key_length() {
    let result = AeadVault::new(&[0u8; 24]);
    assert!(matches!(result, Err(VaultError::CryptoError { .. })));
}

#[test]
fn test_wrong_key_is_authentication_failure() {
    let key = generate_key(KeySize::Aes256);
    let other = generate_key(KeySize::Aes256);
    let sealed = seal(key.as_bytes(), b"secret").unwrap();

    let result = open(other.as_bytes(), &sealed.nonce, &sealed.ciphertext, &sealed.tag);
    assert!(matches!(result, Err(VaultError::AuthenticationFailure { .. })));
}

#[test]
fn test_associated_data_is_bound() {
    let key = generate_key(KeySize::Aes128);
    let vault = AeadVault::new(key.as_bytes()).unwrap();
    let sealed = vault.seal(b"template", Some(&b"alice"[..])).unwrap();

    assert!(vault.open(&sealed, Some(&b"alice"[..])).is_ok());
    assert!(vault.open(&sealed, Some(&b"bob"[..])).is_err());
    assert!(vault.open(&sealed, None).is_err());
}

#[test]
fn test_bad_nonce_and_tag_lengths() {
    let key = generate_key(KeySize::Aes256);
    let vault = AeadVault::new(key.as_bytes()).unwrap();
    let mut sealed = vault.seal(b"data", None).unwrap();

    let mut short_tag = sealed.clone();
    short_tag.tag.pop();
    assert!(matches!(
        vault.open(&short_tag, None),
        Err(VaultError::InvalidParameter { .. })
    ));

    sealed.nonce.push(0);
    assert!(matches!(
        vault.open(&sealed, None),
        Err(VaultError::InvalidParameter { .. })
    ));
}

#[test]
fn test_empty_plaintext() {
    let key = generate_key(KeySize::Aes256);
    let sealed = seal(key.as_bytes(), b"").unwrap();
    assert!(sealed.ciphertext.is_empty());
    let opened = open(key.as_bytes(), &sealed.nonce, &sealed.ciphertext, &sealed.tag).unwrap();
    assert!(opened.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_round_trip(plaintext in proptest::collection::vec(any::<u8>(), 0..256)) {
        let key = generate_key(KeySize::Aes256);
        let sealed = seal(key.as_bytes(), &plaintext).unwrap();
        let opened = open(key.as_bytes(), &sealed.nonce, &sealed.ciphertext, &sealed.tag).unwrap();
        prop_assert_eq!(opened.as_bytes(), &plaintext[..]);
    }

    #[test]
    fn prop_any_bit_flip_fails(
        plaintext in proptest::collection::vec(any::<u8>(), 1..128),
        bit in any::<usize>(),
        in_tag in any::<bool>(),
    ) {
        let key = generate_key(KeySize::Aes128);
        let mut sealed = seal(key.as_bytes(), &plaintext).unwrap();

        let target = if in_tag { &mut sealed.tag } else { &mut sealed.ciphertext };
        let bit = bit % (target.len() * 8);
        target[bit / 8] ^= 1 << (bit % 8);

        let result = open(key.as_bytes(), &sealed.nonce, &sealed.ciphertext, &sealed.tag);
        let failed_closed = matches!(result, Err(VaultError::AuthenticationFailure { .. }));
        prop_assert!(failed_closed);
    }
}
