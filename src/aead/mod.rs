/*!
 * AEAD vault for symmetric authenticated encryption
 *
 * This module seals and opens arbitrary byte payloads with AES-GCM under a
 * one-time symmetric key. AES-256 is used for 32-byte keys and AES-128 for
 * 16-byte keys; the nonce and tag are kept apart from the ciphertext so they
 * can be persisted as separate fields.
 */

mod aead;

pub use aead::*;

#[cfg(test)]
mod tests;
