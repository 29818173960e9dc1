/*!
 * Secret custodian for the administrator password
 *
 * The password is sealed with AES-256-GCM under a one-time key, and that key
 * is wrapped with a freshly generated El Gamal key pair. The public record
 * and the private key are persisted as two separate files; the private key
 * file is readable by its owner only.
 */

mod custodian;
mod records;

pub use custodian::*;
pub use records::*;

#[cfg(test)]
mod tests;
