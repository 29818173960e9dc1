/*!
 * Encoding vault for biometric templates
 *
 * Every feature vector is sealed with AES-128-GCM under its own one-time
 * key; all one-time keys are wrapped with a single RSA-OAEP key pair that is
 * generated on first registration and reused afterwards. Records carry
 * shape and dtype metadata so they decode without outside knowledge.
 */

mod template;
mod vault;

pub use template::*;
pub use vault::*;
