//! Random key material for test and demo provisioning.
//!
//! Keys produced here come from a general-purpose random source with no
//! guaranteed cryptographic strength. They are a convenience for filling in
//! fields an operator left blank, not a security primitive: provision real
//! devices with keys from a proper key-management process.

use rand::Rng;

/// Generate `byte_count` random bytes rendered as uppercase hex.
///
/// The result is always exactly `2 * byte_count` characters, zero-padded per
/// byte. A byte count of zero yields an empty string.
pub fn generate(byte_count: usize) -> String {
    generate_with(&mut rand::thread_rng(), byte_count)
}

/// Same as [`generate`] but drawing from the given random source.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, byte_count: usize) -> String {
    let bytes: Vec<u8> = (0..byte_count).map(|_| rng.gen::<u8>()).collect();
    hex::encode_upper(bytes)
}
