//! Correlation secret for the authorization round-trip
//!
//! The secret is sent as the `state` parameter and must come back unchanged
//! on the redirect. It lives for one attempt only and is never persisted.

use rand::RngExt;

/// Characters a generated secret may contain.
pub const STATE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of a generated secret.
pub const STATE_LENGTH: usize = 12;

/// Generate a fresh correlation secret of [`STATE_LENGTH`] characters.
pub fn generate_state() -> String {
    let mut rng = rand::rng();
    (0..STATE_LENGTH)
        .map(|_| STATE_ALPHABET[rng.random_range(0..STATE_ALPHABET.len())] as char)
        .collect()
}
