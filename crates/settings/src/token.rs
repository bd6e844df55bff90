//! Placeholder credential generation.
//!
//! When no credential is stored, a random token is generated and persisted;
//! the user then links it to the bot through [`link_url`].

use rand::Rng;

/// Token length in bytes (produces 64 hex characters).
pub const TOKEN_BYTES: usize = 32;

/// Generates a random token as a lowercase hex string.
pub fn generate_token<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Builds the link the user follows to bind `token` to their bot account.
pub fn link_url(base: &str, token: &str) -> String {
    format!("{base}{token}")
}
