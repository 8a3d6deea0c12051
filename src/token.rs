//! Verification token generation.

use rand::Rng;

/// Generate a random verification token.
///
/// Tokens are 32 bytes of CSPRNG output encoded as hex (64 characters),
/// so they are URL-safe without further escaping. Callers do not check
/// for collisions; the 256-bit space is the sole uniqueness guarantee.
pub fn token_generate() -> String {
    let mut rng = rand::rng();
    let token: [u8; 32] = rng.random();

    hex::encode(token)
}
