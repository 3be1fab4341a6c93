//! Session token generation.

use rand::Rng;

use crate::SessionToken;

/// Generates a fresh session token.
///
/// 16 bytes come from `rand::rng()`, a CSPRNG seeded from the operating
/// system, and are stamped with the UUID v4 version and variant bits. That
/// leaves 122 random bits, so a collision between live sessions is not a
/// practical concern and no uniqueness check is made against the store.
pub fn generate_token() -> SessionToken {
    let bytes: [u8; 16] = rand::rng().random();
    SessionToken::from_uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
}
