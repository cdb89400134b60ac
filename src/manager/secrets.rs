//! Password digests and share tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

/// Share tokens carry 256 bits of CSPRNG output.
const TOKEN_BYTES: usize = 32;

/// Lowercase hex SHA-256 of the UTF-8 password bytes.
pub fn hash_password(password: &str) -> String {
    hex::encode(digest::digest(&digest::SHA256, password.as_bytes()))
}

/// Check a supplied password against a stored digest. Plain equality, not constant time.
pub fn verify_password(supplied: &str, password_hash: &str) -> bool {
    hash_password(supplied) == password_hash
}

/// Generate an unguessable, URL-safe share token.
pub fn generate_share_token(rng: &SystemRandom) -> Result<String, ring::error::Unspecified> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
