use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Argon2id with the crate's default cost; every hash and check goes through it.
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Fresh random salt per call; returns the PHC string stored as `passwordHash`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow::anyhow!("could not hash password: {e}"))
}

/// `Ok(false)` on mismatch; `Err` when the stored value is not a usable hash.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let phc = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("stored password hash is not a PHC string: {e}"))?;
    match hasher().verify_password(plain.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("could not check password: {e}")),
    }
}
