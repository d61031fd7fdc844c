use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Well-formed credential with the default Argon2id parameters that no
/// password matches. Verifying against it costs the same as a real check.
pub const DUMMY_CREDENTIAL: &str = concat!(
    "$argon2id$v=19$m=19456,t=2,p=1$",
    "CyVHaDn0XXYWAXep0adwVA$QE61I/ONnqRPpdtNuS9DfXGjTUuqgMLDDAB5EnFpbHk",
);

/// Hash a raw password with Argon2id and a fresh random salt.
/// Two calls with the same input yield different credentials; compare with
/// [`verify_password`], never with `==`.
pub fn hash_password(raw: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;

    Ok(hash.to_string())
}

/// Check a raw password against a stored credential.
/// Malformed credentials verify as `false`, same as a wrong password.
pub fn verify_password(raw: &str, credential: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(credential) else {
        return false;
    };

    Argon2::default()
        .verify_password(raw.as_bytes(), &parsed)
        .is_ok()
}
