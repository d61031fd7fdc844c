/// Duet Crypto Library
///
/// Password credentials only: Argon2id with a random per-hash salt, encoded
/// as PHC strings so the parameters travel with the hash.
pub mod credential;

pub use credential::{DUMMY_CREDENTIAL, hash_password, verify_password};
