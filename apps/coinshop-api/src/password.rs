//! Password hashing with Argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use crate::error::AuthError;

/// Argon2id hasher with fixed cost parameters.
///
/// Hashes are PHC strings, so verification reads the parameters from the
/// stored hash. Raising the cost later keeps old hashes verifiable.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// Creates a hasher.
    ///
    /// ## Arguments
    /// * `memory_kib` - memory cost in KiB (at least 8 × `parallelism`)
    /// * `iterations` - time cost
    /// * `parallelism` - lanes
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Params(e.to_string()))?;
        Ok(CredentialHasher { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes a password with a fresh salt.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Checks `password` against a stored hash. An unparsable hash never matches.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(8, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let hasher = hasher();
        let hash = hasher.hash("pass1").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("pass1", &hash));
        assert!(!hasher.verify("pass2", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("pass1").unwrap(), hasher.hash("pass1").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!hasher().verify("pass1", "not-a-phc-string"));
    }

    #[test]
    fn test_bad_params_rejected() {
        assert!(matches!(
            CredentialHasher::new(0, 1, 1),
            Err(AuthError::Params(_))
        ));
    }
}
