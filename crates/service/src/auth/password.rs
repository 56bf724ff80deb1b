use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use super::errors::AuthError;

/// Argon2id cost settings.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { memory_kib: 19 * 1024, iterations: 2, parallelism: 1 }
    }
}

impl PasswordPolicy {
    fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash on the blocking pool.
    pub async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let argon = self.argon2()?;
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| AuthError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    /// `Ok(false)` on mismatch; `Err` only for an unparseable stored hash.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let password = password.to_owned();
        let stored = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored).map_err(|e| AuthError::Hash(e.to_string()))?;
            // Parameters come from the PHC string, not from the current policy.
            Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordPolicy {
        PasswordPolicy { memory_kib: 1024, iterations: 1, parallelism: 1 }
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let policy = cheap();
        let hash = policy.hash("correct horse").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(policy.verify("correct horse", &hash).await.unwrap());
        assert!(!policy.verify("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn salts_differ() {
        let policy = cheap();
        let a = policy.hash("same").await.unwrap();
        let b = policy.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn corrupt_hash_is_an_error() {
        assert!(cheap().verify("x", "not-a-phc-string").await.is_err());
    }
}
