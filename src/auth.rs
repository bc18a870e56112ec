use std::sync::Arc;

use log::info;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::ServiceError;
use crate::stats::{StatStore, StoreError};

/// One-way password encoding.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Salted SHA-256, stored as `salt$hex(sha256(salt || password))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    fn digest(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest(&salt, password);
        format!("{}${}", salt, digest)
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        let Some((salt, expected)) = stored.split_once('$') else {
            return false;
        };
        let actual = Self::digest(salt, password);
        actual.len() == expected.len()
            && actual
                .bytes()
                .zip(expected.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

/// Registration and login against a [`StatStore`].
pub struct AuthService {
    store: Arc<dyn StatStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AuthService {
    pub fn new(store: Arc<dyn StatStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        if username.is_empty() || password.is_empty() {
            return Err(ServiceError::BadRequest);
        }
        let hash = self.hasher.hash(password);
        self.store.save_user(username, hash).await?;
        info!("registered user {}", username);
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ServiceError> {
        if username.is_empty() {
            return Err(ServiceError::BadRequest);
        }
        let stored = match self.store.get_credential(username).await {
            Ok(stored) => stored,
            Err(StoreError::UserNotFound) => return Err(ServiceError::UserNotFound),
            Err(e) => return Err(e.into()),
        };
        if !self.hasher.verify(password, &stored) {
            return Err(ServiceError::WrongPassword);
        }
        info!("user {} logged in", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::MemoryStore;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let h = Sha256Hasher;
        let a = h.hash("secret");
        let b = h.hash("secret");
        assert_ne!(a, b);
        assert!(h.verify("secret", &a));
        assert!(h.verify("secret", &b));
        assert!(!h.verify("Secret", &a));
        assert!(!h.verify("secret", "no-separator"));
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()), Arc::new(Sha256Hasher));
        auth.register("amy", "pw").await.unwrap();
        assert_eq!(auth.register("amy", "pw").await, Err(ServiceError::UserExists));
        auth.login("amy", "pw").await.unwrap();
        assert_eq!(auth.login("amy", "nope").await, Err(ServiceError::WrongPassword));
        assert_eq!(auth.login("bob", "pw").await, Err(ServiceError::UserNotFound));
        assert_eq!(auth.register("", "pw").await, Err(ServiceError::BadRequest));
    }
}
