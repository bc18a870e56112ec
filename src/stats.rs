//! Player statistics and their storage.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Win/loss record and rating of one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub wins: i64,
    pub losses: i64,
    pub rating: i64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wins: {}, Losses: {}, Rating: {}",
            self.wins, self.losses, self.rating
        )
    }
}

/// Rating update after `winner` beat `loser`.
///
/// The loser's penalty is computed from the winner's rating after the
/// winner's bonus has been applied.
pub fn apply_game_result(winner: &mut Statistics, loser: &mut Statistics) {
    winner.wins += 1;
    winner.rating += loser.rating / 10;
    loser.losses += 1;
    loser.rating -= winner.rating / 10;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserExists,
    #[error("store failure: {0}")]
    Backend(String),
}

/// Persistence of credentials and statistics.
#[async_trait]
pub trait StatStore: Send + Sync {
    /// Create `login` with a zeroed record.
    async fn save_user(&self, login: &str, password_hash: String) -> Result<(), StoreError>;
    async fn get_credential(&self, login: &str) -> Result<String, StoreError>;
    async fn get_stat(&self, login: &str) -> Result<Statistics, StoreError>;
    async fn update_stat(&self, login: &str, stats: Statistics) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct UserRecord {
    password_hash: String,
    stats: Statistics,
}

/// Process-local [`StatStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatStore for MemoryStore {
    async fn save_user(&self, login: &str, password_hash: String) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(login) {
            return Err(StoreError::UserExists);
        }
        users.insert(
            login.to_string(),
            UserRecord {
                password_hash,
                stats: Statistics::default(),
            },
        );
        Ok(())
    }

    async fn get_credential(&self, login: &str) -> Result<String, StoreError> {
        self.users
            .read()
            .await
            .get(login)
            .map(|u| u.password_hash.clone())
            .ok_or(StoreError::UserNotFound)
    }

    async fn get_stat(&self, login: &str) -> Result<Statistics, StoreError> {
        self.users
            .read()
            .await
            .get(login)
            .map(|u| u.stats)
            .ok_or(StoreError::UserNotFound)
    }

    async fn update_stat(&self, login: &str, stats: Statistics) -> Result<(), StoreError> {
        match self.users.write().await.get_mut(login) {
            Some(user) => {
                user.stats = stats;
                Ok(())
            }
            None => Err(StoreError::UserNotFound),
        }
    }
}
