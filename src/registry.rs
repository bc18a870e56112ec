//! Game sessions waiting for, or matched with, an opponent.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where a pending reply must be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyAddress {
    pub queue: String,
    pub correlation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Waiting,
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub creator: String,
    /// The creator's deferred `game.create` reply.
    pub creator_reply: ReplyAddress,
    pub joiner: Option<String>,
    pub joiner_reply: Option<ReplyAddress>,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("game not found")]
    NotFound,
}

/// Sessions keyed by creator. A creator has at most one session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `creator`, replacing any session they had.
    pub async fn create_game(&self, creator: &str, reply: ReplyAddress) {
        let session = Session {
            creator: creator.to_string(),
            creator_reply: reply,
            joiner: None,
            joiner_reply: None,
            status: SessionStatus::Waiting,
        };
        if self
            .sessions
            .write()
            .await
            .insert(creator.to_string(), session)
            .is_some()
        {
            debug!("replaced previous session of {}", creator);
        }
    }

    /// Creators of the sessions still waiting for an opponent, sorted.
    pub async fn available_games(&self) -> Vec<String> {
        let mut games: Vec<String> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.status == SessionStatus::Waiting)
            .map(|s| s.creator.clone())
            .collect();
        games.sort();
        games
    }

    /// Match `joiner` with the waiting session of `creator` and return the
    /// address of the creator's deferred reply.
    ///
    /// Fails when `creator` has no waiting session or is `joiner`.
    pub async fn join_game(
        &self,
        creator: &str,
        joiner: &str,
        joiner_reply: ReplyAddress,
    ) -> Result<ReplyAddress, RegistryError> {
        if creator == joiner {
            return Err(RegistryError::NotFound);
        }
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(creator) {
            Some(session) if session.status == SessionStatus::Waiting => {
                session.joiner = Some(joiner.to_string());
                session.joiner_reply = Some(joiner_reply);
                session.status = SessionStatus::InProgress;
                Ok(session.creator_reply.clone())
            }
            _ => Err(RegistryError::NotFound),
        }
    }

    /// Remove the session of `creator`. Removing nothing is not an error.
    pub async fn del_game(&self, creator: &str) -> Option<Session> {
        self.sessions.write().await.remove(creator)
    }

    /// Remove the in-progress session played between `a` and `b`.
    pub async fn end_game(&self, a: &str, b: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let key = [a, b].into_iter().find(|creator| {
            sessions.get(*creator).is_some_and(|s| {
                s.status == SessionStatus::InProgress
                    && s.joiner.as_deref() == Some(if *creator == a { b } else { a })
            })
        })?;
        sessions.remove(key)
    }

    pub async fn session(&self, creator: &str) -> Option<Session> {
        self.sessions.read().await.get(creator).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(q: &str) -> ReplyAddress {
        ReplyAddress {
            queue: q.into(),
            correlation_id: Some(Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn join_returns_the_creator_reply() {
        let reg = SessionRegistry::new();
        let creator_reply = addr("r.amy");
        reg.create_game("amy", creator_reply.clone()).await;
        assert_eq!(reg.available_games().await, vec!["amy".to_string()]);

        let got = reg.join_game("amy", "bob", addr("r.bob")).await.unwrap();
        assert_eq!(got, creator_reply);
        let s = reg.session("amy").await.unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.joiner.as_deref(), Some("bob"));
        assert!(reg.available_games().await.is_empty());
    }

    #[tokio::test]
    async fn second_join_and_self_join_fail() {
        let reg = SessionRegistry::new();
        reg.create_game("amy", addr("r.amy")).await;
        assert_eq!(
            reg.join_game("amy", "amy", addr("r.amy")).await,
            Err(RegistryError::NotFound)
        );
        reg.join_game("amy", "bob", addr("r.bob")).await.unwrap();
        assert_eq!(
            reg.join_game("amy", "cat", addr("r.cat")).await,
            Err(RegistryError::NotFound)
        );
        assert_eq!(
            reg.join_game("zed", "cat", addr("r.cat")).await,
            Err(RegistryError::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let reg = SessionRegistry::new();
        reg.create_game("amy", addr("r")).await;
        assert!(reg.del_game("amy").await.is_some());
        assert!(reg.del_game("amy").await.is_none());
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn end_game_removes_the_played_session_only() {
        let reg = SessionRegistry::new();
        reg.create_game("amy", addr("r")).await;
        reg.create_game("cat", addr("r2")).await;
        reg.join_game("amy", "bob", addr("r3")).await.unwrap();
        assert!(reg.end_game("bob", "amy").await.is_some());
        assert!(reg.end_game("cat", "dan").await.is_none());
        assert_eq!(reg.len().await, 1);
    }
}
