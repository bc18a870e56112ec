//! JSON bodies of the request/reply operations.
//!
//! Every response carries an optional `error` string; its absence means
//! success.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::stats::Statistics;

/// Access to the `error` field shared by all responses.
pub trait Reply {
    fn error(&self) -> Option<&str>;
}

macro_rules! impl_reply {
    ($($ty:ty),* $(,)?) => {
        $(impl Reply for $ty {
            fn error(&self) -> Option<&str> {
                self.error.as_deref().filter(|e| !e.is_empty())
            }
        })*
    };
}

/// Body of `auth.login` and `auth.register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Reply of operations that return nothing but an outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { error: None }
    }

    pub fn failed(err: &ServiceError) -> Self {
        Self {
            error: Some(err.wire()),
        }
    }

    pub fn from_result(result: Result<(), ServiceError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(&e),
        }
    }
}

/// Body of `game.create`, `game.del` and `game.get_user_stat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    pub user_name: String,
}

/// Reply to `game.create`, sent once somebody joins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGameRequest {
    pub creator_user_name: String,
    pub joining_user_name: String,
}

/// Body of `game.get_available`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableGamesRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableGamesResponse {
    #[serde(default)]
    pub games: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResultRequest {
    pub winner: String,
    pub loser: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatResponse {
    #[serde(default)]
    pub rating: i64,
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub losses: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Statistics> for UserStatResponse {
    fn from(s: Statistics) -> Self {
        Self {
            rating: s.rating,
            wins: s.wins,
            losses: s.losses,
            error: None,
        }
    }
}

impl From<&UserStatResponse> for Statistics {
    fn from(r: &UserStatResponse) -> Self {
        Statistics {
            wins: r.wins,
            losses: r.losses,
            rating: r.rating,
        }
    }
}

impl_reply!(
    StatusResponse,
    CreateGameResponse,
    AvailableGamesResponse,
    UserStatResponse,
);
