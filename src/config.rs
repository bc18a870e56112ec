use core::time::Duration;

pub const BOARD_SIZE: usize = 10;

/// Ships per type in a complete fleet, indexed by `ShipType::index()`.
pub const FLEET: [usize; 4] = [4, 3, 2, 1];
pub const NUM_SHIPS: usize = 4 + 3 + 2 + 1;

/// Total number of ship cells in a complete fleet.
pub const TOTAL_SHIP_CELLS: usize = 4 * 1 + 3 * 2 + 2 * 3 + 4;

/// Well-known request queues consumed by the server.
pub mod queues {
    pub const LOGIN: &str = "auth.login";
    pub const REGISTER: &str = "auth.register";
    pub const GAME_CREATE: &str = "game.create";
    pub const GAME_JOIN: &str = "game.join";
    pub const GAME_DEL: &str = "game.del";
    pub const GAME_AVAILABLE: &str = "game.get_available";
    pub const GAME_SAVE_RESULT: &str = "game.save_result";
    pub const GAME_USER_STAT: &str = "game.get_user_stat";

    /// Every queue the server consumes.
    pub const ALL: [&str; 8] = [
        LOGIN,
        REGISTER,
        GAME_CREATE,
        GAME_JOIN,
        GAME_DEL,
        GAME_AVAILABLE,
        GAME_SAVE_RESULT,
        GAME_USER_STAT,
    ];

    /// Prefix of the per-player battle queues.
    pub const BATTLE_PREFIX: &str = "battle.";
}

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MATCHMAKING_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_READY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_READY_WINDOW: Duration = Duration::from_millis(500);

/// Client-side timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Deadline of every plain request/reply call.
    pub call_timeout: Duration,
    /// How long `CreateGame` waits for a joiner.
    pub matchmaking_timeout: Duration,
    /// Ready timer started when a battle begins.
    pub ready_delay: Duration,
    /// How long a side that sent `Ready` listens for a colliding `Ready`.
    pub ready_window: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            matchmaking_timeout: DEFAULT_MATCHMAKING_TIMEOUT,
            ready_delay: DEFAULT_READY_DELAY,
            ready_window: DEFAULT_READY_WINDOW,
        }
    }
}

/// Server-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg(feature = "std")]
pub struct ServerConfig {
    /// Address the broker listens on.
    pub bind: std::string::String,
}

#[cfg(feature = "std")]
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5672".into(),
        }
    }
}
