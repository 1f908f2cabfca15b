//! Application-level configuration constants.

// Persistence
pub const PREFERENCE_KEY_PREFIX: &str = "goalPropTab__";

// Stats API
pub const API_BASE_PATH: &str = "/api/stats";
pub const FETCH_TIMEOUT_MS: u32 = 30_000;

// Mounting
pub const CONTAINER_ID: &str = "stats-breakdown-container";
pub const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;

// URL query parameter names
pub const GOAL_PARAM: &str = "goal";
pub const PROPS_PARAM: &str = "props";
pub const FILTERS_PARAM: &str = "filters";
pub const PERIOD_PARAMS: [&str; 4] = ["period", "date", "from", "to"];
