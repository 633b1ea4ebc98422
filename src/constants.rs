//! Configuration constants for the escape game core
//!
//! This module contains the defaults, bounds, and durable-storage key parts
//! used throughout the library to keep behavior consistent across pages.

/// Team identity constants
pub mod team {
    /// Team used when the navigation context carries no team token
    pub const DEFAULT_TEAM: &str = "A";
    /// Query parameter carrying the team token between pages
    pub const QUERY_PARAM: &str = "team";
    /// Developer flag in the navigation context that clears a team's session
    pub const RESET_FLAG: &str = "resetTimer";
}

/// Countdown timer constants
pub mod timer {
    /// Countdown length in seconds when a start page declares none
    pub const DEFAULT_DURATION_SECS: u64 = 30 * 60;
    /// Minimum accepted countdown length in seconds
    pub const MIN_DURATION_SECS: u64 = 1;
    /// Maximum accepted countdown length in seconds (one day)
    pub const MAX_DURATION_SECS: u64 = 86_400;
    /// Cadence at which the host should drive the tick, in milliseconds
    pub const TICK_INTERVAL_MS: u64 = 1_000;
    /// Namespace prefix for all durable entries
    pub const KEY_PREFIX: &str = "EG";
    /// Key suffix for the countdown start timestamp (epoch milliseconds)
    pub const START_KEY_SUFFIX: &str = "TIMER_START_MS";
    /// Key suffix for the countdown duration (seconds)
    pub const DURATION_KEY_SUFFIX: &str = "TIMER_DURATION_SEC";
    /// Key suffix for the expiry redirect target
    pub const EXPIRE_KEY_SUFFIX: &str = "TIMER_EXPIRE_URL";
}

/// Answer dock constants
pub mod dock {
    /// Delay before navigating away after a correct answer, in milliseconds,
    /// so the success message is visible first
    pub const SUCCESS_REDIRECT_DELAY_MS: u64 = 600;
    /// Maximum number of accepted answers a page may declare
    pub const MAX_ANSWER_COUNT: usize = 16;
    /// Maximum length of a single accepted answer in characters
    pub const MAX_ANSWER_LENGTH: usize = 200;
    /// Maximum length of the whole comma-separated answers attribute
    pub const MAX_ANSWERS_ATTR_LENGTH: usize = MAX_ANSWER_COUNT * MAX_ANSWER_LENGTH;
}

/// Device identity constants
pub mod device {
    /// Durable entry holding the per-browser device identifier
    pub const KEY: &str = "EG_DEVICE_ID";
    /// Length of generated device identifiers
    pub const ID_LENGTH: usize = 8;
}
