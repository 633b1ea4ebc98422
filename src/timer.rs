//! Persistent cross-page countdown state machine
//!
//! This module owns the per-team countdown session: idempotent creation on
//! a start page, reads from every page that renders a countdown, expiry
//! target updates, and the one-shot expiry transition that clears the
//! session and redirects the team.
//!
//! A session moves through three states: **Absent** (no durable entries),
//! **Running** (entries exist, remaining time above zero), and **Expired**
//! (a one-shot transition back to Absent that may trigger navigation).
//! The durable layout is three entries per team: start timestamp in epoch
//! milliseconds, duration in seconds, and the expiry redirect target.
//! Absence of either of the first two is the authoritative "no session"
//! signal.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{
    constants::timer::{
        DURATION_KEY_SUFFIX, EXPIRE_KEY_SUFFIX, KEY_PREFIX, START_KEY_SUFFIX,
    },
    navigation::{NavigationHelper, Navigator},
    store::KeyValueStore,
    team::TeamId,
};

/// Trait for reading the current wall-clock time
///
/// The timer computes remaining time from durable timestamps, so the clock
/// is the only ambient input; injecting it keeps expiry behavior testable
/// without real waiting.
pub trait Clock {
    /// Current time as milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// Production clock reading the host's wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A team's persisted countdown session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    /// Timestamp captured when the countdown was created, epoch milliseconds
    pub start_epoch_ms: u64,
    /// Total countdown length in seconds
    pub duration_secs: u64,
    /// Where to redirect when the countdown reaches zero, if anywhere
    pub expire_target: Option<String>,
}

/// What a non-start page does when it finds no session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingSessionPolicy {
    /// Render the page without a countdown
    #[default]
    Ignore,
    /// Redirect to the canonical start page and stop rendering
    Bounce {
        /// URL of the canonical start page
        start_url: String,
    },
}

/// Behavior knobs for the timer state machine
///
/// Both knobs exist because deployed pages disagree on these points; the
/// host picks a variant instead of the library guessing one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerOptions {
    /// Policy when a non-start page finds no session
    #[serde(default)]
    pub on_missing_session: MissingSessionPolicy,
    /// Whether a start page overwrites the expiry target of a session that
    /// already exists (the start timestamp and duration are never touched)
    #[serde(default)]
    pub refresh_expire_on_existing: bool,
}

/// Result of driving the countdown one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    /// No session exists for the team
    Absent,
    /// The countdown is running with this many seconds remaining
    Running(u64),
    /// The countdown just reached zero; the session's start and duration
    /// entries were cleared and the expiry navigation (if any) fired
    Expired {
        /// The redirect target that was navigated to, if one was stored
        target: Option<String>,
    },
}

/// Countdown display updates for the rendering collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpdateMessage {
    /// The remaining time to display
    TimeRemaining {
        /// Zero-padded `MM:SS` rendering of the remaining time
        display: String,
        /// Remaining whole seconds
        seconds: u64,
    },
}

/// Manages the per-team countdown session stored in the durable store
#[derive(Debug, Clone)]
pub struct TimerSessionManager<C = WallClock> {
    /// Clock used to compute remaining time
    clock: C,
    /// Variant configuration
    options: TimerOptions,
}

impl TimerSessionManager<WallClock> {
    /// Creates a manager using the host's wall clock
    pub fn new(options: TimerOptions) -> Self {
        Self::with_clock(options, WallClock)
    }
}

impl<C: Clock> TimerSessionManager<C> {
    /// Creates a manager with an explicit clock
    pub fn with_clock(options: TimerOptions, clock: C) -> Self {
        Self { clock, options }
    }

    /// Reads the team's session, or `None` when no session exists
    ///
    /// A missing, unparseable, or zero start timestamp or duration counts
    /// as no session.
    pub fn session(&self, store: &impl KeyValueStore, team: &TeamId) -> Option<TimerSession> {
        let start_epoch_ms = read_entry(store, &key(team, START_KEY_SUFFIX))?;
        let duration_secs = read_entry(store, &key(team, DURATION_KEY_SUFFIX))?;
        Some(TimerSession {
            start_epoch_ms,
            duration_secs,
            expire_target: store.get(&key(team, EXPIRE_KEY_SUFFIX)),
        })
    }

    /// Creates the team's session if none exists yet
    ///
    /// An existing session is left untouched, so reloading or re-entering
    /// the start page never restarts an in-progress countdown. When
    /// [`TimerOptions::refresh_expire_on_existing`] is set, a declared
    /// expiry target still overwrites the stored one.
    ///
    /// The existence check and the writes are not atomic: two tabs loading
    /// the start page concurrently can both observe no session and both
    /// write, with the last writer winning. The store offers no
    /// compare-and-set, so this is accepted as best-effort.
    pub fn start_if_absent(
        &self,
        store: &mut impl KeyValueStore,
        team: &TeamId,
        duration: Duration,
        expire_target: Option<&str>,
    ) {
        if self.session(store, team).is_some() {
            if self.options.refresh_expire_on_existing {
                if let Some(target) = expire_target {
                    store.set(&key(team, EXPIRE_KEY_SUFFIX), target);
                }
            }
            return;
        }
        store.set(
            &key(team, START_KEY_SUFFIX),
            &self.clock.now_ms().to_string(),
        );
        store.set(
            &key(team, DURATION_KEY_SUFFIX),
            &duration.as_secs().to_string(),
        );
        if let Some(target) = expire_target {
            store.set(&key(team, EXPIRE_KEY_SUFFIX), target);
        }
    }

    /// Checks that a session exists for a non-start page
    ///
    /// Returns `true` when the page should keep rendering. With the
    /// [`MissingSessionPolicy::Bounce`] policy a missing session redirects
    /// to the canonical start page and returns `false`; with
    /// [`MissingSessionPolicy::Ignore`] the page renders without a
    /// countdown.
    pub fn ensure_present_or_bounce<N: Navigator>(
        &self,
        store: &impl KeyValueStore,
        team: &TeamId,
        nav: &mut NavigationHelper<N>,
    ) -> bool {
        if self.session(store, team).is_some() {
            return true;
        }
        match &self.options.on_missing_session {
            MissingSessionPolicy::Ignore => true,
            MissingSessionPolicy::Bounce { start_url } => {
                nav.go_with_team(start_url, team);
                false
            }
        }
    }

    /// Overwrites the stored expiry target of an existing session
    ///
    /// Does nothing when no session exists; updating the target never
    /// touches the start timestamp or duration.
    pub fn update_expire_target(
        &self,
        store: &mut impl KeyValueStore,
        team: &TeamId,
        target: &str,
    ) {
        if self.session(store, team).is_some() {
            store.set(&key(team, EXPIRE_KEY_SUFFIX), target);
        }
    }

    /// Remaining whole seconds of the team's countdown, floored at zero
    ///
    /// Returns 0 when no session exists.
    pub fn remaining_seconds(&self, store: &impl KeyValueStore, team: &TeamId) -> u64 {
        self.session(store, team)
            .map_or(0, |session| remaining_of(&session, self.clock.now_ms()))
    }

    /// Drives the countdown one step
    ///
    /// Intended to run on a one-second cadence. When the remaining time
    /// first reaches zero, the session's start and duration entries are
    /// deleted (the expiry target is kept as the last-known redirect) and
    /// navigation to the target fires with the team carried along. The
    /// deletion is what makes expiry one-shot: every later tick observes
    /// no session and returns [`TickOutcome::Absent`] instead of firing
    /// again.
    pub fn tick<S: KeyValueStore, N: Navigator>(
        &self,
        store: &mut S,
        team: &TeamId,
        nav: &mut NavigationHelper<N>,
    ) -> TickOutcome {
        let Some(session) = self.session(store, team) else {
            return TickOutcome::Absent;
        };
        let remaining = remaining_of(&session, self.clock.now_ms());
        if remaining > 0 {
            return TickOutcome::Running(remaining);
        }
        store.remove(&key(team, START_KEY_SUFFIX));
        store.remove(&key(team, DURATION_KEY_SUFFIX));
        if let Some(target) = &session.expire_target {
            nav.go_with_team(target, team);
        }
        TickOutcome::Expired {
            target: session.expire_target,
        }
    }

    /// Unconditionally clears the team's session, expiry target included
    ///
    /// Debug affordance; callers gate this behind the explicit developer
    /// flag in the navigation context.
    pub fn reset(&self, store: &mut impl KeyValueStore, team: &TeamId) {
        store.remove(&key(team, START_KEY_SUFFIX));
        store.remove(&key(team, DURATION_KEY_SUFFIX));
        store.remove(&key(team, EXPIRE_KEY_SUFFIX));
    }
}

/// Builds the namespaced durable key for one of a team's entries
fn key(team: &TeamId, suffix: &str) -> String {
    format!("{KEY_PREFIX}_{team}_{suffix}")
}

/// Reads a positive integer entry; missing, unparseable, or zero is `None`
fn read_entry(store: &impl KeyValueStore, key: &str) -> Option<u64> {
    store
        .get(key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value != 0)
}

/// Remaining whole seconds of a session at `now_ms`, floored at zero
fn remaining_of(session: &TimerSession, now_ms: u64) -> u64 {
    let elapsed_secs = now_ms.saturating_sub(session.start_epoch_ms) / 1000;
    session.duration_secs.saturating_sub(elapsed_secs)
}

/// Formats remaining seconds as zero-padded `MM:SS` for display
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
