//! Per-page configuration and orchestration
//!
//! This module parses a page's declarative configuration and navigation
//! context once, validates them, and owns the page-lifetime controller
//! that wires the countdown timer and the answer dock together. The host
//! constructs one controller per page load, calls [`PageController::load`]
//! when the page becomes live, drives [`PageController::tick`] on a
//! one-second cadence, and calls [`PageController::stop`] on teardown.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::{
    AlarmMessage, UpdateMessage,
    constants::{
        dock::MAX_ANSWERS_ATTR_LENGTH,
        team::{QUERY_PARAM, RESET_FLAG},
        timer::{DEFAULT_DURATION_SECS, MAX_DURATION_SECS, MIN_DURATION_SECS},
    },
    device,
    dock::{self, AnswerDock},
    navigation::{NavigationHelper, Navigator},
    store::KeyValueStore,
    team::TeamId,
    timer::{
        self, Clock, TickOutcome, TimerOptions, TimerSessionManager, WallClock, format_mm_ss,
    },
};

/// Errors raised while constructing a page controller
#[derive(Debug, Error)]
pub enum Error {
    /// The page's declarative configuration failed validation
    #[error("invalid page configuration: {0}")]
    InvalidConfig(#[from] garde::Report),
}

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates that a duration falls within `MIN_SECONDS..=MAX_SECONDS`
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Default countdown length when a start page declares none
fn default_duration() -> Duration {
    Duration::from_secs(DEFAULT_DURATION_SECS)
}

#[serde_with::serde_as]
#[skip_serializing_none]
/// A page's declarative configuration
///
/// Parsed once from the page's declaration (meta tags and body attributes
/// in a browser host) at controller construction time and validated then;
/// never re-queried afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PageConfig {
    /// Whether this page is a countdown start page
    #[serde(rename = "timer-start", default)]
    #[garde(skip)]
    pub timer_start: bool,
    /// Countdown length when started here, in seconds
    #[serde(rename = "timer-duration-sec", default = "default_duration")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[garde(custom(validate_duration::<MIN_DURATION_SECS, MAX_DURATION_SECS>))]
    pub timer_duration: Duration,
    /// Where to send the team when time runs out
    #[serde(rename = "timer-expire-target", default)]
    #[garde(skip)]
    pub timer_expire_target: Option<String>,
    /// Comma-separated accepted answers for this page's dock
    #[serde(rename = "data-answers", default)]
    #[garde(inner(length(chars, max = MAX_ANSWERS_ATTR_LENGTH)))]
    pub answers: Option<String>,
    /// Where to navigate on a correct answer
    #[serde(rename = "data-target", default)]
    #[garde(skip)]
    pub target: Option<String>,
}

impl Default for PageConfig {
    /// A page that neither starts a countdown nor carries a dock
    fn default() -> Self {
        Self {
            timer_start: false,
            timer_duration: default_duration(),
            timer_expire_target: None,
            answers: None,
            target: None,
        }
    }
}

/// Inputs read from the page's navigation context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// The team this page instance acts on
    pub team: TeamId,
    /// Developer flag requesting an unconditional session reset
    pub reset_timer: bool,
}

impl QueryParams {
    /// Parses the navigation context from a raw query string
    ///
    /// Accepts the string with or without its leading `?`. The first
    /// `team` value wins; an absent or empty token resolves to the
    /// default team.
    pub fn parse(query: &str) -> Self {
        let raw = query.strip_prefix('?').unwrap_or(query);
        let mut team = None;
        let mut reset_timer = false;
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key == QUERY_PARAM {
                if team.is_none() {
                    team = Some(TeamId::new(&value));
                }
            } else if key == RESET_FLAG {
                reset_timer = value == "1" || value == "true";
            }
        }
        Self {
            team: team.unwrap_or_default(),
            reset_timer,
        }
    }
}

/// Orchestrates one page view's countdown and answer dock
///
/// Owns the durable store, the navigation helper, the timer manager, and
/// the optional dock for the lifetime of a single page view. The
/// controller goes inert after teardown, after a bounce, or after the
/// one-shot expiry navigation, so stray ticks can never double-fire.
#[derive(Debug)]
pub struct PageController<S, N, C = WallClock> {
    /// Validated page configuration
    config: PageConfig,
    /// Team this page instance acts on
    team: TeamId,
    /// Whether the developer reset flag was present
    reset_timer: bool,
    /// Durable key-value store shared across pages
    store: S,
    /// Team-preserving navigation
    nav: NavigationHelper<N>,
    /// Countdown state machine
    timer: TimerSessionManager<C>,
    /// Answer dock, when the page declares one
    dock: Option<AnswerDock>,
    /// Whether the page is still live (not torn down, bounced, or expired)
    live: bool,
}

impl<S: KeyValueStore, N: Navigator> PageController<S, N, WallClock> {
    /// Creates a controller using the host's wall clock
    ///
    /// `base_url` is the current page's URL, used to resolve relative
    /// navigation targets when available.
    pub fn new(
        config: PageConfig,
        params: QueryParams,
        store: S,
        navigator: N,
        base_url: Option<&str>,
        options: TimerOptions,
    ) -> Result<Self, Error> {
        Self::with_clock(config, params, store, navigator, base_url, options, WallClock)
    }
}

impl<S: KeyValueStore, N: Navigator, C: Clock> PageController<S, N, C> {
    /// Creates a controller with an explicit clock
    pub fn with_clock(
        config: PageConfig,
        params: QueryParams,
        store: S,
        navigator: N,
        base_url: Option<&str>,
        options: TimerOptions,
        clock: C,
    ) -> Result<Self, Error> {
        config.validate()?;
        let dock = AnswerDock::from_page(config.answers.as_deref(), config.target.as_deref());
        Ok(Self {
            config,
            team: params.team,
            reset_timer: params.reset_timer,
            store,
            nav: NavigationHelper::new(navigator, base_url),
            timer: TimerSessionManager::with_clock(options, clock),
            dock,
            live: true,
        })
    }

    /// Runs the per-page-load flow
    ///
    /// Applies the developer reset flag, creates or checks the countdown
    /// session depending on whether this is a start page, refreshes the
    /// expiry target a non-start page declares, and performs the first
    /// tick. Returns the initial display messages; an empty result after
    /// a bounce means the page should not continue rendering.
    pub fn load(&mut self) -> Vec<UpdateMessage> {
        if self.reset_timer {
            self.timer.reset(&mut self.store, &self.team);
        }
        if self.config.timer_start {
            self.timer.start_if_absent(
                &mut self.store,
                &self.team,
                self.config.timer_duration,
                self.config.timer_expire_target.as_deref(),
            );
        } else {
            if !self
                .timer
                .ensure_present_or_bounce(&self.store, &self.team, &mut self.nav)
            {
                self.live = false;
                return Vec::new();
            }
            if let Some(target) = self.config.timer_expire_target.clone() {
                self.timer
                    .update_expire_target(&mut self.store, &self.team, &target);
            }
        }
        self.tick().into_iter().collect()
    }

    /// Drives the countdown one step on the host's one-second cadence
    ///
    /// Returns the remaining-time display message, or `None` when the
    /// page has no countdown or is no longer live. When the countdown
    /// reaches zero the expiry navigation fires (at most once per session
    /// lifetime) and the controller goes inert.
    pub fn tick(&mut self) -> Option<UpdateMessage> {
        if !self.live {
            return None;
        }
        match self.timer.tick(&mut self.store, &self.team, &mut self.nav) {
            TickOutcome::Absent => None,
            TickOutcome::Running(seconds) => Some(
                timer::UpdateMessage::TimeRemaining {
                    display: format_mm_ss(seconds),
                    seconds,
                }
                .into(),
            ),
            TickOutcome::Expired { .. } => {
                self.live = false;
                Some(
                    timer::UpdateMessage::TimeRemaining {
                        display: format_mm_ss(0),
                        seconds: 0,
                    }
                    .into(),
                )
            }
        }
    }

    /// Handles one answer submission (button click or Enter key)
    ///
    /// Returns `None` when the page declares no dock. On a correct answer
    /// with a configured target, the deferred navigation alarm is handed
    /// to `schedule_message`.
    pub fn submit_answer<F: FnMut(AlarmMessage, Duration)>(
        &mut self,
        input: &str,
        schedule_message: F,
    ) -> Option<UpdateMessage> {
        let dock = self.dock.as_ref()?;
        Some(dock.submit(input, schedule_message).into())
    }

    /// Delivers a previously scheduled alarm back to the controller
    pub fn receive_alarm(&mut self, alarm: AlarmMessage) {
        match alarm {
            AlarmMessage::Dock(dock::AlarmMessage::NavigateToTarget { url }) => {
                self.nav.go_with_team(&url, &self.team);
            }
        }
    }

    /// Marks the page as torn down; later ticks become no-ops
    pub fn stop(&mut self) {
        self.live = false;
    }

    /// Whether the page is still live
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// The team this page instance acts on
    pub fn team(&self) -> &TeamId {
        &self.team
    }

    /// Whether the page declares an answer dock
    pub fn has_dock(&self) -> bool {
        self.dock.is_some()
    }

    /// The per-browser device identifier, generated on first use
    pub fn device_id(&mut self) -> String {
        device::ensure_device_id(&mut self.store)
    }

    /// Remaining whole seconds of this team's countdown
    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds(&self.store, &self.team)
    }

    /// Read access to the durable store
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use crate::{
        store::MemoryStore,
        timer::MissingSessionPolicy,
    };

    use super::*;

    #[derive(Debug, Clone, Default)]
    struct FakeClock(Rc<Cell<u64>>);

    impl FakeClock {
        fn at(ms: u64) -> Self {
            Self(Rc::new(Cell::new(ms)))
        }

        fn advance_secs(&self, secs: u64) {
            self.0.set(self.0.get() + secs * 1000);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    #[derive(Debug, Clone, Default)]
    struct RecordingNavigator {
        visited: Rc<RefCell<Vec<String>>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&mut self, url: &str) {
            self.visited.borrow_mut().push(url.to_owned());
        }
    }

    type TestController = PageController<MemoryStore, RecordingNavigator, FakeClock>;

    fn controller(
        config: PageConfig,
        params: QueryParams,
        store: MemoryStore,
        options: TimerOptions,
        clock: &FakeClock,
    ) -> (TestController, Rc<RefCell<Vec<String>>>) {
        let navigator = RecordingNavigator::default();
        let visited = Rc::clone(&navigator.visited);
        let controller = PageController::with_clock(
            config,
            params,
            store,
            navigator,
            None,
            options,
            clock.clone(),
        )
        .unwrap();
        (controller, visited)
    }

    #[test]
    fn test_page_config_deserializes_from_declared_attributes() {
        let config: PageConfig = serde_json::from_str(
            r#"{
                "timer-start": true,
                "timer-duration-sec": 300,
                "timer-expire-target": "/over.html",
                "data-answers": "Blue Whale, orca",
                "data-target": "/next.html"
            }"#,
        )
        .unwrap();

        assert!(config.timer_start);
        assert_eq!(config.timer_duration, Duration::from_secs(300));
        assert_eq!(config.timer_expire_target.as_deref(), Some("/over.html"));
        assert_eq!(config.answers.as_deref(), Some("Blue Whale, orca"));
        assert_eq!(config.target.as_deref(), Some("/next.html"));
    }

    #[test]
    fn test_page_config_defaults() {
        let config: PageConfig = serde_json::from_str("{}").unwrap();

        assert!(!config.timer_start);
        assert_eq!(config.timer_duration, Duration::from_secs(1800));
        assert!(config.timer_expire_target.is_none());
        assert!(config.answers.is_none());
        assert!(config.target.is_none());
    }

    #[test]
    fn test_invalid_duration_is_rejected_at_construction() {
        let config = PageConfig {
            timer_duration: Duration::from_secs(0),
            ..PageConfig::default()
        };
        let result = PageController::with_clock(
            config,
            QueryParams::default(),
            MemoryStore::new(),
            RecordingNavigator::default(),
            None,
            TimerOptions::default(),
            FakeClock::at(0),
        );

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_query_params_parse() {
        let params = QueryParams::parse("?team=b&resetTimer=1");
        assert_eq!(params.team.as_str(), "B");
        assert!(params.reset_timer);

        let params = QueryParams::parse("x=1");
        assert_eq!(params.team.as_str(), "A");
        assert!(!params.reset_timer);

        let params = QueryParams::parse("team=&resetTimer=0");
        assert_eq!(params.team.as_str(), "A");
        assert!(!params.reset_timer);
    }

    #[test]
    fn test_start_page_expires_and_redirects_exactly_once() {
        let clock = FakeClock::at(1_000);
        let config = PageConfig {
            timer_start: true,
            timer_duration: Duration::from_secs(5),
            timer_expire_target: Some("/over.html".to_string()),
            ..PageConfig::default()
        };
        let (mut page, visited) = controller(
            config,
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );

        let messages = page.load();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].to_message().contains("00:05"));

        for _ in 0..5 {
            clock.advance_secs(1);
            page.tick();
        }

        assert_eq!(visited.borrow().as_slice(), ["/over.html?team=A"]);
        assert!(page.store().get("EG_A_TIMER_START_MS").is_none());
        assert!(page.store().get("EG_A_TIMER_DURATION_SEC").is_none());

        // ticks after expiry are inert
        clock.advance_secs(1);
        assert!(page.tick().is_none());
        assert_eq!(visited.borrow().len(), 1);
    }

    #[test]
    fn test_reloading_start_page_keeps_countdown() {
        let clock = FakeClock::at(1_000);
        let config = PageConfig {
            timer_start: true,
            timer_duration: Duration::from_secs(100),
            ..PageConfig::default()
        };
        let (mut page, _) = controller(
            config.clone(),
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );
        page.load();
        clock.advance_secs(40);

        // second page view against the same store
        let store = page.store().clone();
        let (mut reloaded, _) = controller(
            config,
            QueryParams::default(),
            store,
            TimerOptions::default(),
            &clock,
        );
        let messages = reloaded.load();

        assert_eq!(messages.len(), 1);
        assert!(messages[0].to_message().contains("01:00"));
    }

    #[test]
    fn test_correct_answer_navigates_with_team() {
        let clock = FakeClock::at(1_000);
        let config = PageConfig {
            answers: Some("Blue Whale, orca".to_string()),
            target: Some("/next.html".to_string()),
            ..PageConfig::default()
        };
        let (mut page, visited) = controller(
            config,
            QueryParams::parse("team=b"),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );
        page.load();

        let mut scheduled = Vec::new();
        let msg = page
            .submit_answer("  BLUE WHALE", |alarm, delay| scheduled.push((alarm, delay)))
            .unwrap();

        assert!(msg.to_message().contains("Correct"));
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].1, Duration::from_millis(600));
        assert!(visited.borrow().is_empty());

        let (alarm, _) = scheduled.remove(0);
        page.receive_alarm(alarm);
        assert_eq!(visited.borrow().as_slice(), ["/next.html?team=B"]);
    }

    #[test]
    fn test_wrong_answer_does_not_navigate() {
        let clock = FakeClock::at(1_000);
        let config = PageConfig {
            answers: Some("orca".to_string()),
            target: Some("/next.html".to_string()),
            ..PageConfig::default()
        };
        let (mut page, visited) = controller(
            config,
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );
        page.load();

        let mut count = 0;
        let msg = page.submit_answer("whale", |_, _| count += 1).unwrap();

        assert!(msg.to_message().contains("WrongAnswer"));
        assert_eq!(count, 0);
        assert!(visited.borrow().is_empty());
    }

    #[test]
    fn test_page_without_dock_ignores_submissions() {
        let clock = FakeClock::at(1_000);
        let (mut page, _) = controller(
            PageConfig::default(),
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );
        page.load();

        assert!(!page.has_dock());
        assert!(page.submit_answer("anything", |_, _| ()).is_none());
    }

    #[test]
    fn test_missing_session_bounces_and_stops_rendering() {
        let clock = FakeClock::at(1_000);
        let options = TimerOptions {
            on_missing_session: MissingSessionPolicy::Bounce {
                start_url: "/start.html".to_string(),
            },
            ..TimerOptions::default()
        };
        let (mut page, visited) = controller(
            PageConfig::default(),
            QueryParams::parse("team=c"),
            MemoryStore::new(),
            options,
            &clock,
        );

        let messages = page.load();

        assert!(messages.is_empty());
        assert!(!page.is_live());
        assert_eq!(visited.borrow().as_slice(), ["/start.html?team=C"]);
        assert!(page.tick().is_none());
    }

    #[test]
    fn test_missing_session_ignore_renders_without_countdown() {
        let clock = FakeClock::at(1_000);
        let (mut page, visited) = controller(
            PageConfig::default(),
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );

        let messages = page.load();

        assert!(messages.is_empty());
        assert!(page.is_live());
        assert!(visited.borrow().is_empty());
        assert!(page.tick().is_none());
    }

    #[test]
    fn test_non_start_page_updates_expire_target() {
        let clock = FakeClock::at(1_000);
        let mut store = MemoryStore::new();
        store.set("EG_A_TIMER_START_MS", "1000");
        store.set("EG_A_TIMER_DURATION_SEC", "60");
        store.set("EG_A_TIMER_EXPIRE_URL", "/old.html");

        let config = PageConfig {
            timer_expire_target: Some("/new.html".to_string()),
            ..PageConfig::default()
        };
        let (mut page, _) = controller(
            config,
            QueryParams::default(),
            store,
            TimerOptions::default(),
            &clock,
        );
        page.load();

        assert_eq!(
            page.store().get("EG_A_TIMER_EXPIRE_URL").as_deref(),
            Some("/new.html")
        );
        // the countdown itself is untouched
        assert_eq!(
            page.store().get("EG_A_TIMER_START_MS").as_deref(),
            Some("1000")
        );
    }

    #[test]
    fn test_reset_flag_clears_session_before_start() {
        let clock = FakeClock::at(60_000);
        let mut store = MemoryStore::new();
        store.set("EG_A_TIMER_START_MS", "1000");
        store.set("EG_A_TIMER_DURATION_SEC", "10");

        let config = PageConfig {
            timer_start: true,
            timer_duration: Duration::from_secs(20),
            ..PageConfig::default()
        };
        let (mut page, _) = controller(
            config,
            QueryParams::parse("resetTimer=1"),
            store,
            TimerOptions::default(),
            &clock,
        );

        let messages = page.load();

        // the stale session was cleared and a fresh one started
        assert_eq!(
            page.store().get("EG_A_TIMER_START_MS").as_deref(),
            Some("60000")
        );
        assert!(messages[0].to_message().contains("00:20"));
    }

    #[test]
    fn test_stop_makes_ticks_inert() {
        let clock = FakeClock::at(1_000);
        let config = PageConfig {
            timer_start: true,
            timer_duration: Duration::from_secs(5),
            timer_expire_target: Some("/over.html".to_string()),
            ..PageConfig::default()
        };
        let (mut page, visited) = controller(
            config,
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );
        page.load();
        page.stop();

        clock.advance_secs(10);
        assert!(page.tick().is_none());
        assert!(visited.borrow().is_empty());
    }

    #[test]
    fn test_device_id_persists_in_store() {
        let clock = FakeClock::at(1_000);
        let (mut page, _) = controller(
            PageConfig::default(),
            QueryParams::default(),
            MemoryStore::new(),
            TimerOptions::default(),
            &clock,
        );

        let id = page.device_id();
        assert_eq!(page.device_id(), id);
        assert_eq!(page.store().get("EG_DEVICE_ID"), Some(id));
    }
}
