//! Answer verification and the per-page answer dock
//!
//! This module implements fuzzy free-text answer matching and the small
//! controller that wires one input box and one submit action to it. The
//! same normalization is applied to the declared accepted answers and to
//! the player's input, so spacing, casing, and Unicode composition
//! differences never cause false negatives.

use std::{fmt::Display, time::Duration};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::constants::dock::SUCCESS_REDIRECT_DELAY_MS;

/// Normalizes an answer string for comparison
///
/// Trims surrounding whitespace, lowercases, strips all internal
/// whitespace, and applies canonical Unicode composition (NFC).
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .nfc()
        .collect()
}

/// Outcome of checking a submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// The normalized input was empty; nothing to check
    Empty,
    /// The input matched an accepted answer (or the page is open-answer)
    Accepted,
    /// The input matched none of the accepted answers
    Rejected,
}

/// The set of normalized accepted answers declared by a page
///
/// Built once per page load from the comma-separated declaration. An
/// empty set marks an open-answer page where any non-empty input passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerSet {
    /// Normalized accepted answers, deduplicated, declaration order kept
    answers: Vec<String>,
}

impl AnswerSet {
    /// Parses a comma-separated answer declaration
    ///
    /// Each entry is trimmed and normalized; empties are dropped and
    /// duplicates collapse to one.
    pub fn parse(declaration: &str) -> Self {
        let answers = declaration
            .split(',')
            .map(normalize)
            .filter(|answer| !answer.is_empty())
            .unique()
            .collect_vec();
        Self { answers }
    }

    /// Whether no accepted answers are declared (open-answer page)
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Number of declared accepted answers
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    /// Checks a player's raw input against the set
    ///
    /// Pure and stateless: the input is normalized, empty input yields
    /// [`Verdict::Empty`], membership (or an empty set) yields
    /// [`Verdict::Accepted`], anything else [`Verdict::Rejected`].
    pub fn check(&self, input: &str) -> Verdict {
        let normalized = normalize(input);
        if normalized.is_empty() {
            Verdict::Empty
        } else if self.answers.is_empty() || self.answers.contains(&normalized) {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

/// Dock status updates for the rendering collaborator
///
/// The display strings are fixed; how they are styled is the host's
/// business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateMessage {
    /// The input was empty; prompt the player for an answer
    EnterAnswer,
    /// The answer was wrong; the input stays for a retry
    WrongAnswer,
    /// The answer was correct
    Correct,
}

impl Display for UpdateMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::EnterAnswer => "enter an answer",
            Self::WrongAnswer => "wrong answer",
            Self::Correct => "correct",
        })
    }
}

/// Alarm messages for deferred dock navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Navigate to the page's success target
    NavigateToTarget {
        /// Destination URL as declared by the page
        url: String,
    },
}

/// One page's input-box-to-navigation controller
///
/// Wires a text input and a submit action to answer checking. Created
/// only when the page declares something to check or somewhere to go;
/// a page with neither renders no answer UI at all.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerDock {
    /// Accepted answers for this page
    answers: AnswerSet,
    /// Where to navigate on a correct answer, if anywhere
    target: Option<String>,
}

impl AnswerDock {
    /// Builds the dock from the page's declarative attributes
    ///
    /// Returns `None` when the answers declaration is absent or blank and
    /// no target is configured.
    pub fn from_page(answers_attr: Option<&str>, target: Option<&str>) -> Option<Self> {
        let declaration = answers_attr.map(str::trim).unwrap_or_default();
        let target = target.map(str::trim).filter(|t| !t.is_empty());
        if declaration.is_empty() && target.is_none() {
            return None;
        }
        Some(Self {
            answers: AnswerSet::parse(declaration),
            target: target.map(ToOwned::to_owned),
        })
    }

    /// The accepted answers declared for this page
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// The success navigation target, if one is configured
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Handles one submit action (button click or Enter key)
    ///
    /// Returns the status message to display. On a correct answer with a
    /// configured target, schedules the deferred success navigation
    /// through `schedule_message`; the host delivers the alarm back after
    /// the delay so the success message is seen first.
    pub fn submit<S: FnMut(crate::AlarmMessage, Duration)>(
        &self,
        input: &str,
        mut schedule_message: S,
    ) -> UpdateMessage {
        match self.answers.check(input) {
            Verdict::Empty => UpdateMessage::EnterAnswer,
            Verdict::Rejected => UpdateMessage::WrongAnswer,
            Verdict::Accepted => {
                if let Some(target) = &self.target {
                    schedule_message(
                        AlarmMessage::NavigateToTarget {
                            url: target.clone(),
                        }
                        .into(),
                        Duration::from_millis(SUCCESS_REDIRECT_DELAY_MS),
                    );
                }
                UpdateMessage::Correct
            }
        }
    }
}
