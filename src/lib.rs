//! # Escape Game Core Library
//!
//! This library provides the core logic for a browser-hosted, team-based
//! escape game. It keeps a single countdown deadline alive and consistent
//! as a team navigates across independently loaded pages, and lets each
//! page verify a free-text answer against a set of accepted solutions
//! before advancing the team forward.
//!
//! The host environment (the page) supplies a durable key-value store, a
//! navigation primitive, and a declarative per-page configuration; the
//! library owns the timer state machine, answer verification, and the
//! per-page orchestration around them.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

use serde::{Deserialize, Serialize};

pub mod constants;

pub mod device;
pub mod dock;
pub mod navigation;
pub mod page;
pub mod store;
pub mod team;
pub mod timer;

/// Messages sent to the rendering collaborator to update its display
///
/// This enum aggregates every display-facing message the core can emit.
/// The core dictates content only (a formatted remaining time, a dock
/// status string); visual presentation belongs to the host page.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum UpdateMessage {
    /// Countdown display updates
    Timer(timer::UpdateMessage),
    /// Answer dock status updates
    Dock(dock::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Alarm messages for deferred events scheduled by the core
///
/// Alarms are handed to the host together with a delay; the host's timer
/// facility delivers them back through
/// [`page::PageController::receive_alarm`] once the delay elapses.
#[derive(Debug, Clone, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Answer dock alarms (deferred success navigation)
    Dock(dock::AlarmMessage),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_update_message_to_message() {
        let msg = UpdateMessage::Dock(dock::UpdateMessage::Correct);
        let json_str = msg.to_message();

        assert!(json_str.contains("Dock"));
        assert!(json_str.contains("Correct"));
    }

    #[test]
    fn test_timer_update_message_to_message() {
        let msg = UpdateMessage::Timer(timer::UpdateMessage::TimeRemaining {
            display: "29:59".to_string(),
            seconds: 1799,
        });
        let json_str = msg.to_message();

        assert!(json_str.contains("Timer"));
        assert!(json_str.contains("29:59"));
        assert!(json_str.contains("1799"));
    }

    #[test]
    fn test_alarm_message_round_trip() {
        let alarm = AlarmMessage::Dock(dock::AlarmMessage::NavigateToTarget {
            url: "/next.html".to_string(),
        });
        let json_str = serde_json::to_string(&alarm).unwrap();
        let back: AlarmMessage = serde_json::from_str(&json_str).unwrap();

        let AlarmMessage::Dock(dock::AlarmMessage::NavigateToTarget { url }) = back;
        assert_eq!(url, "/next.html");
    }
}
