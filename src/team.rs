//! Team identity resolution
//!
//! This module provides the team identifier type that scopes all persisted
//! state. Teams are identified by short tokens supplied through the page's
//! navigation context; the token is case-normalized so that `?team=a` and
//! `?team=A` act on the same countdown session.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::team::DEFAULT_TEAM;

/// A short token identifying which team's state a page instance acts on
///
/// Tokens are trimmed and normalized to uppercase on construction. An
/// absent or empty token falls back to the fixed default team, so every
/// page always operates on behalf of some team. The identifier is
/// immutable for the lifetime of a single page view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamId(String);

impl TeamId {
    /// Creates a team identifier from a raw token
    ///
    /// The token is trimmed and uppercased; an empty token yields the
    /// default team.
    pub fn new(token: &str) -> Self {
        let normalized = token.trim().to_uppercase();
        if normalized.is_empty() {
            Self(DEFAULT_TEAM.to_owned())
        } else {
            Self(normalized)
        }
    }

    /// Returns the normalized token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TeamId {
    /// The fixed default team used when no token is supplied
    fn default() -> Self {
        Self(DEFAULT_TEAM.to_owned())
    }
}

impl Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TeamId {
    /// Serializes the team identifier as its normalized token
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TeamId {
    /// Deserializes a team identifier, normalizing the token on the way in
    fn deserialize<D>(deserializer: D) -> Result<TeamId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Ok(TeamId::new(&token))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_team_id_uppercases() {
        assert_eq!(TeamId::new("b").as_str(), "B");
        assert_eq!(TeamId::new("red-3").as_str(), "RED-3");
    }

    #[test]
    fn test_team_id_trims() {
        assert_eq!(TeamId::new("  c  ").as_str(), "C");
    }

    #[test]
    fn test_empty_token_falls_back_to_default() {
        assert_eq!(TeamId::new("").as_str(), "A");
        assert_eq!(TeamId::new("   "), TeamId::default());
    }

    #[test]
    fn test_team_id_display() {
        assert_eq!(TeamId::new("blue").to_string(), "BLUE");
    }

    #[test]
    fn test_team_id_serde_normalizes() {
        let id: TeamId = serde_json::from_str("\" b \"").unwrap();
        assert_eq!(id.as_str(), "B");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"B\"");
    }
}
