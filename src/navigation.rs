//! Team-preserving navigation
//!
//! This module builds outgoing URLs that carry the team identifier forward
//! and performs the actual page navigation through a host-provided
//! primitive. The navigation seam is a trait so that production code can
//! drive the browser's location while tests record where the core tried
//! to go.

use url::Url;

use crate::{constants::team::QUERY_PARAM, team::TeamId};

/// Trait for performing a page navigation
///
/// This trait abstracts the host's navigation primitive (setting
/// `location.href` in a browser). Navigating after the page is torn down
/// is inherently safe to attempt; implementations simply do nothing once
/// the page is gone.
pub trait Navigator {
    /// Navigates the current page to `url`
    fn navigate(&mut self, url: &str);
}

/// Builds team-carrying URLs and navigates to them
///
/// Holds an optional base URL (the current page) used to resolve relative
/// destinations, and the host's [`Navigator`].
#[derive(Debug)]
pub struct NavigationHelper<N> {
    /// Base URL for resolving relative destinations, when known
    base: Option<Url>,
    /// Host-provided navigation primitive
    navigator: N,
}

impl<N: Navigator> NavigationHelper<N> {
    /// Creates a helper with an optional base URL for relative resolution
    ///
    /// A base that does not parse as an absolute URL is ignored; relative
    /// destinations then go through the concatenation fallback.
    pub fn new(navigator: N, base: Option<&str>) -> Self {
        Self {
            base: base.and_then(|b| Url::parse(b).ok()),
            navigator,
        }
    }

    /// Returns `url` with the team parameter set to `team`
    ///
    /// An existing non-empty team parameter is never overwritten. When the
    /// URL cannot be parsed structurally (and cannot be resolved against
    /// the base), a naive fallback splices the parameter onto the raw
    /// string instead; this method never fails.
    pub fn append_team_param(&self, url: &str, team: &TeamId) -> String {
        match Url::options().base_url(self.base.as_ref()).parse(url) {
            Ok(mut parsed) => {
                if has_team_pair(parsed.query_pairs()) {
                    return parsed.to_string();
                }
                // drop any empty-valued team leftovers before appending
                let retained: Vec<(String, String)> = parsed
                    .query_pairs()
                    .filter(|(key, _)| key != QUERY_PARAM)
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                {
                    let mut pairs = parsed.query_pairs_mut();
                    pairs.clear();
                    for (key, value) in &retained {
                        pairs.append_pair(key, value);
                    }
                    pairs.append_pair(QUERY_PARAM, team.as_str());
                }
                parsed.to_string()
            }
            Err(_) => concat_fallback(url, team),
        }
    }

    /// Navigates to `dest` with the team parameter carried along
    pub fn go_with_team(&mut self, dest: &str, team: &TeamId) {
        let url = self.append_team_param(dest, team);
        self.navigator.navigate(&url);
    }
}

/// Whether an iterator of query pairs contains a non-empty team parameter
fn has_team_pair<'a>(
    mut pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
) -> bool {
    pairs.any(|(key, value)| key == QUERY_PARAM && !value.is_empty())
}

/// String-splicing fallback for URLs that defeat structured parsing
///
/// Chooses `&` vs `?` based on whether the raw string already carries a
/// query, and still refuses to shadow an existing non-empty team
/// parameter.
fn concat_fallback(url: &str, team: &TeamId) -> String {
    let query = url
        .split_once('?')
        .map(|(_, rest)| rest)
        .unwrap_or("")
        .split('#')
        .next()
        .unwrap_or("");
    let already_present = query.split('&').any(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        key == QUERY_PARAM && !value.is_empty()
    });
    if already_present {
        return url.to_owned();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    let encoded: String = url::form_urlencoded::byte_serialize(team.as_str().as_bytes()).collect();
    format!("{url}{sep}{QUERY_PARAM}={encoded}")
}
