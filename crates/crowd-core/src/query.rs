//! Query strings understood by the user-management resource.
//!
//! Users and groups are addressed by name in the query string, never in the path.

use std::fmt;
use url::Url;

const USERNAME: &str = "username";
const GROUPNAME: &str = "groupname";
const EXPAND: &str = "expand";
const START_INDEX: &str = "start-index";
const MAX_RESULTS: &str = "max-results";

/// Nested entity to inline in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expand {
    /// The session's user.
    User,
    /// A user's extended attributes.
    Attributes,
}

impl Expand {
    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Attributes => "attributes",
        }
    }
}

impl fmt::Display for Expand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered query parameters for one request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    /// No parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `username=<name>`
    #[must_use]
    pub fn user(name: &str) -> Self {
        Self::new().with_user(name)
    }

    /// `groupname=<name>`
    #[must_use]
    pub fn group(name: &str) -> Self {
        Self::new().with_group(name)
    }

    /// `groupname=<group>&username=<user>`, addressing one membership.
    #[must_use]
    pub fn membership(group: &str, user: &str) -> Self {
        Self::group(group).with_user(user)
    }

    /// Append `username`.
    #[must_use]
    pub fn with_user(self, name: &str) -> Self {
        self.with(USERNAME, name)
    }

    /// Append `groupname`.
    #[must_use]
    pub fn with_group(self, name: &str) -> Self {
        self.with(GROUPNAME, name)
    }

    /// Append `expand`.
    #[must_use]
    pub fn expand(self, what: Expand) -> Self {
        self.with(EXPAND, what)
    }

    /// Append a result window starting at `start` with at most `max` entries.
    #[must_use]
    pub fn window(self, start: u32, max: u32) -> Self {
        self.with(START_INDEX, start).with(MAX_RESULTS, max)
    }

    fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.pairs.push((key, value.to_string()));
        self
    }

    /// Value of the first parameter named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if no parameters have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Percent-encode the parameters onto `url`, keeping their order.
    pub fn append_to(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        url.query_pairs_mut().extend_pairs(
            self.pairs
                .iter()
                .map(|(key, value)| (*key, value.as_str())),
        );
    }
}
