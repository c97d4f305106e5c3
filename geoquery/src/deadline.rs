use std::time::{Duration, Instant};

use crate::errors::{SearchError, SearchResult};

/// A caller supplied point in time after which a traversal must stop.
///
/// Traversals check it once per candidate, never more finely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: Some(instant) }
    }

    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    pub fn is_set(&self) -> bool {
        self.at.is_some()
    }

    pub fn expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Returns [`SearchError::Timeout`] once the deadline has passed.
    pub fn check(&self) -> SearchResult<()> {
        if self.expired() {
            Err(SearchError::Timeout)
        } else {
            Ok(())
        }
    }
}
