//! Configuration for the search engine.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::errors::{SearchError, SearchResult};

/// Upper bound for `max_sparse`; a factor of `n` spreads a scan over `4^n`
/// cells.
pub const SPARSE_LIMIT: u8 = 16;

/// Tunables shared by every command an engine executes.
///
/// # Examples
///
/// ```rust
/// use geoquery::SearchConfig;
///
/// let config = SearchConfig::from_json(r#"{"circle_steps": 32, "default_timeout_ms": 250}"#)
///     .unwrap()
///     .with_default_limit(50);
/// assert_eq!(config.circle_steps(), 32);
/// assert_eq!(config.default_limit(), 50);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    circle_steps: usize,
    mvt_expansion: f64,
    default_limit: u64,
    max_sparse: u8,
    #[serde(rename = "default_timeout_ms", deserialize_with = "deserialize_millis")]
    default_timeout: Option<Duration>,
    require_valid_geojson: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            circle_steps: 64,
            mvt_expansion: 0.1,
            default_limit: 100,
            max_sparse: 8,
            default_timeout: None,
            require_valid_geojson: false,
        }
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration document; absent keys keep their defaults.
    pub fn from_json(json: &str) -> SearchResult<Self> {
        let config: SearchConfig =
            serde_json::from_str(json).map_err(|e| SearchError::invalid_argument(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> SearchResult<()> {
        if self.circle_steps < 3 {
            return Err(SearchError::invalid_argument(format!(
                "circle_steps {}",
                self.circle_steps
            )));
        }
        if !self.mvt_expansion.is_finite() || self.mvt_expansion < 0.0 {
            return Err(SearchError::invalid_argument(format!(
                "mvt_expansion {}",
                self.mvt_expansion
            )));
        }
        if self.max_sparse > SPARSE_LIMIT {
            return Err(SearchError::invalid_argument(format!(
                "max_sparse {}",
                self.max_sparse
            )));
        }
        Ok(())
    }

    /// Number of vertices used when a circle is turned into a polygon.
    pub fn circle_steps(&self) -> usize {
        self.circle_steps
    }

    /// Fraction of a tile's size added on each side of an `MVT` rectangle.
    pub fn mvt_expansion(&self) -> f64 {
        self.mvt_expansion
    }

    /// Page size used when a command carries no `LIMIT`.
    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    /// Largest accepted `SPARSE` factor.
    pub fn max_sparse(&self) -> u8 {
        self.max_sparse
    }

    /// Timeout applied to messages that carry no deadline of their own.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Whether object literals must be strictly valid GeoJSON.
    pub fn require_valid_geojson(&self) -> bool {
        self.require_valid_geojson
    }

    pub fn with_circle_steps(mut self, steps: usize) -> Self {
        self.circle_steps = steps.max(3);
        self
    }

    pub fn with_mvt_expansion(mut self, fraction: f64) -> Self {
        self.mvt_expansion = if fraction.is_finite() { fraction.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_max_sparse(mut self, max_sparse: u8) -> Self {
        self.max_sparse = max_sparse.min(SPARSE_LIMIT);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_require_valid_geojson(mut self, strict: bool) -> Self {
        self.require_valid_geojson = strict;
        self
    }
}
