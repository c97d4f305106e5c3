//! The option tokens shared by every search command.
//!
//! They follow the collection key and precede the target kind:
//!
//! ```text
//! NEARBY fleet CURSOR 10 LIMIT 5 MATCH truck* WHERE speed 10 +inf DISTANCE POINTS POINT 33 -115 500
//!        ^key  ^--------------------- base tokens --------------------------^ ^output ^target
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::collection::Item;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::script::{ScriptEngine, WhereEval};
use crate::search::cursor::{parse_f64, TokenCursor};
use crate::search::kinds::Command;

/// How matching items are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum OutputMode {
    Count,
    Ids,
    #[default]
    Objects,
    Points,
    Bounds,
    Hashes(u8),
}

/// A numeric range test on a field. Missing fields read as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereFilter {
    pub field: String,
    pub min: f64,
    pub min_exclusive: bool,
    pub max: f64,
    pub max_exclusive: bool,
}

impl WhereFilter {
    pub fn matches(&self, item: &Item) -> bool {
        let value = item.field(&self.field).unwrap_or(0.0);
        let above = if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        };
        let below = if self.max_exclusive {
            value < self.max
        } else {
            value <= self.max
        };
        above && below
    }
}

/// A set-membership test on a field.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereInFilter {
    pub field: String,
    pub values: Vec<f64>,
}

impl WhereInFilter {
    pub fn matches(&self, item: &Item) -> bool {
        let value = item.field(&self.field).unwrap_or(0.0);
        self.values.iter().any(|v| *v == value)
    }
}

/// Fence events a subscriber can ask to be notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum DetectEvent {
    Inside,
    Outside,
    Enter,
    Exit,
    Cross,
    Roam,
}

impl DetectEvent {
    fn parse(token: &str) -> Option<DetectEvent> {
        match token.to_ascii_lowercase().as_str() {
            "inside" => Some(DetectEvent::Inside),
            "outside" => Some(DetectEvent::Outside),
            "enter" => Some(DetectEvent::Enter),
            "exit" => Some(DetectEvent::Exit),
            "cross" => Some(DetectEvent::Cross),
            "roam" => Some(DetectEvent::Roam),
            _ => None,
        }
    }
}

/// Parsed base tokens of a search command.
#[derive(Debug, Default)]
pub struct BaseTokens {
    pub key: String,
    pub cursor: u64,
    pub limit: u64,
    pub has_limit: bool,
    pub sparse: u8,
    pub globs: Vec<String>,
    pub wheres: Vec<WhereFilter>,
    pub whereins: Vec<WhereInFilter>,
    pub whereevals: Vec<WhereEval>,
    pub nofields: bool,
    pub fence: bool,
    pub detect: Option<BTreeSet<DetectEvent>>,
    pub commands: Option<BTreeSet<String>>,
    pub distance: bool,
    pub clip: bool,
    pub buffer: Option<f64>,
    pub desc: bool,
    pub output: OutputMode,
}

impl BaseTokens {
    /// Parses the key, the options and the optional output mode.
    ///
    /// `fence` presets fence mode for commands arriving through a fence
    /// registration path.
    pub fn parse(
        command: Command,
        cursor: &mut TokenCursor<'_>,
        config: &SearchConfig,
        scripts: Option<&Arc<dyn ScriptEngine>>,
        fence: bool,
    ) -> SearchResult<BaseTokens> {
        let mut t = BaseTokens {
            key: cursor.expect()?,
            limit: config.default_limit(),
            fence,
            ..Default::default()
        };

        while let Some(token) = cursor.peek().map(str::to_ascii_lowercase) {
            match token.as_str() {
                "cursor" => {
                    cursor.next();
                    t.cursor = parse_u64(cursor)?;
                }
                "limit" => {
                    cursor.next();
                    t.limit = parse_u64(cursor)?;
                    t.has_limit = true;
                }
                "sparse" => {
                    cursor.next();
                    let raw = cursor.expect()?;
                    t.sparse = match raw.parse::<u8>() {
                        Ok(n) if n >= 1 && n <= config.max_sparse() => n,
                        _ => return Err(SearchError::invalid_argument(raw)),
                    };
                }
                "match" => {
                    cursor.next();
                    t.globs.push(cursor.expect()?);
                }
                "where" => {
                    cursor.next();
                    t.wheres.push(parse_where(cursor)?);
                }
                "wherein" => {
                    cursor.next();
                    t.whereins.push(parse_wherein(cursor)?);
                }
                "whereeval" => {
                    cursor.next();
                    let engine = scripts.ok_or_else(|| {
                        SearchError::Semantic("scripting is not available".to_string())
                    })?;
                    let script = cursor.expect()?;
                    let nargs = parse_count(cursor)?;
                    let mut args = Vec::with_capacity(nargs);
                    for _ in 0..nargs {
                        args.push(cursor.next().ok_or(SearchError::InvalidNumberOfArguments)?);
                    }
                    t.whereevals.push(WhereEval::compile(engine, &script, args)?);
                }
                "nofields" => {
                    cursor.next();
                    t.nofields = true;
                }
                "fence" => {
                    if command == Command::Search {
                        return Err(SearchError::invalid_argument(cursor.expect()?));
                    }
                    cursor.next();
                    t.fence = true;
                }
                "detect" => {
                    cursor.next();
                    let mut set = BTreeSet::new();
                    for name in cursor.expect()?.split(',').filter(|s| !s.is_empty()) {
                        let event = DetectEvent::parse(name)
                            .ok_or_else(|| SearchError::invalid_argument(name))?;
                        set.insert(event);
                    }
                    t.detect = Some(set);
                }
                "commands" => {
                    cursor.next();
                    let set = cursor
                        .expect()?
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(str::to_ascii_lowercase)
                        .collect();
                    t.commands = Some(set);
                }
                "distance" => {
                    cursor.next();
                    t.distance = true;
                }
                "clip" => {
                    cursor.next();
                    t.clip = true;
                }
                "buffer" => {
                    cursor.next();
                    let raw = cursor.expect()?;
                    match parse_f64(&raw) {
                        Ok(meters) if meters >= 0.0 => t.buffer = Some(meters),
                        _ => return Err(SearchError::invalid_argument(raw)),
                    }
                }
                "asc" => {
                    cursor.next();
                    t.desc = false;
                }
                "desc" => {
                    cursor.next();
                    t.desc = true;
                }
                _ => break,
            }
        }

        if let Some(token) = cursor.peek().map(str::to_ascii_lowercase) {
            let output = match token.as_str() {
                "count" => Some(OutputMode::Count),
                "ids" => Some(OutputMode::Ids),
                "objects" => Some(OutputMode::Objects),
                "points" => Some(OutputMode::Points),
                "bounds" => Some(OutputMode::Bounds),
                "hashes" => {
                    cursor.next();
                    let raw = cursor.expect()?;
                    match raw.parse::<u8>() {
                        Ok(p) if (1..=12).contains(&p) => Some(OutputMode::Hashes(p)),
                        _ => return Err(SearchError::invalid_argument(raw)),
                    }
                }
                _ => None,
            };
            if let Some(output) = output {
                if !matches!(output, OutputMode::Hashes(_)) {
                    cursor.next();
                }
                t.output = output;
            }
        }

        t.validate()?;
        Ok(t)
    }

    fn validate(&self) -> SearchResult<()> {
        if self.sparse > 0 && (self.has_limit || self.cursor > 0 || !self.wheres.is_empty()) {
            return Err(SearchError::Semantic(
                "cannot use SPARSE with LIMIT, CURSOR, or WHERE".to_string(),
            ));
        }
        if !self.fence && (self.detect.is_some() || self.commands.is_some()) {
            return Err(SearchError::Semantic(
                "DETECT and COMMANDS require FENCE".to_string(),
            ));
        }
        Ok(())
    }

    /// True when a `WHEREEVAL` clause holds evaluator resources.
    pub fn using_scripts(&self) -> bool {
        !self.whereevals.is_empty()
    }

    /// True when any field filter is active.
    pub fn has_filters(&self) -> bool {
        !self.wheres.is_empty() || !self.whereins.is_empty() || !self.whereevals.is_empty()
    }
}

fn parse_u64(cursor: &mut TokenCursor<'_>) -> SearchResult<u64> {
    let raw = cursor.expect()?;
    raw.parse::<u64>()
        .map_err(|_| SearchError::invalid_argument(raw))
}

fn parse_bound(raw: &str) -> SearchResult<(f64, bool)> {
    let (body, exclusive) = match raw.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };
    let value = match body.to_ascii_lowercase().as_str() {
        "-inf" => f64::NEG_INFINITY,
        "+inf" | "inf" => f64::INFINITY,
        _ => parse_f64(body).map_err(|_| SearchError::invalid_argument(raw))?,
    };
    Ok((value, exclusive))
}

/// Reads an argument count. A count larger than the tokens left is an
/// argument-count error.
fn parse_count(cursor: &mut TokenCursor<'_>) -> SearchResult<usize> {
    let count = parse_u64(cursor)?;
    match usize::try_from(count) {
        Ok(n) if n <= cursor.remaining() => Ok(n),
        _ => Err(SearchError::InvalidNumberOfArguments),
    }
}

fn parse_where(cursor: &mut TokenCursor<'_>) -> SearchResult<WhereFilter> {
    let field = cursor.expect()?;
    let (min, min_exclusive) = parse_bound(&cursor.expect()?)?;
    let (max, max_exclusive) = parse_bound(&cursor.expect()?)?;
    Ok(WhereFilter {
        field,
        min,
        min_exclusive,
        max,
        max_exclusive,
    })
}

fn parse_wherein(cursor: &mut TokenCursor<'_>) -> SearchResult<WhereInFilter> {
    let field = cursor.expect()?;
    let count = parse_count(cursor)?;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.expect_f64()?);
    }
    Ok(WhereInFilter { field, values })
}
