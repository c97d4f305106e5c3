//! The streaming sink every traversal pushes candidates into.
//!
//! A [`ScanWriter`] applies the match and guard logic (id or value globs,
//! spatial guard, field filters), cursor skipping and the limit, then
//! collects the results into a [`SearchReply`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::collection::{CandidateFilter, Item, ItemValue};
use crate::errors::{SearchError, SearchResult};
use crate::geometry::{to_geojson, BoundingBox, Coordinate, Geometry};
use crate::glob::Glob;
use crate::script::WhereEval;
use crate::search::base_tokens::{OutputMode, WhereFilter, WhereInFilter};
use crate::search::target::SearchDescriptor;
use crate::tile::TileCoord;

/// How a reply is meant to be framed by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Resp,
}

/// The rendered part of one result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    None,
    Object(Geometry),
    String(String),
    Point(Coordinate),
    Bounds(BoundingBox),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub id: String,
    pub value: ResultValue,
    pub fields: Option<BTreeMap<String, f64>>,
    pub distance: Option<f64>,
}

/// The outcome of a completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReply {
    pub ok: bool,
    pub format: OutputFormat,
    pub output: OutputMode,
    pub items: Vec<ResultItem>,
    pub count: u64,
    pub cursor: u64,
    pub tile: Option<TileCoord>,
    pub elapsed: Duration,
}

impl SearchReply {
    /// Ids of the returned items, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }

    /// Renders the reply as a JSON object with `ok` and `elapsed`.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("ok".into(), Value::Bool(self.ok));
        match self.output {
            OutputMode::Count => {
                out.insert("count".into(), json!(self.count));
            }
            OutputMode::Ids => {
                let ids: Vec<Value> = self.items.iter().map(|i| json!(i.id)).collect();
                out.insert("ids".into(), Value::Array(ids));
            }
            mode => {
                let name = match mode {
                    OutputMode::Points => "points",
                    OutputMode::Bounds => "bounds",
                    OutputMode::Hashes(_) => "hashes",
                    _ => "objects",
                };
                let items: Vec<Value> = self.items.iter().map(item_json).collect();
                out.insert(name.into(), Value::Array(items));
            }
        }
        if self.output != OutputMode::Count {
            out.insert("count".into(), json!(self.items.len()));
        }
        out.insert("cursor".into(), json!(self.cursor));
        if let Some(tile) = self.tile {
            out.insert("tile".into(), json!({"x": tile.x, "y": tile.y, "z": tile.z}));
        }
        out.insert("elapsed".into(), json!(format!("{:?}", self.elapsed)));
        Value::Object(out)
    }
}

fn latlon(c: &Coordinate) -> Value {
    json!({"lat": c.y, "lon": c.x})
}

fn item_json(item: &ResultItem) -> Value {
    let mut out = Map::new();
    out.insert("id".into(), json!(item.id));
    match &item.value {
        ResultValue::None => {}
        ResultValue::Object(g) => {
            out.insert("object".into(), to_geojson(g));
        }
        ResultValue::String(s) => {
            out.insert("object".into(), json!(s));
        }
        ResultValue::Point(c) => {
            out.insert("point".into(), latlon(c));
        }
        ResultValue::Bounds(b) => {
            let sw = Coordinate::new(b.min_x, b.min_y);
            let ne = Coordinate::new(b.max_x, b.max_y);
            out.insert("bounds".into(), json!({"sw": latlon(&sw), "ne": latlon(&ne)}));
        }
        ResultValue::Hash(h) => {
            out.insert("hash".into(), json!(h));
        }
    }
    if let Some(fields) = &item.fields {
        out.insert("fields".into(), json!(fields));
    }
    if let Some(distance) = item.distance {
        out.insert("distance".into(), json!(distance));
    }
    Value::Object(out)
}

/// Per-candidate options for [`ScanWriter::push`].
#[derive(Debug, Clone, Copy)]
pub struct PushParams<'a> {
    pub item: &'a Arc<Item>,
    pub distance: Option<f64>,
    pub clip: Option<&'a Geometry>,
    /// The traversal already applied the id globs.
    pub ignore_glob_match: bool,
    /// The traversal already applied the spatial test.
    pub skip_testing: bool,
}

impl<'a> PushParams<'a> {
    pub fn new(item: &'a Arc<Item>) -> Self {
        Self {
            item,
            distance: None,
            clip: None,
            ignore_glob_match: false,
            skip_testing: false,
        }
    }
}

pub struct ScanWriter<'a> {
    output: OutputMode,
    format: OutputFormat,
    cursor: u64,
    limit: u64,
    globs: Vec<Glob>,
    glob_everything: bool,
    match_values: bool,
    wheres: &'a [WhereFilter],
    whereins: &'a [WhereInFilter],
    whereevals: &'a [WhereEval],
    nofields: bool,
    guard: Option<BoundingBox>,
    tile: Option<TileCoord>,
    matched: u64,
    count: u64,
    items: Vec<ResultItem>,
    full: bool,
}

impl<'a> ScanWriter<'a> {
    /// Builds a writer for a resolved descriptor.
    ///
    /// `match_values` makes the globs apply to string values instead of ids,
    /// as value-ordered scans do.
    pub fn new(
        descriptor: &'a SearchDescriptor,
        format: OutputFormat,
        match_values: bool,
    ) -> SearchResult<Self> {
        let base = descriptor.base();
        let globs = base
            .globs
            .iter()
            .map(|p| Glob::new(p))
            .collect::<SearchResult<Vec<_>>>()?;
        let glob_everything = globs.is_empty() || globs.iter().any(Glob::matches_everything);
        Ok(Self {
            output: base.output,
            format,
            cursor: base.cursor,
            limit: base.limit,
            globs,
            glob_everything,
            match_values,
            wheres: &base.wheres,
            whereins: &base.whereins,
            whereevals: &base.whereevals,
            nofields: base.nofields,
            guard: descriptor.target().map(Geometry::bounding_box),
            tile: if descriptor.is_mvt() {
                descriptor.tile()
            } else {
                None
            },
            matched: 0,
            count: 0,
            items: Vec::new(),
            full: false,
        })
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    /// True when no glob narrows the scan.
    pub fn glob_everything(&self) -> bool {
        self.glob_everything
    }

    pub fn globs(&self) -> Vec<&str> {
        self.globs.iter().map(Glob::pattern).collect()
    }

    pub fn has_filters(&self) -> bool {
        !self.wheres.is_empty() || !self.whereins.is_empty() || !self.whereevals.is_empty()
    }

    /// Sets the count directly, for scans answered without traversal.
    pub fn set_count(&mut self, count: u64) {
        self.count = count;
    }

    /// The pre-filter handed to traversals: id globs for spatial scans,
    /// nothing for value scans.
    pub fn id_filter(&self) -> IdFilter {
        let narrowing = !self.match_values && !self.glob_everything;
        IdFilter {
            globs: narrowing.then(|| self.globs.clone()),
        }
    }

    /// True once the limit stopped the scan.
    pub fn is_full(&self) -> bool {
        self.full
    }

    fn glob_match(&self, item: &Item) -> bool {
        if self.glob_everything {
            return true;
        }
        let subject = if self.match_values {
            match item.string_value() {
                Some(value) => value,
                None => return false,
            }
        } else {
            item.id()
        };
        self.globs.iter().any(|g| g.matches(subject))
    }

    fn fields_match(&self, item: &Item) -> SearchResult<bool> {
        if !self.wheres.iter().all(|w| w.matches(item)) {
            return Ok(false);
        }
        if !self.whereins.iter().all(|w| w.matches(item)) {
            return Ok(false);
        }
        for we in self.whereevals {
            if !we.eval(item)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Offers one candidate. Returns whether the traversal should go on.
    pub fn push(&mut self, params: PushParams<'_>) -> SearchResult<bool> {
        if self.full {
            return Ok(false);
        }
        let item = params.item;
        if !params.ignore_glob_match && !self.glob_match(item) {
            return Ok(true);
        }
        if !params.skip_testing {
            if let (Some(guard), Some(geo)) = (&self.guard, item.geo()) {
                if !guard.intersects(&geo.bounding_box()) {
                    return Ok(true);
                }
            }
        }
        if !self.fields_match(item)? {
            return Ok(true);
        }

        self.matched += 1;
        if self.matched <= self.cursor {
            return Ok(true);
        }
        if self.output == OutputMode::Count {
            self.count += 1;
            return Ok(true);
        }

        let value = self.render_value(item, params.clip)?;
        let fields = if self.nofields || item.fields().is_empty() {
            None
        } else {
            Some(item.fields().clone())
        };
        self.items.push(ResultItem {
            id: item.id().to_string(),
            value,
            fields,
            distance: params.distance,
        });
        if self.limit > 0 && self.items.len() as u64 >= self.limit {
            self.full = true;
            return Ok(false);
        }
        Ok(true)
    }

    fn render_value(&self, item: &Item, clip: Option<&Geometry>) -> SearchResult<ResultValue> {
        let geo = match item.value() {
            ItemValue::String(s) => {
                return Ok(match self.output {
                    OutputMode::Ids => ResultValue::None,
                    _ => ResultValue::String(s.clone()),
                })
            }
            ItemValue::Geometry(g) => match clip {
                Some(clipper) => g.clip(&clipper.bounding_box()),
                None => g.clone(),
            },
        };
        Ok(match self.output {
            OutputMode::Ids | OutputMode::Count => ResultValue::None,
            OutputMode::Objects => ResultValue::Object(geo),
            OutputMode::Points => ResultValue::Point(geo.center()),
            OutputMode::Bounds => ResultValue::Bounds(geo.bounding_box()),
            OutputMode::Hashes(precision) => {
                let c = geo.center();
                let hash = geohash::encode(geohash::Coord { x: c.x, y: c.y }, precision as usize)
                    .map_err(|e| SearchError::Geometry(format!("'{}': {}", item.id(), e)))?;
                ResultValue::Hash(hash)
            }
        })
    }

    /// Finishes the scan and produces the reply.
    pub fn finish(self, elapsed: Duration) -> SearchReply {
        let cursor = if self.full {
            self.cursor + self.items.len() as u64
        } else {
            0
        };
        SearchReply {
            ok: true,
            format: self.format,
            output: self.output,
            count: if self.output == OutputMode::Count {
                self.count
            } else {
                self.items.len() as u64
            },
            items: self.items,
            cursor,
            tile: self.tile,
            elapsed,
        }
    }
}

/// The id pre-filter a traversal applies before pushing candidates.
#[derive(Debug, Clone)]
pub struct IdFilter {
    globs: Option<Vec<Glob>>,
}

impl CandidateFilter for IdFilter {
    fn accept_id(&self, id: &str) -> bool {
        match &self.globs {
            Some(globs) => globs.iter().any(|g| g.matches(id)),
            None => true,
        }
    }
}
