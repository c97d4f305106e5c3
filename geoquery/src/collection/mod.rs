//! Collections of stored objects and the traversal primitives the query
//! layer drives.
//!
//! The [`SpatialCollection`] trait is the narrow contract the executor
//! consumes. [`MemoryCollection`] is the in-process implementation backed by
//! an R-tree for geometries and an ordered map for string values.

mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::deadline::Deadline;
use crate::errors::SearchResult;
use crate::geometry::Geometry;

pub use memory::MemoryCollection;

/// The value an item holds: either a geometry or a plain string.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Geometry(Geometry),
    String(String),
}

/// A stored object: an id, its value and its numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    value: ItemValue,
    fields: BTreeMap<String, f64>,
}

impl Item {
    pub fn new(id: impl Into<String>, value: ItemValue) -> Self {
        Self {
            id: id.into(),
            value,
            fields: BTreeMap::new(),
        }
    }

    pub fn geometry(id: impl Into<String>, geometry: Geometry) -> Self {
        Self::new(id, ItemValue::Geometry(geometry))
    }

    pub fn string(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(id, ItemValue::String(value.into()))
    }

    /// Adds a numeric field.
    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &ItemValue {
        &self.value
    }

    /// The geometry for spatial items, `None` for strings.
    pub fn geo(&self) -> Option<&Geometry> {
        match &self.value {
            ItemValue::Geometry(g) => Some(g),
            ItemValue::String(_) => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            ItemValue::String(s) => Some(s),
            ItemValue::Geometry(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }
}

/// A cheap pre-filter a traversal may apply before invoking its callback.
pub trait CandidateFilter {
    fn accept_id(&self, id: &str) -> bool;
}

/// Accepts every candidate.
pub struct AcceptAll;

impl CandidateFilter for AcceptAll {
    fn accept_id(&self, _id: &str) -> bool {
        true
    }
}

/// Callback for traversals that report a distance in meters.
pub type DistanceVisitor<'a> = dyn FnMut(&Arc<Item>, f64) -> bool + 'a;

/// Callback for plain traversals. Returning `false` stops the traversal.
pub type ItemVisitor<'a> = dyn FnMut(&Arc<Item>) -> bool + 'a;

/// The traversal primitives of a collection.
///
/// Every traversal stops as soon as the visitor returns `false`, and
/// returns [`SearchError::Timeout`](crate::SearchError::Timeout) when the
/// deadline elapses before the traversal finishes. Implementations provide
/// their own concurrency safety; the query layer performs no locking.
pub trait SpatialCollection: Send + Sync {
    /// Total number of items in the collection.
    fn count(&self) -> usize;

    /// Looks up an item by id.
    fn get(&self, id: &str) -> Option<Arc<Item>>;

    /// Visits geometry items in ascending distance from the target circle's
    /// center. The distance reported is in meters.
    fn nearby(
        &self,
        target: &Geometry,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut DistanceVisitor<'_>,
    ) -> SearchResult<()>;

    /// Visits geometry items lying within the target. A non-zero `sparse`
    /// spreads the visit over `4^sparse` cells, one item per cell.
    fn within(
        &self,
        target: &Geometry,
        sparse: u8,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()>;

    /// Visits geometry items intersecting the target, with the same
    /// sparseness rule as [`within`](SpatialCollection::within).
    fn intersects(
        &self,
        target: &Geometry,
        sparse: u8,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()>;

    /// Visits every string item ordered by value.
    fn search_values(
        &self,
        desc: bool,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()>;

    /// Visits string items between `start` and `end` in traversal order.
    ///
    /// Ascending visits `start <= value < end`; descending starts below
    /// `start` and walks down to `end` inclusive.
    fn search_values_range(
        &self,
        start: &str,
        end: &str,
        desc: bool,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()>;
}

/// Resolves collection keys, as the server's key space does.
pub trait CollectionProvider {
    fn collection(&self, key: &str) -> Option<Arc<dyn SpatialCollection>>;
}
