use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::PI;
use std::sync::Arc;

use parking_lot::RwLock;
use rstar::{RTree, RTreeObject, AABB};

use crate::collection::{
    CandidateFilter, DistanceVisitor, Item, ItemValue, ItemVisitor, SpatialCollection,
};
use crate::config::SPARSE_LIMIT;
use crate::deadline::Deadline;
use crate::errors::SearchResult;
use crate::geometry::{BoundingBox, Coordinate, Geometry, EARTH_RADIUS_METERS};

/// An R-tree entry: the item id and the envelope of its geometry.
#[derive(Debug, Clone, PartialEq)]
struct IndexEntry {
    id: String,
    envelope: AABB<[f64; 2]>,
}

impl IndexEntry {
    fn new(id: &str, bbox: &BoundingBox) -> Self {
        Self {
            id: id.to_string(),
            envelope: to_aabb(bbox),
        }
    }
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y])
}

const WORLD: BoundingBox = BoundingBox {
    min_x: -180.0,
    min_y: -90.0,
    max_x: 180.0,
    max_y: 90.0,
};

const FIRST_RING_METERS: f64 = 1_000.0;

/// A box holding every coordinate within `meters` of `center`, or `None`
/// when that is the whole world.
///
/// The longitude span is taken at the most poleward latitude the ring
/// reaches; a ring crossing a pole or the antimeridian spans all longitudes.
fn ring_box(center: &Coordinate, meters: f64) -> Option<BoundingBox> {
    let angle = meters / EARTH_RADIUS_METERS;
    if angle >= PI {
        return None;
    }
    let dlat = angle.to_degrees();
    let (min_y, max_y) = (center.y - dlat, center.y + dlat);
    if min_y <= -90.0 && max_y >= 90.0 {
        return None;
    }
    let poleward = center.y.abs() + dlat;
    let (min_x, max_x) = if poleward >= 90.0 {
        (-180.0, 180.0)
    } else {
        let s = (angle / 2.0).sin() / poleward.to_radians().cos();
        if s >= 1.0 {
            (-180.0, 180.0)
        } else {
            let dlon = (2.0 * s.asin()).to_degrees();
            if center.x - dlon < -180.0 || center.x + dlon > 180.0 {
                (-180.0, 180.0)
            } else {
                (center.x - dlon, center.x + dlon)
            }
        }
    };
    Some(BoundingBox::new(min_x, min_y.max(-90.0), max_x, max_y.min(90.0)))
}

#[derive(Default)]
struct Inner {
    items: HashMap<String, Arc<Item>>,
    rtree: RTree<IndexEntry>,
    values: BTreeMap<(String, String), Arc<Item>>,
}

impl Inner {
    fn remove(&mut self, id: &str) -> Option<Arc<Item>> {
        let item = self.items.remove(id)?;
        match item.value() {
            ItemValue::Geometry(g) => {
                self.rtree.remove(&IndexEntry::new(id, &g.bounding_box()));
            }
            ItemValue::String(s) => {
                self.values.remove(&(s.clone(), id.to_string()));
            }
        }
        Some(item)
    }

    fn candidates(&self, bbox: &BoundingBox) -> Vec<Arc<Item>> {
        let mut ids: Vec<&str> = self
            .rtree
            .locate_in_envelope_intersecting(&to_aabb(bbox))
            .map(|e| e.id.as_str())
            .collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect()
    }
}

/// A thread-safe in-memory collection.
///
/// Reads take a shared lock for the duration of a traversal; writers are
/// expected to be rare compared to searches.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an item, returning the previous one.
    pub fn set(&self, item: Item) -> Option<Arc<Item>> {
        let mut inner = self.inner.write();
        let previous = inner.remove(item.id());
        let item = Arc::new(item);
        match item.value() {
            ItemValue::Geometry(g) => {
                let entry = IndexEntry::new(item.id(), &g.bounding_box());
                inner.rtree.insert(entry);
            }
            ItemValue::String(s) => {
                let key = (s.clone(), item.id().to_string());
                inner.values.insert(key, item.clone());
            }
        }
        inner.items.insert(item.id().to_string(), item);
        previous
    }

    pub fn delete(&self, id: &str) -> Option<Arc<Item>> {
        self.inner.write().remove(id)
    }

    /// Visits spatial candidates matching `predicate`, optionally spread over
    /// a grid of cells with at most one item per cell.
    fn spatial_scan(
        &self,
        target: &Geometry,
        sparse: u8,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        predicate: impl Fn(&Geometry) -> bool,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        let inner = self.inner.read();
        let bbox = target.bounding_box();
        if sparse == 0 {
            for item in inner.candidates(&bbox) {
                deadline.check()?;
                if !filter.accept_id(item.id()) {
                    continue;
                }
                if item.geo().is_some_and(&predicate) && !visit(&item) {
                    return Ok(());
                }
            }
            return Ok(());
        }

        let side = 1u32 << sparse.min(SPARSE_LIMIT);
        let cell_w = bbox.width() / side as f64;
        let cell_h = bbox.height() / side as f64;
        let mut seen = HashSet::new();
        for row in 0..side {
            for col in 0..side {
                deadline.check()?;
                let cell = BoundingBox::new(
                    bbox.min_x + cell_w * col as f64,
                    bbox.min_y + cell_h * row as f64,
                    bbox.min_x + cell_w * (col + 1) as f64,
                    bbox.min_y + cell_h * (row + 1) as f64,
                );
                for item in inner.candidates(&cell) {
                    deadline.check()?;
                    if seen.contains(item.id()) || !filter.accept_id(item.id()) {
                        continue;
                    }
                    if item.geo().is_some_and(&predicate) {
                        seen.insert(item.id().to_string());
                        if !visit(&item) {
                            return Ok(());
                        }
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn value_scan<'a>(
        items: impl Iterator<Item = &'a Arc<Item>>,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        for item in items {
            deadline.check()?;
            if filter.accept_id(item.id()) && !visit(item) {
                break;
            }
        }
        Ok(())
    }
}

impl SpatialCollection for MemoryCollection {
    fn count(&self) -> usize {
        self.inner.read().items.len()
    }

    fn get(&self, id: &str) -> Option<Arc<Item>> {
        self.inner.read().items.get(id).cloned()
    }

    fn nearby(
        &self,
        target: &Geometry,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut DistanceVisitor<'_>,
    ) -> SearchResult<()> {
        let inner = self.inner.read();
        let center = target.center();
        let bound = target.as_circle().map(|c| c.meters).filter(|m| *m > 0.0);
        let total = inner.rtree.size();

        // Rings of growing radius; each ring emits, in (distance, id) order,
        // the items within its radius that earlier rings did not.
        let mut settled: HashSet<&str> = HashSet::new();
        let mut radius = bound.map_or(FIRST_RING_METERS, |m| m.min(FIRST_RING_METERS));
        loop {
            deadline.check()?;
            let area = ring_box(&center, radius);
            let last = area.is_none() || bound.is_some_and(|m| radius >= m);
            let envelope = area.map_or_else(|| to_aabb(&WORLD), |b| to_aabb(&b));

            let mut ring: Vec<(f64, &Arc<Item>)> = Vec::new();
            for entry in inner.rtree.locate_in_envelope_intersecting(&envelope) {
                deadline.check()?;
                let id = entry.id.as_str();
                if settled.contains(id) {
                    continue;
                }
                if !filter.accept_id(id) {
                    settled.insert(id);
                    continue;
                }
                let Some(item) = inner.items.get(id) else {
                    continue;
                };
                let Some(geo) = item.geo() else {
                    continue;
                };
                let dist = geo.distance_to_point(&center);
                if last || dist <= radius {
                    settled.insert(id);
                    ring.push((dist, item));
                }
            }
            ring.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id().cmp(b.1.id())));
            for (dist, item) in ring {
                if !visit(item, dist) {
                    return Ok(());
                }
            }

            if last || settled.len() >= total {
                return Ok(());
            }
            radius = match bound {
                Some(m) => (radius * 2.0).min(m),
                None => radius * 2.0,
            };
        }
    }

    fn within(
        &self,
        target: &Geometry,
        sparse: u8,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        self.spatial_scan(target, sparse, filter, deadline, |g| g.within(target), visit)
    }

    fn intersects(
        &self,
        target: &Geometry,
        sparse: u8,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        self.spatial_scan(target, sparse, filter, deadline, |g| g.intersects(target), visit)
    }

    fn search_values(
        &self,
        desc: bool,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        let inner = self.inner.read();
        if desc {
            Self::value_scan(inner.values.values().rev(), filter, deadline, visit)
        } else {
            Self::value_scan(inner.values.values(), filter, deadline, visit)
        }
    }

    fn search_values_range(
        &self,
        start: &str,
        end: &str,
        desc: bool,
        filter: &dyn CandidateFilter,
        deadline: &Deadline,
        visit: &mut ItemVisitor<'_>,
    ) -> SearchResult<()> {
        let inner = self.inner.read();
        let key = |s: &str| (s.to_string(), String::new());
        if desc {
            if end >= start {
                return Ok(());
            }
            let range = inner.values.range(key(end)..key(start));
            Self::value_scan(range.map(|(_, v)| v).rev(), filter, deadline, visit)
        } else {
            if start >= end {
                return Ok(());
            }
            let range = inner.values.range(key(start)..key(end));
            Self::value_scan(range.map(|(_, v)| v), filter, deadline, visit)
        }
    }
}
