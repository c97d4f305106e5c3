//! Geometry types used as search targets and stored objects.
//!
//! This module provides the geometry representations that the query layer
//! resolves targets into and that collections store:
//! - Points, circles (with an unbounded sentinel for nearest-neighbor mode)
//!   and rectangles
//! - Line strings, polygons with holes, and multi-geometries parsed from GeoJSON
//!
//! All coordinates are geographic: x is longitude and y is latitude.
//! Distances are reported in meters using the haversine formula; the
//! topological predicates work in degree space except where a circle is
//! involved, which is always measured geodesically.

mod bounding_box;
mod clip;
mod geodesic;
mod geojson;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

pub use bounding_box::BoundingBox;
pub use geodesic::{
    circle_ring, destination, haversine_distance, meters_to_lat_degrees, meters_to_lon_degrees,
    sector_polygon, EARTH_RADIUS_METERS,
};
pub use geojson::{parse_geojson, to_geojson};

/// A 2D coordinate (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_meters(&self, other: &Coordinate) -> f64 {
        haversine_distance(self.y, self.x, other.y, other.x)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    coordinate: Coordinate,
}

impl Point {
    /// Creates a new point at the given coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            coordinate: Coordinate::new(x, y),
        }
    }

    /// Creates a point from latitude and longitude, in that order.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self::new(lon, lat)
    }

    pub fn x(&self) -> f64 {
        self.coordinate.x
    }

    pub fn y(&self) -> f64 {
        self.coordinate.y
    }

    pub fn lat(&self) -> f64 {
        self.coordinate.y
    }

    pub fn lon(&self) -> f64 {
        self.coordinate.x
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POINT({} {})", self.coordinate.x, self.coordinate.y)
    }
}

/// A geodesic circle around a center point.
///
/// A negative radius is the unbounded sentinel: the circle stands for its
/// center only and the search it drives is a nearest-neighbor scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub meters: f64,
    pub steps: usize,
}

impl Circle {
    pub fn new(center: Point, meters: f64, steps: usize) -> Self {
        Self {
            center,
            meters,
            steps,
        }
    }

    /// Returns true when the circle carries the unbounded sentinel radius.
    pub fn is_unbounded(&self) -> bool {
        self.meters < 0.0
    }

    pub fn bounding_box(&self) -> BoundingBox {
        if self.is_unbounded() {
            return BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        }
        let dy = meters_to_lat_degrees(self.meters);
        let dx = meters_to_lon_degrees(self.meters, self.center.lat());
        BoundingBox::new(
            self.center.x() - dx,
            self.center.y() - dy,
            self.center.x() + dx,
            self.center.y() + dy,
        )
    }

    pub fn contains_coord(&self, c: &Coordinate) -> bool {
        self.is_unbounded() || self.center.coordinate().distance_meters(c) <= self.meters
    }

    /// Approximates the circle with a polygon of `steps` vertices.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(circle_ring(self.center.coordinate(), self.meters.max(0.0), self.steps), vec![])
    }
}

/// A polygon with an exterior ring and optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<Coordinate>,
    pub holes: Vec<Vec<Coordinate>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Coordinate>, holes: Vec<Vec<Coordinate>>) -> Self {
        Self { exterior, holes }
    }

    pub fn contains_coord(&self, c: &Coordinate) -> bool {
        point_in_ring(c, &self.exterior) && !self.holes.iter().any(|h| point_in_ring(c, h))
    }
}

/// A geometry that can be searched for or stored in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Point),
    Circle(Circle),
    Rect(BoundingBox),
    LineString(Vec<Coordinate>),
    Polygon(Polygon),
    /// Any multi-part geometry or collection; empty means "nothing".
    Multi(Vec<Geometry>),
}

impl Geometry {
    /// Creates a point geometry from x (longitude) and y (latitude).
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Point::new(x, y))
    }

    pub fn circle(center: Point, meters: f64, steps: usize) -> Self {
        Geometry::Circle(Circle::new(center, meters, steps))
    }

    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Geometry::Rect(BoundingBox::new(min_x, min_y, max_x, max_y))
    }

    pub fn empty() -> Self {
        Geometry::Multi(vec![])
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Multi(parts) => parts.iter().all(|g| g.is_empty()),
            Geometry::LineString(coords) => coords.is_empty(),
            Geometry::Polygon(p) => p.exterior.is_empty(),
            _ => false,
        }
    }

    /// Returns true for geometries that enclose an area.
    pub fn is_areal(&self) -> bool {
        match self {
            Geometry::Circle(c) => !c.is_unbounded(),
            Geometry::Rect(_) | Geometry::Polygon(_) => true,
            Geometry::Multi(parts) => parts.iter().any(|g| g.is_areal()),
            _ => false,
        }
    }

    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            Geometry::Circle(c) => Some(c),
            _ => None,
        }
    }

    /// Gets the bounding box of this geometry.
    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Geometry::Point(p) => BoundingBox::new(p.x(), p.y(), p.x(), p.y()),
            Geometry::Circle(c) => c.bounding_box(),
            Geometry::Rect(r) => r.clone(),
            Geometry::LineString(coords) => coords_bounding_box(coords),
            Geometry::Polygon(p) => coords_bounding_box(&p.exterior),
            Geometry::Multi(parts) => parts
                .iter()
                .filter(|g| !g.is_empty())
                .map(|g| g.bounding_box())
                .reduce(|a, b| a.union(&b))
                .unwrap_or_default(),
        }
    }

    /// Gets the representative center of this geometry.
    pub fn center(&self) -> Coordinate {
        match self {
            Geometry::Point(p) => *p.coordinate(),
            Geometry::Circle(c) => *c.center.coordinate(),
            _ => self.bounding_box().center(),
        }
    }

    /// Returns every vertex of the geometry; circles are expanded to their polygon.
    pub fn vertices(&self) -> Vec<Coordinate> {
        match self {
            Geometry::Point(p) => vec![*p.coordinate()],
            Geometry::Circle(c) if c.is_unbounded() => vec![*c.center.coordinate()],
            Geometry::Circle(c) => c.to_polygon().exterior,
            Geometry::Rect(r) => r.ring(),
            Geometry::LineString(coords) => coords.clone(),
            Geometry::Polygon(p) => p
                .exterior
                .iter()
                .chain(p.holes.iter().flatten())
                .copied()
                .collect(),
            Geometry::Multi(parts) => parts.iter().flat_map(|g| g.vertices()).collect(),
        }
    }

    /// Returns every edge of the geometry.
    pub fn segments(&self) -> Vec<(Coordinate, Coordinate)> {
        fn edges(coords: &[Coordinate]) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
            coords.windows(2).map(|w| (w[0], w[1]))
        }
        match self {
            Geometry::Point(_) => vec![],
            Geometry::Circle(c) if c.is_unbounded() => vec![],
            Geometry::Circle(c) => edges(&c.to_polygon().exterior).collect(),
            Geometry::Rect(r) => edges(&r.ring()).collect(),
            Geometry::LineString(coords) => edges(coords).collect(),
            Geometry::Polygon(p) => {
                let mut out: Vec<_> = edges(&p.exterior).collect();
                for hole in &p.holes {
                    out.extend(edges(hole));
                }
                out
            }
            Geometry::Multi(parts) => parts.iter().flat_map(|g| g.segments()).collect(),
        }
    }

    /// Checks whether a coordinate lies in or on this geometry.
    pub fn contains_coord(&self, c: &Coordinate) -> bool {
        match self {
            Geometry::Point(p) => p.coordinate() == c,
            Geometry::Circle(circle) => circle.contains_coord(c),
            Geometry::Rect(r) => r.contains_point(c.x, c.y),
            Geometry::LineString(coords) => coords
                .windows(2)
                .any(|w| point_on_segment(c, &w[0], &w[1]))
                || (coords.len() == 1 && coords[0] == *c),
            Geometry::Polygon(p) => p.contains_coord(c),
            Geometry::Multi(parts) => parts.iter().any(|g| g.contains_coord(c)),
        }
    }

    /// Checks if this geometry shares any portion of space with another.
    pub fn intersects(&self, other: &Geometry) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if !self.bounding_box().intersects(&other.bounding_box()) {
            return false;
        }
        match (self, other) {
            (Geometry::Multi(parts), _) => parts.iter().any(|g| g.intersects(other)),
            (_, Geometry::Multi(parts)) => parts.iter().any(|g| self.intersects(g)),
            (Geometry::Circle(a), Geometry::Circle(b)) => {
                a.is_unbounded()
                    || b.is_unbounded()
                    || a.center.coordinate().distance_meters(b.center.coordinate())
                        <= a.meters + b.meters
            }
            (Geometry::Circle(c), g) | (g, Geometry::Circle(c)) => {
                c.is_unbounded() || g.distance_to_point(c.center.coordinate()) <= c.meters
            }
            _ => {
                self.vertices().iter().any(|c| other.contains_coord(c))
                    || other.vertices().iter().any(|c| self.contains_coord(c))
                    || segments_cross(&self.segments(), &other.segments(), false)
            }
        }
    }

    /// Checks if this geometry lies entirely inside `container`.
    pub fn within(&self, container: &Geometry) -> bool {
        if self.is_empty() || container.is_empty() {
            return false;
        }
        if let Geometry::Multi(parts) = self {
            return parts.iter().all(|g| g.is_empty() || g.within(container));
        }
        let unbounded = matches!(container, Geometry::Circle(c) if c.is_unbounded());
        if !unbounded && !container.bounding_box().contains(&self.bounding_box()) {
            return false;
        }
        match container {
            Geometry::Multi(parts) => parts.iter().any(|g| self.within(g)),
            Geometry::Circle(outer) => match self {
                Geometry::Circle(inner) if !inner.is_unbounded() => {
                    outer.is_unbounded()
                        || outer.center.coordinate().distance_meters(inner.center.coordinate())
                            + inner.meters
                            <= outer.meters
                }
                _ => self.vertices().iter().all(|c| outer.contains_coord(c)),
            },
            Geometry::Rect(_) | Geometry::Polygon(_) => {
                self.vertices().iter().all(|c| container.contains_coord(c))
                    && !segments_cross(&self.segments(), &container.segments(), true)
            }
            Geometry::Point(_) | Geometry::LineString(_) => {
                !self.is_areal() && self.vertices().iter().all(|c| container.contains_coord(c))
            }
        }
    }

    /// Distance in meters from a coordinate to the nearest part of this geometry.
    pub fn distance_to_point(&self, c: &Coordinate) -> f64 {
        match self {
            Geometry::Point(p) => p.coordinate().distance_meters(c),
            Geometry::Circle(circle) => {
                if circle.is_unbounded() {
                    return 0.0;
                }
                (circle.center.coordinate().distance_meters(c) - circle.meters).max(0.0)
            }
            Geometry::Multi(parts) => parts
                .iter()
                .filter(|g| !g.is_empty())
                .map(|g| g.distance_to_point(c))
                .fold(f64::INFINITY, f64::min),
            _ => {
                if self.contains_coord(c) {
                    return 0.0;
                }
                let segments = self.segments();
                if segments.is_empty() {
                    return self
                        .vertices()
                        .iter()
                        .map(|v| v.distance_meters(c))
                        .fold(f64::INFINITY, f64::min);
                }
                segments
                    .iter()
                    .map(|(a, b)| geodesic::segment_distance_meters(c, a, b))
                    .fold(f64::INFINITY, f64::min)
            }
        }
    }

    /// Center-to-center distance in meters between two geometries.
    pub fn distance(&self, other: &Geometry) -> f64 {
        self.center().distance_meters(&other.center())
    }

    /// Restricts this geometry to the portion overlapping `rect`.
    pub fn clip(&self, rect: &BoundingBox) -> Geometry {
        clip::clip_geometry(self, rect)
    }

    /// Inflates this geometry by `meters`.
    ///
    /// Points become circles, circles grow, and everything else becomes its
    /// bounding box grown by the distance.
    pub fn buffer(&self, meters: f64, steps: usize) -> Geometry {
        if meters <= 0.0 {
            return self.clone();
        }
        match self {
            Geometry::Point(p) => Geometry::Polygon(Polygon::new(
                circle_ring(p.coordinate(), meters, steps),
                vec![],
            )),
            Geometry::Circle(c) if !c.is_unbounded() => {
                Geometry::Circle(Circle::new(c.center, c.meters + meters, c.steps))
            }
            _ => {
                let bbox = self.bounding_box();
                let dy = meters_to_lat_degrees(meters);
                let dx = meters_to_lon_degrees(meters, bbox.center().y);
                Geometry::Rect(bbox.expand(dx, dy))
            }
        }
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "{}", p),
            Geometry::Circle(c) => {
                write!(f, "CIRCLE({} {}, {}m)", c.center.x(), c.center.y(), c.meters)
            }
            Geometry::Rect(r) => write!(f, "{}", r),
            other => write!(f, "{}", to_geojson(other)),
        }
    }
}

fn coords_bounding_box(coords: &[Coordinate]) -> BoundingBox {
    if coords.is_empty() {
        return BoundingBox::default();
    }
    let mut bbox = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
    for c in coords {
        bbox.min_x = bbox.min_x.min(c.x);
        bbox.min_y = bbox.min_y.min(c.y);
        bbox.max_x = bbox.max_x.max(c.x);
        bbox.max_y = bbox.max_y.max(c.y);
    }
    bbox
}

/// Ray casting test; rings may be open or closed.
fn point_in_ring(point: &Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    if ring.windows(2).any(|w| point_on_segment(point, &w[0], &w[1])) {
        return true;
    }

    let mut inside = false;
    let n = ring.len();
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].x, ring[i].y);
        let (xj, yj) = (ring[j].x, ring[j].y);
        if ((yi > point.y) != (yj > point.y))
            && (point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn orientation(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn point_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> bool {
    orientation(a, b, p).abs() <= 1e-12
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// With `proper` set, touching or collinear contact does not count as crossing.
fn segments_cross(
    left: &[(Coordinate, Coordinate)],
    right: &[(Coordinate, Coordinate)],
    proper: bool,
) -> bool {
    left.iter().any(|(a, b)| {
        right.iter().any(|(c, d)| {
            let o1 = orientation(a, b, c);
            let o2 = orientation(a, b, d);
            let o3 = orientation(c, d, a);
            let o4 = orientation(c, d, b);
            if o1 * o2 < 0.0 && o3 * o4 < 0.0 {
                return true;
            }
            !proper
                && (point_on_segment(c, a, b)
                    || point_on_segment(d, a, b)
                    || point_on_segment(a, c, d)
                    || point_on_segment(b, c, d))
        })
    })
}
