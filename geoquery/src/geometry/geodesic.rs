//! Geodesic helpers: haversine distance, destination points, and the
//! polygons generated from an origin and a radius.

use crate::geometry::{Coordinate, Polygon};

/// Earth's mean radius in meters (WGS84)
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Calculates the great-circle distance between two points using the Haversine formula.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_METERS * c
}

/// Converts a north-south distance to degrees of latitude.
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Converts an east-west distance to degrees of longitude at `latitude`.
///
/// Near the poles the conversion saturates at the full longitude range.
pub fn meters_to_lon_degrees(meters: f64, latitude: f64) -> f64 {
    let cos = latitude.to_radians().cos();
    if cos <= 1e-9 {
        return 360.0;
    }
    (meters / (METERS_PER_DEGREE * cos)).min(360.0)
}

/// Returns the point reached by travelling `meters` from `origin` on `bearing` degrees.
pub fn destination(origin: &Coordinate, bearing: f64, meters: f64) -> Coordinate {
    let delta = meters / EARTH_RADIUS_METERS;
    let theta = bearing.to_radians();
    let phi1 = origin.y.to_radians();
    let lambda1 = origin.x.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lon = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinate::new(lon, phi2.to_degrees())
}

/// Builds a closed ring approximating a circle with `steps` vertices.
pub fn circle_ring(center: &Coordinate, meters: f64, steps: usize) -> Vec<Coordinate> {
    let steps = steps.max(3);
    let mut ring: Vec<Coordinate> = (0..steps)
        .map(|i| destination(center, 360.0 * i as f64 / steps as f64, meters))
        .collect();
    ring.push(ring[0]);
    ring
}

/// Builds the pie-slice polygon swept clockwise from `bearing1` to `bearing2`.
///
/// `steps` is the number of arc vertices a full circle would use; the arc
/// gets a proportional share of them.
pub fn sector_polygon(
    origin: &Coordinate,
    meters: f64,
    bearing1: f64,
    bearing2: f64,
    steps: usize,
) -> Polygon {
    let start = bearing1.rem_euclid(360.0);
    let mut end = bearing2.rem_euclid(360.0);
    if end <= start {
        end += 360.0;
    }
    let sweep = end - start;
    let arc_steps = ((sweep / 360.0) * steps as f64).ceil().max(2.0) as usize;

    let mut ring = Vec::with_capacity(arc_steps + 3);
    ring.push(*origin);
    for i in 0..=arc_steps {
        let bearing = start + sweep * i as f64 / arc_steps as f64;
        ring.push(destination(origin, bearing, meters));
    }
    ring.push(*origin);
    Polygon::new(ring, vec![])
}

/// Approximate distance in meters from `p` to the segment `a`-`b`.
///
/// The segment is projected onto an equirectangular plane centered on `p`,
/// which is accurate for the short distances proximity queries use.
pub(crate) fn segment_distance_meters(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let scale_x = METERS_PER_DEGREE * p.y.to_radians().cos();
    let project = |c: &Coordinate| ((c.x - p.x) * scale_x, (c.y - p.y) * METERS_PER_DEGREE);
    let (ax, ay) = project(a);
    let (bx, by) = project(b);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}
