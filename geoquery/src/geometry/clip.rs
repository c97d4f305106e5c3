//! Clipping of geometries against a rectangle.

use crate::geometry::{BoundingBox, Coordinate, Geometry, Point, Polygon};

pub(crate) fn clip_geometry(geometry: &Geometry, rect: &BoundingBox) -> Geometry {
    match geometry {
        Geometry::Point(p) => {
            if rect.contains_point(p.x(), p.y()) {
                Geometry::Point(*p)
            } else {
                Geometry::empty()
            }
        }
        Geometry::Rect(r) => r
            .intersection(rect)
            .map(Geometry::Rect)
            .unwrap_or_else(Geometry::empty),
        Geometry::Circle(c) if c.is_unbounded() => {
            clip_geometry(&Geometry::Point(c.center), rect)
        }
        Geometry::Circle(c) => clip_polygon(&c.to_polygon(), rect),
        Geometry::Polygon(p) => clip_polygon(p, rect),
        Geometry::LineString(coords) => clip_line(coords, rect),
        Geometry::Multi(parts) => Geometry::Multi(
            parts
                .iter()
                .map(|g| clip_geometry(g, rect))
                .filter(|g| !g.is_empty())
                .collect(),
        ),
    }
}

fn clip_polygon(polygon: &Polygon, rect: &BoundingBox) -> Geometry {
    if rect.contains(&Geometry::Polygon(polygon.clone()).bounding_box()) {
        return Geometry::Polygon(polygon.clone());
    }
    let exterior = clip_ring(&polygon.exterior, rect);
    if exterior.len() < 4 {
        return Geometry::empty();
    }
    let holes = polygon
        .holes
        .iter()
        .map(|h| clip_ring(h, rect))
        .filter(|h| h.len() >= 4)
        .collect();
    Geometry::Polygon(Polygon::new(exterior, holes))
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

impl Edge {
    fn inside(self, c: &Coordinate, r: &BoundingBox) -> bool {
        match self {
            Edge::Left => c.x >= r.min_x,
            Edge::Right => c.x <= r.max_x,
            Edge::Bottom => c.y >= r.min_y,
            Edge::Top => c.y <= r.max_y,
        }
    }

    fn cut(self, a: &Coordinate, b: &Coordinate, r: &BoundingBox) -> Coordinate {
        match self {
            Edge::Left | Edge::Right => {
                let x = if matches!(self, Edge::Left) { r.min_x } else { r.max_x };
                let t = (x - a.x) / (b.x - a.x);
                Coordinate::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Bottom | Edge::Top => {
                let y = if matches!(self, Edge::Bottom) { r.min_y } else { r.max_y };
                let t = (y - a.y) / (b.y - a.y);
                Coordinate::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

/// Sutherland-Hodgman clipping; returns a closed ring or an empty vector.
fn clip_ring(ring: &[Coordinate], rect: &BoundingBox) -> Vec<Coordinate> {
    let mut output: Vec<Coordinate> = ring.to_vec();
    if output.len() > 1 && output.first() == output.last() {
        output.pop();
    }
    for edge in [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top] {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for current in input {
            let cur_in = edge.inside(&current, rect);
            let prev_in = edge.inside(&prev, rect);
            if cur_in {
                if !prev_in {
                    output.push(edge.cut(&prev, &current, rect));
                }
                output.push(current);
            } else if prev_in {
                output.push(edge.cut(&prev, &current, rect));
            }
            prev = current;
        }
    }
    if let Some(first) = output.first().copied() {
        output.push(first);
    }
    output
}

/// Liang-Barsky clipping of each segment; contiguous pieces are rejoined.
fn clip_line(coords: &[Coordinate], rect: &BoundingBox) -> Geometry {
    if coords.len() == 1 {
        return clip_geometry(&Geometry::Point(Point::new(coords[0].x, coords[0].y)), rect);
    }
    let mut lines: Vec<Vec<Coordinate>> = Vec::new();
    let mut current: Vec<Coordinate> = Vec::new();
    for w in coords.windows(2) {
        match clip_segment(&w[0], &w[1], rect) {
            Some((a, b)) => {
                if current.last() != Some(&a) {
                    if current.len() >= 2 {
                        lines.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(a);
                }
                current.push(b);
            }
            None => {
                if current.len() >= 2 {
                    lines.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
    }
    if current.len() >= 2 {
        lines.push(current);
    }
    match lines.len() {
        0 => Geometry::empty(),
        1 => Geometry::LineString(lines.remove(0)),
        _ => Geometry::Multi(lines.into_iter().map(Geometry::LineString).collect()),
    }
}

fn clip_segment(
    a: &Coordinate,
    b: &Coordinate,
    rect: &BoundingBox,
) -> Option<(Coordinate, Coordinate)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let checks = [
        (-dx, a.x - rect.min_x),
        (dx, rect.max_x - a.x),
        (-dy, a.y - rect.min_y),
        (dy, rect.max_y - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    Some((
        Coordinate::new(a.x + t0 * dx, a.y + t0 * dy),
        Coordinate::new(a.x + t1 * dx, a.y + t1 * dy),
    ))
}
