//! GeoJSON parsing and serialization.
//!
//! Supports Point, LineString, Polygon, the Multi* types,
//! GeometryCollection, Feature and FeatureCollection. Feature properties
//! are not retained.

use serde_json::{json, Value};

use crate::errors::{SearchError, SearchResult};
use crate::geometry::{Coordinate, Geometry, Point, Polygon};

/// Parses a GeoJSON string into a geometry.
///
/// With `require_valid` set, polygon rings must be closed and carry at
/// least four positions.
///
/// # Example
///
/// ```rust
/// use geoquery::geometry::{parse_geojson, Geometry};
///
/// let geom = parse_geojson(r#"{"type":"Point","coordinates":[-112.2,33.5]}"#, false).unwrap();
/// assert_eq!(geom, Geometry::point(-112.2, 33.5));
/// ```
pub fn parse_geojson(json: &str, require_valid: bool) -> SearchResult<Geometry> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| SearchError::Geometry(e.to_string()))?;
    parse_value(&value, require_valid)
}

fn parse_value(value: &Value, require_valid: bool) -> SearchResult<Geometry> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| SearchError::Geometry("missing type".to_string()))?;

    match kind {
        "Feature" => {
            let geometry = value
                .get("geometry")
                .ok_or_else(|| SearchError::Geometry("missing geometry".to_string()))?;
            parse_value(geometry, require_valid)
        }
        "FeatureCollection" => {
            let features = member_array(value, "features")?;
            features
                .iter()
                .map(|f| parse_value(f, require_valid))
                .collect::<SearchResult<Vec<_>>>()
                .map(Geometry::Multi)
        }
        "GeometryCollection" => {
            let geometries = member_array(value, "geometries")?;
            geometries
                .iter()
                .map(|g| parse_value(g, require_valid))
                .collect::<SearchResult<Vec<_>>>()
                .map(Geometry::Multi)
        }
        "Point" => {
            let c = position(coordinates(value)?)?;
            Ok(Geometry::Point(Point::new(c.x, c.y)))
        }
        "LineString" => Ok(Geometry::LineString(line(coordinates(value)?)?)),
        "Polygon" => Ok(Geometry::Polygon(polygon(coordinates(value)?, require_valid)?)),
        "MultiPoint" => array(coordinates(value)?)?
            .iter()
            .map(|p| position(p).map(|c| Geometry::Point(Point::new(c.x, c.y))))
            .collect::<SearchResult<Vec<_>>>()
            .map(Geometry::Multi),
        "MultiLineString" => array(coordinates(value)?)?
            .iter()
            .map(|l| line(l).map(Geometry::LineString))
            .collect::<SearchResult<Vec<_>>>()
            .map(Geometry::Multi),
        "MultiPolygon" => array(coordinates(value)?)?
            .iter()
            .map(|p| polygon(p, require_valid).map(Geometry::Polygon))
            .collect::<SearchResult<Vec<_>>>()
            .map(Geometry::Multi),
        other => Err(SearchError::Geometry(format!("unsupported type '{}'", other))),
    }
}

fn member_array<'a>(value: &'a Value, name: &str) -> SearchResult<&'a Vec<Value>> {
    value
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| SearchError::Geometry(format!("missing {}", name)))
}

fn coordinates(value: &Value) -> SearchResult<&Value> {
    value
        .get("coordinates")
        .ok_or_else(|| SearchError::Geometry("missing coordinates".to_string()))
}

fn array(value: &Value) -> SearchResult<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| SearchError::Geometry("invalid coordinates".to_string()))
}

fn position(value: &Value) -> SearchResult<Coordinate> {
    let parts = array(value)?;
    if parts.len() < 2 {
        return Err(SearchError::Geometry("invalid coordinates".to_string()));
    }
    match (parts[0].as_f64(), parts[1].as_f64()) {
        (Some(x), Some(y)) => Ok(Coordinate::new(x, y)),
        _ => Err(SearchError::Geometry("invalid coordinates".to_string())),
    }
}

fn line(value: &Value) -> SearchResult<Vec<Coordinate>> {
    let coords = array(value)?
        .iter()
        .map(position)
        .collect::<SearchResult<Vec<_>>>()?;
    if coords.len() < 2 {
        return Err(SearchError::Geometry("line needs at least two positions".to_string()));
    }
    Ok(coords)
}

fn polygon(value: &Value, require_valid: bool) -> SearchResult<Polygon> {
    let mut rings = array(value)?
        .iter()
        .map(|r| array(r)?.iter().map(position).collect::<SearchResult<Vec<_>>>())
        .collect::<SearchResult<Vec<_>>>()?;
    if rings.is_empty() {
        return Err(SearchError::Geometry("polygon needs an exterior ring".to_string()));
    }
    for ring in &rings {
        let closed = ring.len() >= 4 && ring.first() == ring.last();
        if require_valid && !closed {
            return Err(SearchError::Geometry("polygon rings must be closed".to_string()));
        }
        if ring.len() < 3 {
            return Err(SearchError::Geometry("polygon ring needs three positions".to_string()));
        }
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

/// Serializes a geometry into a GeoJSON value.
///
/// Rectangles and circles are rendered as polygons.
pub fn to_geojson(geometry: &Geometry) -> Value {
    fn pos(c: &Coordinate) -> Value {
        json!([c.x, c.y])
    }
    fn ring(coords: &[Coordinate]) -> Value {
        Value::Array(coords.iter().map(pos).collect())
    }
    fn rings(p: &Polygon) -> Value {
        let mut all = vec![ring(&p.exterior)];
        all.extend(p.holes.iter().map(|h| ring(h)));
        Value::Array(all)
    }

    match geometry {
        Geometry::Point(p) => json!({"type": "Point", "coordinates": pos(p.coordinate())}),
        Geometry::Circle(c) if c.is_unbounded() => {
            json!({"type": "Point", "coordinates": pos(c.center.coordinate())})
        }
        Geometry::Circle(c) => json!({"type": "Polygon", "coordinates": rings(&c.to_polygon())}),
        Geometry::Rect(r) => json!({"type": "Polygon", "coordinates": [ring(&r.ring())]}),
        Geometry::LineString(coords) => json!({"type": "LineString", "coordinates": ring(coords)}),
        Geometry::Polygon(p) => json!({"type": "Polygon", "coordinates": rings(p)}),
        Geometry::Multi(parts) => {
            let all = |pred: fn(&Geometry) -> bool| !parts.is_empty() && parts.iter().all(pred);
            if all(|g| matches!(g, Geometry::Point(_))) {
                let coords: Vec<Value> = parts.iter().map(|g| pos(&g.center())).collect();
                json!({"type": "MultiPoint", "coordinates": coords})
            } else if all(|g| matches!(g, Geometry::LineString(_))) {
                let coords: Vec<Value> = parts
                    .iter()
                    .filter_map(|g| match g {
                        Geometry::LineString(c) => Some(ring(c)),
                        _ => None,
                    })
                    .collect();
                json!({"type": "MultiLineString", "coordinates": coords})
            } else if all(|g| matches!(g, Geometry::Polygon(_))) {
                let coords: Vec<Value> = parts
                    .iter()
                    .filter_map(|g| match g {
                        Geometry::Polygon(p) => Some(rings(p)),
                        _ => None,
                    })
                    .collect();
                json!({"type": "MultiPolygon", "coordinates": coords})
            } else {
                let geometries: Vec<Value> = parts.iter().map(to_geojson).collect();
                json!({"type": "GeometryCollection", "geometries": geometries})
            }
        }
    }
}
