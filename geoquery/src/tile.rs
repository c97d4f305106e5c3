//! Slippy-map tile and quadkey math.
//!
//! Tiles use the Web Mercator scheme shared by map renderers and the Bing
//! quadkey addressing, so latitudes are limited to the Mercator domain.

use crate::errors::{SearchError, SearchResult};
use crate::geometry::BoundingBox;

pub const MIN_LATITUDE: f64 = -85.05112878;
pub const MAX_LATITUDE: f64 = 85.05112878;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Deepest zoom level accepted for tile queries.
pub const MAX_ZOOM: u32 = 23;

/// The latitude/longitude domain tile rectangles are clamped into.
pub fn mercator_domain() -> BoundingBox {
    BoundingBox::new(MIN_LONGITUDE, MIN_LATITUDE, MAX_LONGITUDE, MAX_LATITUDE)
}

/// Integer tile address carried alongside a search so results can be
/// rendered as a vector tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl TileCoord {
    /// Validates the address: `z` must not exceed [`MAX_ZOOM`].
    pub fn new(x: u32, y: u32, z: u32) -> SearchResult<Self> {
        if z > MAX_ZOOM {
            return Err(SearchError::invalid_argument(z.to_string()));
        }
        Ok(Self { x, y, z })
    }

    /// Computes the latitude/longitude rectangle covered by this tile.
    pub fn bounds(&self) -> BoundingBox {
        let n = 2f64.powi(self.z as i32);
        let lon = |x: f64| (x / n * 360.0 - 180.0).clamp(MIN_LONGITUDE, MAX_LONGITUDE);
        let lat = |y: f64| {
            let rad = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
            rad.to_degrees().clamp(MIN_LATITUDE, MAX_LATITUDE)
        };
        let (x, y) = (self.x as f64, self.y as f64);
        BoundingBox::new(lon(x), lat(y + 1.0), lon(x + 1.0), lat(y))
    }
}

/// Decodes a quadkey string (digits 0-3, one per zoom level) into its tile.
pub fn quadkey_to_tile(key: &str) -> SearchResult<TileCoord> {
    if key.is_empty() || key.len() > MAX_ZOOM as usize {
        return Err(SearchError::invalid_argument(key));
    }
    let z = key.len() as u32;
    let (mut x, mut y) = (0u32, 0u32);
    for (i, ch) in key.chars().enumerate() {
        let mask = 1u32 << (z as usize - i - 1);
        match ch {
            '0' => {}
            '1' => x |= mask,
            '2' => y |= mask,
            '3' => {
                x |= mask;
                y |= mask;
            }
            _ => return Err(SearchError::invalid_argument(key)),
        }
    }
    TileCoord::new(x, y, z)
}

/// Decodes a quadkey straight into its rectangle.
pub fn quadkey_to_bounds(key: &str) -> SearchResult<BoundingBox> {
    Ok(quadkey_to_tile(key)?.bounds())
}
