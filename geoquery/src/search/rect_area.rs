use crate::errors::{SearchError, SearchResult};
use crate::geometry::BoundingBox;
use crate::search::cursor::{parse_f64, TokenCursor};
use crate::search::kinds::TargetKind;
use crate::tile::{mercator_domain, quadkey_to_bounds, TileCoord, MAX_ZOOM};

/// A rectangle decoded from a rectangle-style kind, plus the tile address
/// when the kind was `TILE` or `MVT`.
#[derive(Debug, Clone, PartialEq)]
pub struct RectArea {
    pub rect: BoundingBox,
    pub tile: Option<TileCoord>,
}

/// Consumes the tokens of a rectangle kind and decodes its rectangle.
///
/// Any kind outside `BOUNDS`, `HASH`, `QUADKEY`, `TILE` and `MVT` yields
/// [`SearchError::NotRectangle`] without consuming anything. `MVT`
/// rectangles are grown by `mvt_expansion` of their size on each side and
/// clamped to the Mercator domain.
pub fn parse_rect_area(
    kind: TargetKind,
    cursor: &mut TokenCursor<'_>,
    mvt_expansion: f64,
) -> SearchResult<RectArea> {
    let mut area = match kind {
        TargetKind::Bounds => {
            let min_lat = cursor.expect()?;
            let min_lon = cursor.expect()?;
            let max_lat = cursor.expect()?;
            let max_lon = cursor.expect()?;
            RectArea {
                rect: BoundingBox::from_lat_lon(
                    parse_f64(&min_lat)?,
                    parse_f64(&min_lon)?,
                    parse_f64(&max_lat)?,
                    parse_f64(&max_lon)?,
                ),
                tile: None,
            }
        }
        TargetKind::Hash => {
            let hash = cursor.expect()?;
            let rect = geohash::decode_bbox(&hash)
                .map_err(|_| SearchError::invalid_argument(hash.as_str()))?;
            RectArea {
                rect: BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
                tile: None,
            }
        }
        TargetKind::Quadkey => {
            let key = cursor.expect()?;
            RectArea {
                rect: quadkey_to_bounds(&key)?,
                tile: None,
            }
        }
        TargetKind::Tile | TargetKind::Mvt => {
            let sx = cursor.expect()?;
            let sy = cursor.expect()?;
            let sz = cursor.expect()?;
            let x = sx.parse::<u32>().map_err(|_| SearchError::invalid_argument(sx.as_str()))?;
            let y = sy.parse::<u32>().map_err(|_| SearchError::invalid_argument(sy.as_str()))?;
            let z = match sz.parse::<u32>() {
                Ok(z) if z <= MAX_ZOOM => z,
                _ => return Err(SearchError::invalid_argument(sz)),
            };
            let tile = TileCoord::new(x, y, z)?;
            RectArea {
                rect: tile.bounds(),
                tile: Some(tile),
            }
        }
        _ => return Err(SearchError::NotRectangle),
    };

    if kind == TargetKind::Mvt {
        area.rect = area
            .rect
            .expand_by_factor(mvt_expansion)
            .clamp_to(&mercator_domain());
    }
    Ok(area)
}
