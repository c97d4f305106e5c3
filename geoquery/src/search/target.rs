//! Target resolution: turning the kind tag and its tokens into a geometry.

use log::debug;

use crate::collection::CollectionProvider;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::geometry::{parse_geojson, sector_polygon, Circle, Geometry, Point};
use crate::search::base_tokens::{BaseTokens, OutputMode};
use crate::search::cursor::{parse_f64, TokenCursor};
use crate::search::fence::RoamDescriptor;
use crate::search::kinds::{Command, TargetKind};
use crate::search::rect_area::parse_rect_area;
use crate::tile::TileCoord;

/// A fully resolved search command.
///
/// Built once per command and not modified once resolution (including clip
/// composition) has finished.
#[derive(Debug)]
pub struct SearchDescriptor {
    pub(crate) base: BaseTokens,
    pub(crate) command: Command,
    pub(crate) kind: Option<TargetKind>,
    pub(crate) target: Option<Geometry>,
    pub(crate) nearby_circle: Option<Circle>,
    pub(crate) tile: Option<TileCoord>,
    pub(crate) mvt: bool,
    pub(crate) roam: Option<RoamDescriptor>,
}

impl SearchDescriptor {
    /// A descriptor with no target, as `SEARCH` uses.
    pub(crate) fn untargeted(command: Command, base: BaseTokens) -> Self {
        Self {
            base,
            command,
            kind: None,
            target: None,
            nearby_circle: None,
            tile: None,
            mvt: false,
            roam: None,
        }
    }

    pub fn base(&self) -> &BaseTokens {
        &self.base
    }

    pub fn key(&self) -> &str {
        &self.base.key
    }

    pub fn command(&self) -> Command {
        self.command
    }

    /// The kind tag the target was given in, if any.
    pub fn kind(&self) -> Option<TargetKind> {
        self.kind
    }

    pub fn target(&self) -> Option<&Geometry> {
        self.target.as_ref()
    }

    /// The circle a `NEARBY POINT` target was given as, before any clip or
    /// buffer step changed it.
    pub fn nearby_circle(&self) -> Option<&Circle> {
        self.nearby_circle.as_ref()
    }

    pub fn tile(&self) -> Option<TileCoord> {
        self.tile
    }

    /// True when results render as a map vector tile.
    pub fn is_mvt(&self) -> bool {
        self.mvt
    }

    pub fn roam(&self) -> Option<&RoamDescriptor> {
        self.roam.as_ref()
    }

    pub fn is_fence(&self) -> bool {
        self.base.fence
    }

    pub fn clip_requested(&self) -> bool {
        self.base.clip
    }
}

/// Reads the kind tag and its arguments, producing a descriptor without
/// any `CLIPBY` or buffer step applied.
pub fn resolve_target(
    command: Command,
    mut base: BaseTokens,
    cursor: &mut TokenCursor<'_>,
    config: &SearchConfig,
    provider: &dyn CollectionProvider,
) -> SearchResult<SearchDescriptor> {
    let mut token = cursor.expect()?;

    // An output mode of BOUNDS followed by a number is read as an implicit
    // bounds query whose first coordinate was taken for the output mode.
    if base.output == OutputMode::Bounds
        && matches!(command, Command::Within | Command::Intersects)
        && token.parse::<f64>().is_ok()
    {
        base.output = OutputMode::default();
        cursor.unread(token);
        token = "BOUNDS".to_string();
    }

    let kind = TargetKind::parse(&token)
        .filter(|k| k.permitted(command, base.fence))
        .ok_or_else(|| SearchError::invalid_argument(token.as_str()))?;

    if base.clip && kind.rejects_clip() {
        return Err(SearchError::ClipIncompatible(kind.name().to_string()));
    }

    let mut descriptor = SearchDescriptor::untargeted(command, base);
    descriptor.kind = Some(kind);
    let steps = config.circle_steps();

    match kind {
        TargetKind::Point => {
            let lat = cursor.expect_f64()?;
            let lon = cursor.expect_f64()?;
            let center = Point::from_lat_lon(lat, lon);
            if command == Command::Nearby {
                let has_radius = cursor
                    .peek()
                    .is_some_and(|t| !t.eq_ignore_ascii_case("clipby"));
                let meters = if has_radius {
                    let raw = cursor.expect()?;
                    match parse_f64(&raw) {
                        Ok(m) if m >= 0.0 => m,
                        _ => return Err(SearchError::invalid_argument(raw)),
                    }
                } else {
                    -1.0
                };
                let circle = Circle::new(center, meters, steps);
                descriptor.nearby_circle = Some(circle);
                descriptor.target = Some(Geometry::Circle(circle));
            } else {
                descriptor.target = Some(Geometry::Point(center));
            }
        }
        TargetKind::Circle => {
            let lat = cursor.expect_f64()?;
            let lon = cursor.expect_f64()?;
            let raw = cursor.expect()?;
            let meters = match parse_f64(&raw) {
                Ok(m) if m >= 0.0 => m,
                _ => return Err(SearchError::invalid_argument(raw)),
            };
            descriptor.target = Some(Geometry::circle(Point::from_lat_lon(lat, lon), meters, steps));
        }
        TargetKind::Object => {
            let literal = cursor.expect()?;
            descriptor.target = Some(parse_geojson(&literal, config.require_valid_geojson())?);
        }
        TargetKind::Sector => {
            let lat = cursor.expect_f64()?;
            let lon = cursor.expect_f64()?;
            let meters = cursor.expect_f64()?;
            let raw1 = cursor.expect()?;
            let raw2 = cursor.expect()?;
            let bearing1 = parse_f64(&raw1)?;
            let bearing2 = parse_f64(&raw2)?;
            if bearing1 == bearing2 {
                return Err(SearchError::EqualBearings(raw1, raw2));
            }
            let origin = Point::from_lat_lon(lat, lon);
            let polygon = sector_polygon(origin.coordinate(), meters, bearing1, bearing2, steps);
            descriptor.target = Some(Geometry::Polygon(polygon));
        }
        TargetKind::Bounds
        | TargetKind::Hash
        | TargetKind::Tile
        | TargetKind::Mvt
        | TargetKind::Quadkey => {
            let area = parse_rect_area(kind, cursor, config.mvt_expansion())?;
            descriptor.target = Some(Geometry::Rect(area.rect));
            descriptor.tile = area.tile;
            descriptor.mvt = kind == TargetKind::Mvt;
        }
        TargetKind::Get => {
            let key = cursor.expect()?;
            let id = cursor.expect()?;
            let collection = provider.collection(&key).ok_or(SearchError::KeyNotFound)?;
            let item = collection.get(&id).ok_or(SearchError::IdNotFound)?;
            let geometry = item
                .geo()
                .ok_or_else(|| SearchError::Geometry(format!("'{}' is not a geometry", id)))?;
            descriptor.target = Some(geometry.clone());
        }
        TargetKind::Roam => {
            let key = cursor.expect()?;
            let id = cursor.expect()?;
            let raw = cursor.expect()?;
            let meters = match parse_f64(&raw) {
                Ok(m) if m >= 0.0 => m,
                _ => return Err(SearchError::invalid_argument(raw)),
            };
            let scan = match cursor.next() {
                Some(t) if t.eq_ignore_ascii_case("scan") => Some(cursor.expect()?),
                Some(t) => return Err(SearchError::invalid_argument(t)),
                None => None,
            };
            descriptor.roam = Some(RoamDescriptor::new(key, id, meters, scan));
        }
    }

    debug!(
        "resolved {} {} target kind {}",
        descriptor.command,
        descriptor.key(),
        kind
    );
    Ok(descriptor)
}
