use log::debug;

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::geometry::Geometry;
use crate::search::cursor::TokenCursor;
use crate::search::kinds::TargetKind;
use crate::search::rect_area::parse_rect_area;
use crate::search::target::SearchDescriptor;

/// Applies the trailing `CLIPBY` clauses left to right, then the buffer.
///
/// Every remaining token must belong to a `CLIPBY` clause.
pub fn compose_clips(
    descriptor: &mut SearchDescriptor,
    cursor: &mut TokenCursor<'_>,
    config: &SearchConfig,
) -> SearchResult<()> {
    while !cursor.is_empty() {
        let token = cursor.expect()?;
        if !token.eq_ignore_ascii_case("clipby") {
            return Err(SearchError::InvalidNumberOfArguments);
        }
        if let Some(kind) = descriptor.kind.filter(|k| k.rejects_clip()) {
            return Err(SearchError::ClipIncompatible(kind.name().to_string()));
        }

        let raw = cursor.expect()?;
        let kind = TargetKind::parse(&raw)
            .filter(TargetKind::is_clip_rect)
            .ok_or_else(|| SearchError::CannotClipBy(raw.to_ascii_lowercase()))?;
        let area = match parse_rect_area(kind, cursor, config.mvt_expansion()) {
            Err(SearchError::NotRectangle) => {
                return Err(SearchError::CannotClipBy(kind.name().to_string()))
            }
            other => other?,
        };

        if let Some(target) = descriptor.target.take() {
            debug!("clipping {} target by {}", descriptor.key(), area.rect);
            descriptor.target = Some(target.clip(&area.rect));
        }
        if area.tile.is_some() {
            descriptor.tile = area.tile;
        }
    }

    if let Some(meters) = descriptor.base.buffer {
        let unbounded = descriptor
            .target
            .as_ref()
            .and_then(Geometry::as_circle)
            .is_some_and(|c| c.is_unbounded());
        if !unbounded {
            descriptor.target = descriptor
                .target
                .take()
                .map(|g| g.buffer(meters, config.circle_steps()));
        }
    }
    Ok(())
}
