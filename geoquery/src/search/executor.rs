//! Binding a resolved descriptor to a collection traversal.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};

use crate::collection::{Item, SpatialCollection};
use crate::deadline::Deadline;
use crate::errors::{SearchError, SearchResult};
use crate::geometry::Geometry;
use crate::search::base_tokens::OutputMode;
use crate::search::kinds::Command;
use crate::search::target::SearchDescriptor;
use crate::search::value_range::ValueRangeBounds;
use crate::search::writer::{OutputFormat, PushParams, ScanWriter, SearchReply};

/// Runs a resolved, non-fence descriptor against `collection`.
///
/// A missing collection yields an empty reply. Traversal errors (deadline,
/// evaluator faults) abort the command and discard any partial results.
pub fn execute(
    descriptor: &SearchDescriptor,
    collection: Option<&dyn SpatialCollection>,
    deadline: &Deadline,
    format: OutputFormat,
    start: Instant,
) -> SearchResult<SearchReply> {
    let command = descriptor.command();
    let mut writer = ScanWriter::new(descriptor, format, command == Command::Search)?;

    let result = match command {
        Command::Nearby => nearby(descriptor, collection, deadline, &mut writer),
        Command::Within | Command::Intersects => {
            spatial(descriptor, collection, deadline, &mut writer)
        }
        Command::Search => search(descriptor, collection, deadline, &mut writer),
    };
    if let Err(err) = result {
        warn!("{} {} aborted: {}", command, descriptor.key(), err);
        return Err(err);
    }
    Ok(writer.finish(start.elapsed()))
}

/// Drives `traverse`, routing each candidate through `push` and keeping the
/// first sink error.
fn drive<T>(
    writer: &mut ScanWriter<'_>,
    traverse: impl FnOnce(&mut dyn FnMut(&Arc<Item>, T) -> bool) -> SearchResult<()>,
    mut push: impl FnMut(&mut ScanWriter<'_>, &Arc<Item>, T) -> SearchResult<bool>,
) -> SearchResult<()> {
    let mut sink_error = None;
    let traversal = traverse(&mut |item: &Arc<Item>, extra: T| match push(writer, item, extra) {
        Ok(keep_going) => keep_going,
        Err(err) => {
            sink_error = Some(err);
            false
        }
    });
    match sink_error {
        Some(err) => Err(err),
        None => traversal,
    }
}

fn target_of(descriptor: &SearchDescriptor) -> SearchResult<&Geometry> {
    descriptor
        .target()
        .ok_or_else(|| SearchError::Semantic(format!("{} has no target", descriptor.command())))
}

fn nearby(
    descriptor: &SearchDescriptor,
    collection: Option<&dyn SpatialCollection>,
    deadline: &Deadline,
    writer: &mut ScanWriter<'_>,
) -> SearchResult<()> {
    let target = target_of(descriptor)?;
    let circle = match target {
        Geometry::Circle(c) => *c,
        _ => *descriptor
            .nearby_circle()
            .ok_or_else(|| SearchError::Semantic("nearby requires a point".to_string()))?,
    };
    let base = descriptor.base();
    if base.sparse > 0 && circle.is_unbounded() {
        return Err(SearchError::SparseWithoutDistance);
    }
    let Some(col) = collection else {
        return Ok(());
    };
    let filter = writer.id_filter();
    let want_distance = base.distance;

    if base.sparse > 0 {
        debug!("nearby {} sparse {} intersects scan", descriptor.key(), base.sparse);
        return drive(
            writer,
            |visit| col.intersects(target, base.sparse, &filter, deadline, &mut |item| visit(item, ())),
            |w, item, ()| {
                let distance = match (want_distance, item.geo()) {
                    (true, Some(geo)) => Some(geo.distance(target)),
                    _ => None,
                };
                w.push(PushParams {
                    distance,
                    ignore_glob_match: true,
                    skip_testing: true,
                    ..PushParams::new(item)
                })
            },
        );
    }

    // A clip or buffer step replaced the circle; candidates must also meet
    // the composed target.
    let composed = match target {
        Geometry::Circle(_) => None,
        other => Some(other),
    };
    let max_meters = circle.meters;
    let scan = Geometry::Circle(circle);
    debug!(
        "nearby {} {} scan",
        descriptor.key(),
        if circle.is_unbounded() { "knn" } else { "radius" }
    );
    drive(
        writer,
        |visit| col.nearby(&scan, &filter, deadline, &mut |item, dist| visit(item, dist)),
        |w, item, dist: f64| {
            if max_meters > 0.0 && dist > max_meters {
                return Ok(false);
            }
            if let (Some(shape), Some(geo)) = (composed, item.geo()) {
                if !geo.intersects(shape) {
                    return Ok(true);
                }
            }
            w.push(PushParams {
                distance: want_distance.then_some(dist),
                ignore_glob_match: true,
                skip_testing: true,
                ..PushParams::new(item)
            })
        },
    )
}

fn spatial(
    descriptor: &SearchDescriptor,
    collection: Option<&dyn SpatialCollection>,
    deadline: &Deadline,
    writer: &mut ScanWriter<'_>,
) -> SearchResult<()> {
    let target = target_of(descriptor)?;
    let Some(col) = collection else {
        return Ok(());
    };
    let filter = writer.id_filter();
    let sparse = descriptor.base().sparse;
    let clip = (descriptor.command() == Command::Intersects && descriptor.clip_requested())
        .then_some(target);
    debug!("{} {} scan (sparse {})", descriptor.command(), descriptor.key(), sparse);

    drive(
        writer,
        |visit| {
            let mut each = |item: &Arc<Item>| visit(item, ());
            if descriptor.command() == Command::Within {
                col.within(target, sparse, &filter, deadline, &mut each)
            } else {
                col.intersects(target, sparse, &filter, deadline, &mut each)
            }
        },
        |w, item, ()| w.push(PushParams { clip, ..PushParams::new(item) }),
    )
}

fn search(
    descriptor: &SearchDescriptor,
    collection: Option<&dyn SpatialCollection>,
    deadline: &Deadline,
    writer: &mut ScanWriter<'_>,
) -> SearchResult<()> {
    let Some(col) = collection else {
        return Ok(());
    };
    let base = descriptor.base();
    if writer.output() == OutputMode::Count && !writer.has_filters() && writer.glob_everything() {
        let total = col.count() as u64;
        writer.set_count(total.saturating_sub(base.cursor));
        debug!("search {} count answered without scan", descriptor.key());
        return Ok(());
    }

    let filter = writer.id_filter();
    let desc = base.desc;
    match ValueRangeBounds::derive(&base.globs, desc) {
        Some(bounds) => {
            debug!(
                "search {} range scan {:?}..{:?} desc={}",
                descriptor.key(),
                bounds.start,
                bounds.end,
                desc
            );
            drive(
                writer,
                |visit| {
                    col.search_values_range(
                        &bounds.start,
                        &bounds.end,
                        desc,
                        &filter,
                        deadline,
                        &mut |item| visit(item, ()),
                    )
                },
                |w, item, ()| w.push(PushParams::new(item)),
            )
        }
        None => {
            debug!("search {} full scan desc={}", descriptor.key(), desc);
            drive(
                writer,
                |visit| col.search_values(desc, &filter, deadline, &mut |item| visit(item, ())),
                |w, item, ()| w.push(PushParams::new(item)),
            )
        }
    }
}
