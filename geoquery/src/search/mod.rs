//! Resolution and execution of the search commands.
//!
//! A command flows through these stages:
//!
//! 1. [`BaseTokens::parse`] reads the key and the shared options.
//! 2. [`resolve_target`] reads the target kind, using
//!    [`parse_rect_area`] for rectangle kinds.
//! 3. [`compose_clips`] applies `CLIPBY` clauses and the buffer.
//! 4. [`classify`] splits fence registrations off from immediate queries.
//! 5. [`execute`] drives the collection traversal into a [`ScanWriter`].

mod base_tokens;
mod clip;
mod cursor;
mod executor;
mod fence;
mod kinds;
mod rect_area;
mod target;
mod value_range;
mod writer;

pub use base_tokens::{BaseTokens, DetectEvent, OutputMode, WhereFilter, WhereInFilter};
pub use clip::compose_clips;
pub use cursor::TokenCursor;
pub use executor::execute;
pub use fence::{classify, Classified, LiveFence, RoamDescriptor};
pub use kinds::{Command, TargetKind};
pub use rect_area::{parse_rect_area, RectArea};
pub use target::{resolve_target, SearchDescriptor};
pub use value_range::ValueRangeBounds;
pub use writer::{
    IdFilter, OutputFormat, PushParams, ResultItem, ResultValue, ScanWriter, SearchReply,
};
