//! # Geoquery - Spatial Query Resolution and Execution
//!
//! This crate resolves and executes the spatial search commands of a
//! geospatial data server: `NEARBY`, `WITHIN`, `INTERSECTS` and the
//! value-ordered `SEARCH`.
//!
//! ## Features
//!
//! - **Polymorphic Targets**: points, circles, sectors, GeoJSON objects,
//!   bounds, geohashes, quadkeys, map tiles, references to stored objects
//!   and roaming targets
//! - **Clip Composition**: any number of `CLIPBY` rectangles applied left to right
//! - **Fence Handoff**: fence requests come back as a [`CommandOutcome::Fence`]
//!   carrying the resolved descriptor instead of running
//! - **Five Traversal Modes**: nearest-first, bounded radius, sparse,
//!   containment/intersection and sorted value ranges
//! - **Deadlines**: traversals stop with [`SearchError::Timeout`] once the
//!   caller's deadline passes
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use geoquery::{CommandOutcome, Geometry, Item, MemoryCollection, Message, SearchEngine};
//!
//! let fleet = MemoryCollection::new();
//! fleet.set(Item::geometry("truck-1", Geometry::point(-115.0, 33.0)));
//! fleet.set(Item::geometry("truck-2", Geometry::point(-115.0, 34.0)));
//!
//! let engine = SearchEngine::default();
//! engine.set_collection("fleet", Arc::new(fleet));
//!
//! match engine.execute(&Message::parse("WITHIN fleet IDS BOUNDS 32.5 -116 33.5 -114")).unwrap() {
//!     CommandOutcome::Reply(reply) => assert_eq!(reply.ids(), vec!["truck-1"]),
//!     CommandOutcome::Fence(_) => unreachable!(),
//! }
//! ```

pub mod collection;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod errors;
pub mod geometry;
pub mod glob;
pub mod script;
pub mod search;
pub mod tile;

pub use collection::{
    AcceptAll, CandidateFilter, CollectionProvider, Item, ItemValue, MemoryCollection,
    SpatialCollection,
};
pub use config::SearchConfig;
pub use deadline::Deadline;
pub use engine::{CommandOutcome, Message, SearchEngine};
pub use errors::{SearchError, SearchResult};
pub use geometry::{BoundingBox, Circle, Coordinate, Geometry, Point, Polygon};
pub use script::{ScriptEngine, ScriptFilter, WhereEval};
pub use search::{
    Command, LiveFence, OutputFormat, OutputMode, RoamDescriptor, SearchDescriptor, SearchReply,
    TargetKind, ValueRangeBounds,
};
pub use tile::TileCoord;
