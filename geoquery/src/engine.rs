//! The command entry points.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use parking_lot::RwLock;

use crate::collection::{CollectionProvider, SpatialCollection};
use crate::config::SearchConfig;
use crate::deadline::Deadline;
use crate::errors::{SearchError, SearchResult};
use crate::script::ScriptEngine;
use crate::search::{
    classify, compose_clips, execute, resolve_target, BaseTokens, Classified, Command, LiveFence,
    OutputFormat, SearchDescriptor, SearchReply, TokenCursor,
};

/// An incoming command: the argument vector (command name first), the reply
/// format and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub args: Vec<String>,
    pub output: OutputFormat,
    pub deadline: Deadline,
}

impl Message {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Splits a command line on whitespace.
    pub fn parse(line: &str) -> Self {
        Self::new(line.split_whitespace())
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }
}

/// What a search command produced.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The command ran and produced results.
    Reply(SearchReply),
    /// The command must become a persistent fence subscription.
    Fence(LiveFence),
}

impl CommandOutcome {
    pub fn reply(&self) -> Option<&SearchReply> {
        match self {
            CommandOutcome::Reply(reply) => Some(reply),
            CommandOutcome::Fence(_) => None,
        }
    }

    pub fn into_reply(self) -> Option<SearchReply> {
        match self {
            CommandOutcome::Reply(reply) => Some(reply),
            CommandOutcome::Fence(_) => None,
        }
    }

    pub fn into_fence(self) -> Option<LiveFence> {
        match self {
            CommandOutcome::Fence(fence) => Some(fence),
            CommandOutcome::Reply(_) => None,
        }
    }
}

/// Resolves and executes search commands against registered collections.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use geoquery::{Geometry, Item, MemoryCollection, Message, SearchEngine};
///
/// let fleet = MemoryCollection::new();
/// fleet.set(Item::geometry("truck-1", Geometry::point(-115.0, 33.0)));
///
/// let engine = SearchEngine::default();
/// engine.set_collection("fleet", Arc::new(fleet));
///
/// let outcome = engine.execute(&Message::parse("NEARBY fleet POINT 33 -115 1000")).unwrap();
/// assert_eq!(outcome.reply().unwrap().ids(), vec!["truck-1"]);
/// ```
pub struct SearchEngine {
    config: SearchConfig,
    collections: RwLock<HashMap<String, Arc<dyn SpatialCollection>>>,
    scripts: Option<Arc<dyn ScriptEngine>>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
            scripts: None,
        }
    }

    /// Enables `WHEREEVAL` filters.
    pub fn with_script_engine(mut self, scripts: Arc<dyn ScriptEngine>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn set_collection(&self, key: impl Into<String>, collection: Arc<dyn SpatialCollection>) {
        self.collections.write().insert(key.into(), collection);
    }

    pub fn remove_collection(&self, key: &str) -> Option<Arc<dyn SpatialCollection>> {
        self.collections.write().remove(key)
    }

    /// Dispatches on the command name in `args[0]`.
    pub fn execute(&self, msg: &Message) -> SearchResult<CommandOutcome> {
        let name = msg.args.first().ok_or(SearchError::InvalidNumberOfArguments)?;
        let command =
            Command::parse(name).ok_or_else(|| SearchError::invalid_argument(name.as_str()))?;
        self.run(command, msg)
    }

    pub fn cmd_nearby(&self, msg: &Message) -> SearchResult<CommandOutcome> {
        self.run(Command::Nearby, msg)
    }

    pub fn cmd_within(&self, msg: &Message) -> SearchResult<CommandOutcome> {
        self.run(Command::Within, msg)
    }

    pub fn cmd_intersects(&self, msg: &Message) -> SearchResult<CommandOutcome> {
        self.run(Command::Intersects, msg)
    }

    pub fn cmd_search(&self, msg: &Message) -> SearchResult<CommandOutcome> {
        self.run(Command::Search, msg)
    }

    /// Resolves a command's arguments (without the command name) into a
    /// descriptor, without executing it.
    ///
    /// `from_fence` marks the descriptor as a fence registration regardless
    /// of a `FENCE` token.
    pub fn search_args(
        &self,
        from_fence: bool,
        command: Command,
        args: &[String],
    ) -> SearchResult<SearchDescriptor> {
        let mut cursor = TokenCursor::new(args);
        let base = BaseTokens::parse(
            command,
            &mut cursor,
            &self.config,
            self.scripts.as_ref(),
            from_fence,
        )?;
        if command == Command::Search {
            if !cursor.is_empty() {
                return Err(SearchError::InvalidNumberOfArguments);
            }
            return Ok(SearchDescriptor::untargeted(command, base));
        }
        let mut descriptor = resolve_target(command, base, &mut cursor, &self.config, self)?;
        compose_clips(&mut descriptor, &mut cursor, &self.config)?;
        Ok(descriptor)
    }

    fn run(&self, command: Command, msg: &Message) -> SearchResult<CommandOutcome> {
        let start = Instant::now();
        let args = msg.args.get(1..).unwrap_or_default();
        let descriptor = self.search_args(false, command, args)?;

        match classify(descriptor) {
            Classified::Live(fence) => Ok(CommandOutcome::Fence(fence)),
            Classified::Immediate(descriptor) => {
                let deadline = if msg.deadline.is_set() {
                    msg.deadline
                } else {
                    self.config
                        .default_timeout()
                        .map(Deadline::after)
                        .unwrap_or_default()
                };
                let collection = self.collection(descriptor.key());
                if collection.is_none() {
                    debug!("{} {}: no such collection", command, descriptor.key());
                }
                let reply = execute(
                    &descriptor,
                    collection.as_deref(),
                    &deadline,
                    msg.output,
                    start,
                )?;
                Ok(CommandOutcome::Reply(reply))
            }
        }
    }
}

impl CollectionProvider for SearchEngine {
    fn collection(&self, key: &str) -> Option<Arc<dyn SpatialCollection>> {
        self.collections.read().get(key).cloned()
    }
}
