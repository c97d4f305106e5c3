//! Seam to the embedded expression evaluator behind `WHEREEVAL` filters.
//!
//! The query layer never interprets scripts itself. A [`ScriptEngine`]
//! compiles a script into a [`ScriptFilter`]; the filter is owned by a
//! [`WhereEval`] which releases it when dropped, so every exit path of a
//! command (success, error or evaluator fault) gives the resources back.

use std::fmt;
use std::sync::Arc;

use crate::collection::Item;
use crate::errors::SearchResult;

/// Compiles scripts into filters.
pub trait ScriptEngine: Send + Sync {
    fn compile(&self, script: &str) -> SearchResult<Box<dyn ScriptFilter>>;
}

/// A compiled script evaluated once per candidate.
pub trait ScriptFilter: Send + Sync {
    /// Evaluates the filter against an item. A fault inside the evaluator
    /// is reported as [`SearchError::Evaluator`](crate::SearchError::Evaluator).
    fn eval(&self, item: &Item, args: &[String]) -> SearchResult<bool>;

    /// Returns any evaluator resources held by the filter.
    fn close(&mut self);
}

/// A compiled `WHEREEVAL` clause: script, arguments and the live filter.
pub struct WhereEval {
    script: String,
    args: Vec<String>,
    filter: Option<Box<dyn ScriptFilter>>,
}

impl WhereEval {
    pub fn compile(engine: &Arc<dyn ScriptEngine>, script: &str, args: Vec<String>) -> SearchResult<Self> {
        let filter = engine.compile(script)?;
        Ok(Self {
            script: script.to_string(),
            args,
            filter: Some(filter),
        })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn eval(&self, item: &Item) -> SearchResult<bool> {
        match &self.filter {
            Some(filter) => filter.eval(item, &self.args),
            None => Ok(false),
        }
    }
}

impl Drop for WhereEval {
    fn drop(&mut self) {
        if let Some(mut filter) = self.filter.take() {
            filter.close();
        }
    }
}

impl fmt::Debug for WhereEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhereEval")
            .field("script", &self.script)
            .field("args", &self.args)
            .finish()
    }
}
