//! Error types for query resolution and execution.

use thiserror::Error;

/// Errors that can occur while resolving or executing a search command.
///
/// Every variant is surfaced to the caller as the command's failure. The
/// live-fence signal is not an error and is modelled separately by
/// [`CommandOutcome::Fence`](crate::CommandOutcome).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// A required token is missing.
    #[error("invalid number of arguments")]
    InvalidNumberOfArguments,

    /// A token failed to parse, or an unrecognized kind tag was given.
    #[error("invalid argument '{0}'")]
    InvalidArgument(String),

    /// The kind tag does not describe a rectangle.
    #[error("not a rectangle")]
    NotRectangle,

    #[error("key not found")]
    KeyNotFound,

    #[error("id not found")]
    IdNotFound,

    /// A clip was requested on a target kind that cannot be clipped.
    #[error("cannot clip with {0}")]
    ClipIncompatible(String),

    /// A `CLIPBY` clause named a kind that is not a clip rectangle.
    #[error("cannot clipby {0}")]
    CannotClipBy(String),

    #[error("equal bearings ({0} == {1}), use CIRCLE instead")]
    EqualBearings(String, String),

    #[error("cannot use SPARSE without a point distance")]
    SparseWithoutDistance,

    /// Any other combination of tokens that parses but makes no sense.
    #[error("{0}")]
    Semantic(String),

    /// The geometry library rejected an object literal.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// The caller supplied deadline elapsed during traversal.
    #[error("timeout")]
    Timeout,

    /// A fault raised by the embedded filter evaluator.
    #[error("{0}")]
    Evaluator(String),
}

impl SearchError {
    pub fn invalid_argument(token: impl Into<String>) -> Self {
        SearchError::InvalidArgument(token.into())
    }

    /// Returns true for errors caused by a well-formed but meaningless request.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            SearchError::ClipIncompatible(_)
                | SearchError::CannotClipBy(_)
                | SearchError::EqualBearings(_, _)
                | SearchError::SparseWithoutDistance
                | SearchError::Semantic(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Timeout)
    }
}

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;
