use thiserror::Error;
use tracing::warn;

use crate::base::Loc;

/// Fatal errors. Every variant maps to a 6-digit diagnostic code `TAMMDD`
/// with `T = 1`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("tag {0} already in, did not overwrite")]
    DuplicateTag(String),
    #[error("tag {0} does not exist")]
    MissingTag(String),
    #[error("invalid interval {offset} ({start}, {end})")]
    MalformedInterval {
        start: usize,
        end: usize,
        offset: usize,
    },
    #[error("{operation} requires locations to have the same offset")]
    OffsetMismatch { code: u32, operation: &'static str },
    #[error("locations {0} and {1} must intersect or meet to be merged")]
    Unmergeable(Loc, Loc),
    #[error("{relation} requires a {expected} tuple as input, got {got} locations")]
    Arity {
        relation: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("indices {group} and {out} are out of range [0, {max}]")]
    GroupIndex { group: usize, out: usize, max: usize },
    #[error("text {needle:?} is in {found} columns, expected exactly one")]
    AmbiguousColumn { needle: String, found: usize },
    #[error("invalid syntax in query {query:?}: {message}")]
    QuerySyntax {
        code: u32,
        query: String,
        message: String,
    },
    #[error("invalid predicate in query: {0}")]
    UnknownPredicate(String),
    #[error("parameter {column} of predicate out of range, query has {tags} tags")]
    ColumnOutOfRange { column: usize, tags: usize },
    #[error("invalid project columns in query: {0:?}")]
    InvalidProjection(Vec<usize>),
    #[error("{message}")]
    SchemaViolation { code: u32, message: String },
    #[error("query scheduler: {0}")]
    Scheduler(String),
    #[error("result of conjunction is empty, it should include a schema")]
    EmptyConjunction,
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl Error {
    pub fn code(&self) -> u32 {
        match self {
            Error::DuplicateTag(_) => 110101,
            Error::MissingTag(_) => 110106,
            Error::Regex(_) => 110107,
            Error::OffsetMismatch { code, .. } => *code,
            Error::Unmergeable(_, _) => 110202,
            Error::MalformedInterval { .. } => 110203,
            Error::Arity { .. } => 110306,
            Error::GroupIndex { .. } => 110401,
            Error::AmbiguousColumn { .. } => 110501,
            Error::QuerySyntax { code, .. } => *code,
            Error::InvalidProjection(_) => 110605,
            Error::ColumnOutOfRange { .. } => 110610,
            Error::UnknownPredicate(_) => 110613,
            Error::Scheduler(_) => 110615,
            Error::EmptyConjunction => 110616,
            Error::SchemaViolation { code, .. } => *code,
        }
    }

    pub(crate) fn schema(code: u32, message: impl Into<String>) -> Error {
        Error::SchemaViolation {
            code,
            message: message.into(),
        }
    }
}

/// Non fatal diagnostics (`T = 2`). They are logged and the call goes on as
/// if the offending step were a no-op.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
    AlreadyTagged { tag: String, at: (usize, usize) },
    UnknownTagDeleted(String),
    EmptyQueryTags(Vec<String>),
    AlreadyExecuted(String),
}

impl Warning {
    pub fn code(&self) -> u32 {
        match self {
            Warning::AlreadyTagged { .. } => 210102,
            Warning::UnknownTagDeleted(_) => 210103,
            Warning::EmptyQueryTags(_) => 210604,
            Warning::AlreadyExecuted(_) => 210608,
        }
    }

    pub fn emit(self) {
        let code = self.code();
        match self {
            Warning::AlreadyTagged { tag, at } => {
                warn!(code = code, "tag {} already has location {:?}", tag, at)
            }
            Warning::UnknownTagDeleted(tag) => {
                warn!(code = code, "tag {} to remove does not exist", tag)
            }
            Warning::EmptyQueryTags(tags) => {
                warn!(code = code, "tags in query are empty: {:?}", tags)
            }
            Warning::AlreadyExecuted(query) => {
                warn!(code = code, "query was already executed: {}", query)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
