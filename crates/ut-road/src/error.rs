//! Road-subsystem error types.
//!
//! Only I/O failures abort a compile.  Bad records are collected as
//! [`RecordError`]s, the offending segment is dropped and parsing goes on.

use thiserror::Error;

/// Fatal errors produced by `ut-road`.
#[derive(Debug, Error)]
pub enum RoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type RoadResult<T> = Result<T, RoadError>;

/// Why a record or segment was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordErrorKind {
    #[error("unknown node type {0:?}")]
    UnknownType(String),

    #[error("{kind} record needs {expected} fields, found {found}")]
    FieldCount { kind: &'static str, expected: usize, found: usize },

    #[error("field {field} is not a valid number: {value:?}")]
    InvalidNumber { field: usize, value: String },

    #[error("field {field} asks for {count} lanes, at most 32767 are allowed")]
    LaneCount { field: usize, count: u32 },

    #[error("node {node} has a non-finite position or lane width")]
    NonFinite { node: usize },

    #[error("malformed line: {0}")]
    Malformed(String),

    #[error("segment has {0} node(s), at least 2 are required")]
    TooShort(usize),

    #[error("node {node} links to index {next}, outside the segment")]
    DanglingNext { node: usize, next: i32 },

    #[error("segment has {0} cross nodes, at most 1 is allowed")]
    MultipleCross(usize),

    #[error("segment without a crossing must start and end with a port")]
    Unbounded,

    #[error("records after the last `break` were never terminated")]
    Unterminated,
}

/// A rejected record with its location.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{origin}:{line}: {kind}")]
pub struct RecordError {
    /// Name of the source the record was read from.
    pub origin: String,
    /// 1-based line of the record (or of the segment's `break`).
    pub line: u64,
    pub kind: RecordErrorKind,
}
