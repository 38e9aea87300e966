//! Error types for template compilation and caching.
//!
//! This module provides [`Error`], the single error type returned by every
//! fallible operation in the crate. All variants are fatal and propagate to
//! the caller; there is no internal retry or partial-render fallback. The
//! only locally recovered conditions are malformed tags (dropped from the
//! scan) and unknown callables (rendered empty, or as a visible placeholder
//! in debug mode) — those never surface here.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for template loading, compilation, and cache operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Template file does not exist, on load or include resolution.
    #[error("template file {0:?} does not exist")]
    TemplateNotFound(PathBuf),

    /// Template file exists but cannot be read.
    #[error("template file {0:?} is unreadable")]
    TemplateUnreadable(PathBuf),

    /// Delimiter configuration rejected (empty open or close delimiter).
    #[error("invalid delimiter configuration: {0}")]
    InvalidDelimiterConfig(String),

    /// A comparison infix was present but the tag head did not split into
    /// exactly two operands.
    #[error("logical tag {0:?} must have two attributes")]
    MalformedComparisonTag(String),

    /// An `include` tag with no target path argument.
    #[error("include tag file attribute is missing")]
    IncludeArgumentMissing,

    /// An `include` target that cannot be canonicalized.
    #[error("template path {0:?} is invalid")]
    InvalidIncludePath(PathBuf),

    /// A non-scalar value (nested template or container) used as a
    /// comparison operand. Booleans and null coerce to their text form and
    /// compare as strings.
    #[error("{0} cannot be used in a logical comparison")]
    IncomparableValue(String),

    /// The cache directory is not writable when saving a cache file.
    #[error("cache directory {0:?} is not writable")]
    CacheDirectoryNotWritable(PathBuf),

    /// A cache file is present but cannot be read. A missing cache file is a
    /// silent miss; a present-but-unreadable one is this error.
    #[error("cache file {0:?} is not readable")]
    CacheFileUnreadable(PathBuf),

    /// `render` called on a template with neither a file nor inline source.
    #[error("there is no template to render")]
    NoTemplateToRender,

    /// Compile/include recursion exceeded the fixed depth limit. Usually a
    /// cyclic include (A includes B includes A).
    #[error("template recursion exceeded {0} levels")]
    RecursionLimit(usize),

    /// The injected [`ScriptRunner`](crate::ScriptRunner) failed.
    #[error("script execution failed: {0}")]
    Script(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
