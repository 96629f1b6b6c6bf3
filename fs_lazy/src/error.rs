//! The error taxonomy for lazy temporary files and their sessions.
//!
//! Everything fallible in this crate reports [Error](enum.Error.html). The
//! forwarded `std::io` trait calls are the one exception: those return the
//! backing file's plain `io::Error` untouched, and the `From` impl admits it
//! into the taxonomy wherever `?` crosses back into session results.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::handle::Operation;

/// The `Result` alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Any failure a lazy temporary file can report.
#[derive(Debug, Error)]
pub enum Error {
    /// First-use creation of a backing file failed. The handle stays
    /// unrealized, so there is nothing to tear down for it either.
    #[error("could not realize temporary file with prefix `{prefix}`: {source}")]
    Realize {
        /// The filename prefix the handle was configured with.
        prefix: String,
        /// The creation failure reported by the filesystem.
        source: io::Error,
    },

    /// An operation forwarded to an already realized backing file failed.
    #[error("`{op}` failed on temporary file {path:?}: {source}")]
    Forward {
        /// The operation that was being forwarded.
        op: Operation,
        /// The path of the realized backing file.
        path: PathBuf,
        /// The failure the backing file reported.
        source: io::Error,
    },

    /// A handle was used again after its teardown.
    #[error("temporary file handle with prefix `{prefix}` is already closed")]
    Closed {
        /// The filename prefix the handle was configured with.
        prefix: String,
    },

    /// A plain IO failure from a forwarded `Read`/`Write`/`Seek` call.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// One or more realized files could not be closed and deleted during the
    /// end-of-session sweep. Teardown was still attempted for every handle
    /// of the cohort, and a failure from the session's own block - if there
    /// was one - is reported instead of this.
    #[error("teardown failed for {} temporary file(s)", .0.len())]
    Teardown(Vec<TeardownFailure>),
}

/// A single failed teardown attempt from the end-of-session sweep.
#[derive(Debug, Error)]
#[error("handle #{index}: {source}")]
pub struct TeardownFailure {
    /// The handle's position in its cohort, in creation order.
    pub index: usize,
    /// The close failure itself.
    pub source: Error,
}
