//! Lazy temporary files, scoped to a block of code.
//!
//! The crate hands a block of caller code one temporary-file handle per
//! declared parameter. Every handle is lazy: nothing is created on disk
//! until the handle is first asked to do real work, and a handle that's
//! never used never shows up in the filesystem at all. When the block is
//! done - normally or with an error - every file that did get created is
//! closed and deleted again.
//!
//! The API essentially consists of a handful of items:
//!  * [with_files](fn.with_files.html): Runs a block with lazy files in the
//! platform's default temporary directory.
//!  * [with_files_in](fn.with_files_in.html): Same, inside a chosen root
//! directory.
//!  * [Session](struct.Session.html): The configurable entry point behind
//! both, with filename suffixes, root directories and dynamically sized
//! cohorts.
//!  * [LazyFile](struct.LazyFile.html): The handle type itself, forwarding
//! paths, sizes, reads, writes and seeks to the backing file it creates on
//! first use.
//!  * [Operation](enum.Operation.html): The forwardable operations, for
//! capability queries that must not create anything.
//!
//! # Usage
//!
//! ```no_run
//! use fs_lazy::{with_files, LazyFile};
//!
//! # fn main() -> fs_lazy::Result<()> {
//! let entry = with_files("printio", |diary: &mut LazyFile, _spare: &mut LazyFile| {
//!     use std::io::{Read, Seek, SeekFrom, Write};
//!
//!     // Only `diary` does real work, so only one file is ever created
//!     diary.write_all(b"stayed lazy today")?;
//!     diary.seek(SeekFrom::Start(0))?;
//!
//!     let mut content = String::new();
//!     diary.read_to_string(&mut content)?;
//!     Ok(content)
//! })?;
//!
//! // Both handles are torn down here, nothing is left on disk
//! assert_eq!(entry, "stayed lazy today");
//! # Ok(())
//! # }
//! ```
//!
//! # Cleanup guarantees
//!
//! Realized files are deleted in a sweep right after the block exits,
//! whether it returned `Ok` or `Err`. Should the process panic inside the
//! block, the handles' drop glue still removes the realized files on a
//! best-effort basis while the stack unwinds.

/// Provides the error taxonomy for handles and sessions.
pub mod error;
/// Provides the lazy temporary-file handle and its capability table.
pub mod handle;
/// Provides scoped sessions that bind handle cohorts to caller blocks.
pub mod session;

pub use error::{Error, Result, TeardownFailure};
pub use handle::{LazyFile, Operation};
pub use session::{with_files, with_files_in, Block, Session};
