//! Scoped sessions that hand blocks of code their lazy temporary files.
//!
//! A session creates one unrealized [LazyFile](../handle/struct.LazyFile.html)
//! per parameter the caller's block declares, runs the block, then closes and
//! deletes whatever the block actually realized. The cohort size comes from
//! the block's own signature: a two-parameter block gets two handles, a
//! five-parameter block gets five, a parameterless block gets none. Cleanup
//! is unconditional - it happens when the block returns `Ok`, when it
//! returns `Err`, and through the handles' drop glue even when it panics.
//!
//! # Usage
//!
//! The simplest entry point is [with_files](fn.with_files.html):
//!
//! ```no_run
//! use fs_lazy::{with_files, LazyFile};
//!
//! # fn main() -> fs_lazy::Result<()> {
//! with_files("printio", |log: &mut LazyFile, _scratch: &mut LazyFile| {
//!     use std::io::Write;
//!
//!     // Only `log` is used, so only one file is ever created
//!     log.write_all(b"first and last entry")?;
//!     Ok(())
//! })?;
//! // Both handles are gone here, and so is the one created file
//! # Ok(())
//! # }
//! ```
//!
//! For anything beyond a prefix, configure a [Session](struct.Session.html):
//!
//! ```no_run
//! use fs_lazy::{LazyFile, Session};
//!
//! # fn main() -> fs_lazy::Result<()> {
//! Session::new("printio")
//!     .in_dir("./scratch")
//!     .suffix(".log")
//!     .run(|file: &mut LazyFile| {
//!         println!("would live at {:?}", file.path()?);
//!         Ok(())
//!     })?;
//! # Ok(())
//! # }
//! ```
//!
//! Note that the parameter types are spelled out in both blocks. The session
//! picks the cohort size from the closure's signature, so the closure can't
//! lean on the usual argument-driven inference - annotate its parameters.

use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::{Error, Result, TeardownFailure};
use crate::handle::LazyFile;

// ////////////////////////////////////////////////////////////////////////// //
//                                    API                                     //
// ////////////////////////////////////////////////////////////////////////// //

/// A block of caller code that receives its lazy files as parameters.
///
/// Implemented for closures and functions that take zero up to eight
/// `&mut LazyFile` parameters and return [Result](../error/type.Result.html).
/// The session sizes its cohort from [ARITY](#associatedconstant.ARITY),
/// which the implementations derive from the parameter list - the block's
/// body is never inspected.
///
/// The `A` parameter is a marker that only carries the arity, so that the
/// blanket implementations for the different closure shapes don't overlap.
/// For cohorts larger than eight, or sized at run time, see
/// [Session::run_n](struct.Session.html#method.run_n).
pub trait Block<A> {
    /// The number of `&mut LazyFile` parameters the block declares.
    const ARITY: usize;
    /// The success value the block produces.
    type Ok;

    /// Calls the block with handles drawn from `files`, which holds exactly
    /// [ARITY](#associatedconstant.ARITY) of them.
    ///
    /// # Panics
    ///
    /// In case `files` holds any other number of handles. Sessions always
    /// size the cohort from [ARITY](#associatedconstant.ARITY), so only a
    /// direct caller can trip this.
    fn call(self, files: &mut [LazyFile]) -> Result<Self::Ok>;
}

/// Hands `block` as many lazy temporary files as it declares parameters and
/// removes every file it realized once it's done. The files are created in
/// the platform's default temporary directory, named with the given prefix.
///
/// Equivalent to `Session::new(prefix).run(block)`.
///
/// # Examples
///
/// ```no_run
/// use fs_lazy::{with_files, LazyFile};
///
/// # fn main() -> fs_lazy::Result<()> {
/// let size = with_files("printio", |file: &mut LazyFile| {
///     use std::io::Write;
///
///     file.write_all(b"measured, then deleted")?;
///     file.size()
/// })?;
/// assert_eq!(size, 22);
/// # Ok(())
/// # }
/// ```
///
/// Note that `file`'s type is spelled out. The cohort is sized from the
/// closure's own signature, so the parameters can't be left to the usual
/// argument-driven inference - annotate them.
///
/// # Errors
///
/// The block's own error is returned as-is. If the block succeeded and a
/// realized file still couldn't be removed, a teardown error variant is
/// returned instead of the block's value.
pub fn with_files<A, F>(prefix: &str, block: F) -> Result<F::Ok>
    where F: Block<A> {
    Session::new(prefix).run(block)
}

/// Same as [with_files](fn.with_files.html), except that the files are
/// created inside the given root directory.
///
/// # Examples
///
/// ```no_run
/// use fs_lazy::{with_files_in, LazyFile};
///
/// # fn main() -> fs_lazy::Result<()> {
/// with_files_in("./scratch", "printio", |file: &mut LazyFile| {
///     assert!(file.path()?.starts_with("./scratch"));
///     Ok(())
/// })?;
/// # Ok(())
/// # }
/// ```
pub fn with_files_in<A, F>(root: impl AsRef<Path>, prefix: &str, block: F) -> Result<F::Ok>
    where F: Block<A> {
    Session::new(prefix).in_dir(root).run(block)
}

/// The configuration and entry point for one cohort of lazy temporary
/// files.
///
/// A session carries the filename prefix, the optional root directory and
/// the optional filename suffix its files are created with. Running it
/// consumes it - clone the session to run the same configuration again.
#[derive(Debug, Clone)]
pub struct Session {
    prefix: String,
    root: Option<PathBuf>,
    suffix: Option<String>,
}

impl Session {
    /// Creates a session whose files carry the given filename prefix and
    /// live in the platform's default temporary directory.
    pub fn new(prefix: &str) -> Self {
        Self{
            prefix: prefix.to_string(),
            root: None,
            suffix: None,
        }
    }

    /// Creates the session's files under the given directory instead of the
    /// platform default. The directory must already exist.
    pub fn in_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Appends the given suffix to every created filename - with the dot,
    /// if one is wanted.
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_string());
        self
    }

    /// Runs `block` with as many fresh lazy files as it declares parameters,
    /// then closes and deletes every file the block realized. Files the
    /// block never touched are never created in the first place.
    ///
    /// The block's parameter types must be annotated, as in the example
    /// below - its signature is what sizes the cohort, so the types can't
    /// be inferred from the call.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fs_lazy::{LazyFile, Session};
    ///
    /// # fn main() -> fs_lazy::Result<()> {
    /// let session = Session::new("printio").suffix(".tmp");
    /// session.run(|a: &mut LazyFile, b: &mut LazyFile| {
    ///     use std::io::Write;
    ///
    ///     a.write_all(b"left")?;
    ///     b.write_all(b"right")?;
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// A failing block keeps its error: teardown still runs for the whole
    /// cohort, but its failures are only logged then. If the block succeeded
    /// and teardown didn't, all collected teardown failures are returned in
    /// a single error variant in place of the block's value.
    pub fn run<A, F>(self, block: F) -> Result<F::Ok>
        where F: Block<A> {
        self.scoped(F::ARITY, |files| block.call(files))
    }

    /// Runs `block` with a cohort sized at run time, handed over as a slice
    /// instead of individual parameters. Everything else works exactly like
    /// [run](#method.run).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fs_lazy::Session;
    ///
    /// # fn main() -> fs_lazy::Result<()> {
    /// Session::new("printio").run_n(12, |files| {
    ///     for file in files.iter_mut() {
    ///         file.path()?;
    ///     }
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn run_n<T, F>(self, count: usize, block: F) -> Result<T>
        where F: FnOnce(&mut [LazyFile]) -> Result<T> {
        self.scoped(count, block)
    }

    /// The acquire-run-release discipline shared by [run](#method.run) and
    /// [run_n](#method.run_n).
    fn scoped<T, F>(self, count: usize, block: F) -> Result<T>
        where F: FnOnce(&mut [LazyFile]) -> Result<T> {
        trace!(prefix = %self.prefix, count, "session started");
        let mut files: Vec<_> = (0..count).map(|_| self.handle()).collect();
        let outcome = block(&mut files);
        // Release every realized file, even the ones after a failing one
        let mut failures = Vec::new();
        for (index, file) in files.iter_mut().enumerate() {
            if let Err(source) = file.close() {
                warn!(index, error = %source, "temporary file teardown failed");
                failures.push(TeardownFailure{ index, source });
            }
        }
        trace!(prefix = %self.prefix, count, "session finished");
        match outcome {
            // The block's own failure wins, the sweep above already logged
            // its failures
            Err(err) => Err(err),
            Ok(value) => {
                if failures.is_empty() {
                    Ok(value)
                }
                else {
                    Err(Error::Teardown(failures))
                }
            }
        }
    }

    /// Creates one unrealized handle with this session's configuration.
    fn handle(&self) -> LazyFile {
        LazyFile::new(&self.prefix, self.root.as_deref(), self.suffix.as_deref())
    }
}

// ////////////////////////////////////////////////////////////////////////// //
//                               Implementation                               //
// ////////////////////////////////////////////////////////////////////////// //

/// Parameterless blocks are legal too: the session then manages an empty
/// cohort, which realizes nothing and tears down nothing.
impl<T, F> Block<[LazyFile; 0]> for F
    where F: FnOnce() -> Result<T> {
    const ARITY: usize = 0;
    type Ok = T;

    fn call(self, _files: &mut [LazyFile]) -> Result<T> {
        self()
    }
}

macro_rules! impl_block {
    ($( $arity:tt => |$( $file:ident: $ty:ty ),+| );+ $(;)?) => {$(
        impl<T, F> Block<[LazyFile; $arity]> for F
            where F: FnOnce($($ty),+) -> Result<T> {
            const ARITY: usize = $arity;
            type Ok = T;

            fn call(self, files: &mut [LazyFile]) -> Result<T> {
                match files {
                    [$($file),+] => self($($file),+),
                    _ => unreachable!("a session cohort always matches its block's arity"),
                }
            }
        }
    )+};
}

impl_block!{
    1 => |a: &mut LazyFile|;
    2 => |a: &mut LazyFile, b: &mut LazyFile|;
    3 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile|;
    4 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
          d: &mut LazyFile|;
    5 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
          d: &mut LazyFile, e: &mut LazyFile|;
    6 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
          d: &mut LazyFile, e: &mut LazyFile, f: &mut LazyFile|;
    7 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
          d: &mut LazyFile, e: &mut LazyFile, f: &mut LazyFile,
          g: &mut LazyFile|;
    8 => |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
          d: &mut LazyFile, e: &mut LazyFile, f: &mut LazyFile,
          g: &mut LazyFile, h: &mut LazyFile|;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Operation;
    use std::fs;
    use std::io::{self, Write};
    use std::panic;

    /// Counts the entries under `dir` whose filename starts with `prefix`.
    fn prefixed(dir: &Path, prefix: &str) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
            .count()
    }

    #[test]
    fn test_parameterless_block_runs() -> Result<()> {
        let value = with_files("printio", || Ok("ran"))?;
        assert_eq!(value, "ran");
        Ok(())
    }

    #[test]
    fn test_each_declared_parameter_gets_a_handle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let session = Session::new("printio").in_dir(dir.path());
        session.clone().run(|a: &mut LazyFile, b: &mut LazyFile| {
            assert!(!a.is_realized());
            assert!(!b.is_realized());
            Ok(())
        })?;
        // Five parameters, five handles
        session.run(
            |a: &mut LazyFile, b: &mut LazyFile, c: &mut LazyFile,
             d: &mut LazyFile, e: &mut LazyFile| {
                for file in [a, b, c, d, e].iter() {
                    assert!(!file.is_realized());
                }
                Ok(())
            },
        )?;
        Ok(())
    }

    #[test]
    fn test_only_touched_handles_create_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        with_files_in(dir.path(), "printio", |used: &mut LazyFile, _spare: &mut LazyFile| {
            assert_eq!(prefixed(dir.path(), "printio"), 0);
            let path = used.path()?;
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("printio"));
            // Only the touched handle hit the disk
            assert_eq!(prefixed(dir.path(), "printio"), 1);
            Ok(())
        })?;
        assert_eq!(prefixed(dir.path(), "printio"), 0);
        Ok(())
    }

    #[test]
    fn test_single_parameter_receives_the_handle_directly() -> Result<()> {
        let dir = tempfile::tempdir()?;
        with_files_in(dir.path(), "printio", |file: &mut LazyFile| {
            file.write_all(b"direct")?;
            assert_eq!(file.size()?, 6);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_cleanup_after_success() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let realized = with_files_in(
            dir.path(),
            "printio",
            |a: &mut LazyFile, b: &mut LazyFile, _c: &mut LazyFile| {
                a.path()?;
                b.path()?;
                assert_eq!(prefixed(dir.path(), "printio"), 2);
                Ok(2)
            },
        )?;
        assert_eq!(realized, 2);
        assert_eq!(prefixed(dir.path(), "printio"), 0);
        Ok(())
    }

    #[test]
    fn test_cleanup_after_block_failure() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let result = with_files_in(
            dir.path(),
            "printio",
            |used: &mut LazyFile, _second: &mut LazyFile, _third: &mut LazyFile| -> Result<()> {
                // One realized out of three, then the block fails
                used.path()?;
                assert_eq!(prefixed(dir.path(), "printio"), 1);
                Err(Error::Io(io::Error::new(io::ErrorKind::Other, "boom")))
            },
        );
        match result {
            Err(Error::Io(err)) => assert_eq!(err.to_string(), "boom"),
            other => panic!("expected the block's own error, got {:?}", other),
        }
        // The realized file is gone regardless
        assert_eq!(prefixed(dir.path(), "printio"), 0);
        Ok(())
    }

    #[test]
    fn test_cleanup_after_panic() {
        let dir = tempfile::tempdir().unwrap();
        let caught = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            let _ = with_files_in(dir.path(), "printio", |file: &mut LazyFile| -> Result<()> {
                file.path()?;
                panic!("bail out")
            });
        }));
        assert!(caught.is_err());
        // The unwinding drop glue still removed the realized file
        assert_eq!(prefixed(dir.path(), "printio"), 0);
    }

    #[test]
    fn test_capability_queries_stay_pure_inside_a_session() -> Result<()> {
        let dir = tempfile::tempdir()?;
        with_files_in(dir.path(), "printio", |file: &mut LazyFile| {
            assert!(file.supports(Operation::Path));
            assert!(file.supports(Operation::Delete));
            assert!(!file.is_realized());
            assert_eq!(prefixed(dir.path(), "printio"), 0);
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_capability_answers_are_uniform_across_cohorts() -> Result<()> {
        for count in 1..=5 {
            Session::new("printio").run_n(count, |files| {
                assert_eq!(files.len(), count);
                for file in files.iter() {
                    for op in Operation::ALL.iter() {
                        assert!(file.supports(*op));
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    #[test]
    fn test_run_n_sizes_the_cohort_dynamically() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let realized = Session::new("printio").in_dir(dir.path()).run_n(4, |files| {
            for file in files.iter_mut() {
                file.path()?;
            }
            assert_eq!(prefixed(dir.path(), "printio"), 4);
            Ok(files.iter().filter(|file| file.is_realized()).count())
        })?;
        assert_eq!(realized, 4);
        assert_eq!(prefixed(dir.path(), "printio"), 0);
        Ok(())
    }

    #[test]
    fn test_suffix_and_directory_options() -> Result<()> {
        let dir = tempfile::tempdir()?;
        Session::new("printio")
            .in_dir(dir.path())
            .suffix(".txt")
            .run(|file: &mut LazyFile| {
                let path = file.path()?;
                assert_eq!(
                    fs::canonicalize(path.parent().unwrap())?,
                    fs::canonicalize(dir.path())?
                );
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                assert!(name.starts_with("printio"));
                assert!(name.ends_with(".txt"));
                Ok(())
            })?;
        Ok(())
    }

    #[test]
    fn test_block_may_close_its_own_handle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        with_files_in(dir.path(), "printio", |file: &mut LazyFile| {
            file.path()?;
            file.close()?;
            assert_eq!(prefixed(dir.path(), "printio"), 0);
            // The sweep's second close is a no-op then
            Ok(())
        })?;
        Ok(())
    }

    #[test]
    fn test_teardown_failures_are_collected_not_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut second_path = PathBuf::new();
        let result = Session::new("printio").in_dir(dir.path()).run(
            |gone: &mut LazyFile, kept: &mut LazyFile| {
                // Pull the first file out from under the session
                fs::remove_file(gone.path()?)?;
                second_path = kept.path()?;
                Ok(())
            },
        );
        match result {
            Err(Error::Teardown(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].index, 0);
            }
            other => panic!("expected a teardown error, got {:?}", other),
        }
        // The sweep went on past the failure and removed the second file
        assert!(!second_path.exists());
        Ok(())
    }

    #[test]
    fn test_block_failure_wins_over_teardown_failure() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Session::new("printio").in_dir(dir.path()).run(
            |file: &mut LazyFile| -> Result<()> {
                // Sabotage teardown and fail the block itself too
                fs::remove_file(file.path()?)?;
                Err(Error::Io(io::Error::new(io::ErrorKind::Other, "sentinel")))
            },
        );
        match result {
            Err(Error::Io(err)) => assert_eq!(err.to_string(), "sentinel"),
            other => panic!("expected the block's error to win, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_block_value_passes_through() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let report = with_files_in(dir.path(), "printio", |file: &mut LazyFile| {
            file.write_all(b"measured")?;
            Ok(format!("wrote {} bytes", file.size()?))
        })?;
        assert_eq!(report, "wrote 8 bytes");
        Ok(())
    }

    #[test]
    #[should_panic(expected = "cohort")]
    fn test_direct_call_with_wrong_cohort_size_panics() {
        let block = |_file: &mut LazyFile| -> Result<()> { Ok(()) };
        // A one-parameter block handed an empty cohort
        let mut files = Vec::new();
        let _ = block.call(&mut files);
    }
}
