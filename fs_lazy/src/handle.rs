//! Lazy handles for temporary files.
//!
//! A [LazyFile](struct.LazyFile.html) stands in for a temporary file that
//! might never be needed. Constructing one does no IO at all. The real file
//! only appears on disk when the handle is first asked to do something that
//! requires it - returning its path, reading or writing bytes, reporting its
//! size. Asking what a handle *could* do is not such an ask:
//! [supports](struct.LazyFile.html#method.supports) answers from a fixed
//! capability table and never creates anything.
//!
//! Handles are created in cohorts by the [session](../session/index.html)
//! module and are closed and deleted when their session ends, no matter how
//! the session's block exited. A handle that was never used leaves no trace
//! on the filesystem at any point of its life.
//!
//! # Usage
//!
//! Handles can't be constructed on their own, a session hands them out:
//!
//! ```no_run
//! use fs_lazy::{with_files, LazyFile, Operation};
//!
//! # fn main() -> fs_lazy::Result<()> {
//! with_files("printio", |file: &mut LazyFile| {
//!     // Nothing on disk so far, and capability queries keep it that way
//!     assert!(!file.is_realized());
//!     assert!(file.supports(Operation::Write));
//!     assert!(!file.is_realized());
//!
//!     // The first forwarded operation creates the backing file
//!     let path = file.path()?;
//!     assert!(path.exists());
//!     Ok(())
//! })?;
//! // And here it's deleted again
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::debug;

use crate::error::{Error, Result};

// ////////////////////////////////////////////////////////////////////////// //
//                                    API                                     //
// ////////////////////////////////////////////////////////////////////////// //

/// The operations a [LazyFile](struct.LazyFile.html) can forward to its
/// backing file.
///
/// The set is fixed up front, which is what lets
/// [supports](struct.LazyFile.html#method.supports) answer capability
/// queries without touching the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Returning the path of the backing file.
    Path,
    /// Reading bytes through `std::io::Read`.
    Read,
    /// Writing bytes through `std::io::Write`.
    Write,
    /// Repositioning through `std::io::Seek`.
    Seek,
    /// Reporting the current size in bytes.
    Size,
    /// Opening an independent handle to the same backing file.
    Reopen,
    /// Closing the backing file.
    Close,
    /// Deleting the backing file from the filesystem.
    Delete,
}

impl Operation {
    /// Every operation a backing file services once realized.
    pub const ALL: [Operation; 8] = [
        Operation::Path,
        Operation::Read,
        Operation::Write,
        Operation::Seek,
        Operation::Size,
        Operation::Reopen,
        Operation::Close,
        Operation::Delete,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Path => "path",
            Self::Read => "read",
            Self::Write => "write",
            Self::Seek => "seek",
            Self::Size => "size",
            Self::Reopen => "reopen",
            Self::Close => "close",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A lazily created temporary file.
///
/// The handle starts out empty and stays that way until the first operation
/// that needs a real file behind it. From then on every operation goes to
/// that one backing file, until [close](#method.close) deletes it. A handle
/// that gets dropped without ever being closed still deletes its backing
/// file - if it created one - through the file's own drop glue.
#[derive(Debug)]
pub struct LazyFile {
    prefix: String,
    root: Option<PathBuf>,
    suffix: Option<String>,
    // `Some` exactly while the backing file exists on disk
    file: Option<NamedTempFile>,
    closed: bool,
}

impl LazyFile {
    /// Creates an unrealized handle with the given filename prefix, in the
    /// given root directory - or the platform's default temporary directory,
    /// if there is none. Does no IO.
    pub(crate) fn new(prefix: &str, root: Option<&Path>, suffix: Option<&str>) -> Self {
        Self{
            prefix: prefix.to_string(),
            root: root.map(Path::to_path_buf),
            suffix: suffix.map(str::to_string),
            file: None,
            closed: false,
        }
    }

    /// Returns the filename prefix this handle was configured with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `true`, if the backing file has been created already.
    ///
    /// This is a pure query, it never creates the file.
    pub fn is_realized(&self) -> bool {
        self.file.is_some()
    }

    /// Returns `true`, if the given operation can be forwarded to the
    /// backing file.
    ///
    /// Answered from [Operation::ALL](enum.Operation.html#associatedconstant.ALL)
    /// alone: asking never creates the backing file, no matter how often, in
    /// what order, or in what state the handle is asked.
    pub fn supports(&self, op: Operation) -> bool {
        Operation::ALL.contains(&op)
    }

    /// Returns the path of the backing file, creating the file first if this
    /// is the handle's first forwarded operation.
    ///
    /// # Errors
    ///
    /// In case the file can't be created, an error variant is returned and
    /// the handle stays unrealized.
    pub fn path(&mut self) -> Result<PathBuf> {
        Ok(self.backing()?.path().to_path_buf())
    }

    /// Returns the current size of the backing file in bytes, creating the
    /// file first if needed. A freshly realized file reports 0.
    ///
    /// # Errors
    ///
    /// In case the file can't be created or its metadata can't be read, an
    /// error variant is returned.
    pub fn size(&mut self) -> Result<u64> {
        let file = self.backing()?;
        let path = file.path().to_path_buf();
        file.as_file()
            .metadata()
            .map(|meta| meta.len())
            .map_err(|source| Error::Forward{ op: Operation::Size, path, source })
    }

    /// Opens an independent `File` for the same backing file, creating it
    /// first if needed. The returned file has its own cursor starting at 0
    /// and stays usable past this handle's teardown, though the file behind
    /// it is deleted there.
    ///
    /// # Errors
    ///
    /// In case the file can't be created or reopened, an error variant is
    /// returned.
    pub fn reopen(&mut self) -> Result<File> {
        let file = self.backing()?;
        let path = file.path().to_path_buf();
        file.reopen()
            .map_err(|source| Error::Forward{ op: Operation::Reopen, path, source })
    }

    /// Borrows the backing file itself, creating it first if needed. This is
    /// the escape hatch to everything `std::fs::File` can do that the handle
    /// doesn't forward on its own.
    ///
    /// # Errors
    ///
    /// In case the file can't be created, an error variant is returned.
    pub fn as_file(&mut self) -> Result<&File> {
        Ok(self.backing()?.as_file())
    }

    /// Mutably borrows the backing file itself, creating it first if needed.
    ///
    /// # Errors
    ///
    /// In case the file can't be created, an error variant is returned.
    pub fn as_file_mut(&mut self) -> Result<&mut File> {
        Ok(self.backing()?.as_file_mut())
    }

    /// Closes the handle, deleting the backing file if one was ever created.
    ///
    /// Closing is idempotent. On a handle that never realized its file this
    /// is a no-op and the handle stays usable. Once a realized file has been
    /// deleted, every later forwarded operation reports the handle closed,
    /// while repeated `close` calls keep returning `Ok`.
    ///
    /// # Errors
    ///
    /// In case the realized file can't be removed, an error variant is
    /// returned. The handle counts as closed even then.
    pub fn close(&mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => {
                self.closed = true;
                let path = file.path().to_path_buf();
                debug!(path = %path.display(), "deleting temporary file");
                file.close()
                    .map_err(|source| Error::Forward{ op: Operation::Close, path, source })
            }
            // Nothing on disk to remove
            None => Ok(()),
        }
    }

    /// Returns the backing file, creating it on the first call.
    fn backing(&mut self) -> Result<&mut NamedTempFile> {
        if self.closed {
            return Err(Error::Closed{ prefix: self.prefix.clone() });
        }
        // A creation failure propagates while `file` still holds the `None`
        // that `take` left behind, so the handle stays unrealized
        let file = match self.file.take() {
            Some(file) => file,
            None => self.create()?,
        };
        Ok(self.file.insert(file))
    }

    /// Creates the backing file with the configured prefix, suffix and root
    /// directory.
    fn create(&self) -> Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(&self.prefix);
        if let Some(suffix) = &self.suffix {
            builder.suffix(suffix);
        }
        let created = match &self.root {
            Some(root) => builder.tempfile_in(root),
            None => builder.tempfile(),
        };
        match created {
            Ok(file) => {
                debug!(
                    path = %file.path().display(),
                    prefix = %self.prefix,
                    "realized temporary file"
                );
                Ok(file)
            }
            Err(source) => Err(Error::Realize{ prefix: self.prefix.clone(), source }),
        }
    }
}

impl Read for LazyFile {
    /// Reads from the backing file, creating it first if needed. A creation
    /// failure comes back as an `io::Error` wrapping the crate's own error.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.backing().map_err(into_io)?.as_file_mut().read(buf)
    }
}

impl Write for LazyFile {
    /// Writes to the backing file, creating it first if needed. A creation
    /// failure comes back as an `io::Error` wrapping the crate's own error.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.backing().map_err(into_io)?.as_file_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.backing().map_err(into_io)?.as_file_mut().flush()
    }
}

impl Seek for LazyFile {
    /// Repositions the backing file's cursor, creating the file first if
    /// needed - seeking is as much of a first use as reading or writing.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.backing().map_err(into_io)?.as_file_mut().seek(pos)
    }
}

// ////////////////////////////////////////////////////////////////////////// //
//                               Implementation                               //
// ////////////////////////////////////////////////////////////////////////// //

/// Wraps a crate error into an IO error for the forwarded trait surfaces.
fn into_io(err: Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
