//! Read-only access to the ugoira ZIP archive.
//!
//! The archive stays open for the whole conversion; entries are opened
//! lazily by name. An entry reader borrows the archive mutably, so the
//! borrow checker enforces the one-live-entry-at-a-time rule the
//! underlying library requires.

use std::{fs::File, io::Read, path::Path};

use crate::error::UgoiraError;

/// An open ugoira archive.
pub(crate) struct Archive {
    inner: zip::ZipArchive<File>,
}

impl Archive {
    /// Open the archive at `path` read-only.
    ///
    /// # Errors
    ///
    /// [`UgoiraError::Archive`] if the file is missing, unreadable, or not
    /// a valid ZIP; the structured payload distinguishes the cases.
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self, UgoiraError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(zip::result::ZipError::Io)?;
        let inner = zip::ZipArchive::new(file)?;
        log::debug!(
            "Opened archive {} ({} entries)",
            path.display(),
            inner.len()
        );
        Ok(Self { inner })
    }

    /// Open the named entry for sequential reading.
    ///
    /// # Errors
    ///
    /// [`UgoiraError::Archive`] with a `FileNotFound` payload when no such
    /// entry exists.
    pub(crate) fn entry(&mut self, name: &str) -> Result<impl Read + '_, UgoiraError> {
        Ok(self.inner.by_name(name)?)
    }
}
