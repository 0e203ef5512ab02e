//! The assembled elementary file: created fresh, preallocated, written at offsets.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

pub struct OutputFile {
    file: File,
    path: PathBuf,
}

impl OutputFile {
    /// Creates `path` (truncating anything there) and reserves `len` bytes.
    pub fn create(path: &Path, len: u64) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let out = Self {
            file,
            path: path.to_path_buf(),
        };
        out.reserve(len)?;
        Ok(out)
    }

    /// `posix_fallocate` where available, else a sparse `set_len`.
    fn reserve(&self, len: u64) -> io::Result<()> {
        #[cfg(unix)]
        {
            let r = unsafe { libc::posix_fallocate(self.file.as_raw_fd(), 0, len as libc::off_t) };
            if r == 0 {
                return Ok(());
            }
            tracing::debug!(errno = r, path = %self.path.display(), "posix_fallocate failed, using set_len");
        }
        self.file.set_len(len)
    }

    /// Writes all of `data` at `offset` without moving the cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Flushes data to disk and returns the file's path.
    pub fn finish(self) -> io::Result<PathBuf> {
        self.file.sync_all()?;
        Ok(self.path)
    }
}
