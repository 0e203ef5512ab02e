//! Part files: one per chunk, written sequentially by a single owner.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::PART_SUFFIX;

/// Part file path for chunk `index`: `<dest>.part<index>`.
pub fn part_path(dest: &Path, index: usize) -> PathBuf {
    let mut o = dest.as_os_str().to_owned();
    o.push(format!("{}{}", PART_SUFFIX, index));
    PathBuf::from(o)
}

/// Sequential writer for one part file. Each attempt recreates the file, so a
/// retried chunk never keeps bytes from a failed attempt.
pub struct PartWriter {
    inner: BufWriter<File>,
    written: u64,
}

impl PartWriter {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            inner: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append `data`; safe to call many times with small buffers.
    pub fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered bytes and close the file.
    pub fn finish(mut self) -> io::Result<u64> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

/// Removes part files `0..count` of `dest`. Missing files are not an error.
/// Returns how many files were actually removed.
pub fn remove_parts(dest: &Path, count: usize) -> usize {
    let mut removed = 0;
    for index in 0..count {
        let p = part_path(dest, index);
        match fs::remove_file(&p) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %p.display(), error = %e, "failed to remove part file"),
        }
    }
    removed
}

/// Removes every `<dest>.part*` file in `dest`'s directory, whatever its index.
/// Used before a download starts, to clear leftovers of a crashed run.
pub fn remove_stray_parts(dest: &Path) -> io::Result<usize> {
    let Some(name) = dest.file_name().and_then(|n| n.to_str()) else {
        return Ok(0);
    };
    let prefix = format!("{}{}", name, PART_SUFFIX);
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let entries = match fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if file_name.starts_with(&prefix) {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
