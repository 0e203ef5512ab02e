//! Fold part files into the destination file in chunk order.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::output::OutputFile;
use super::part::part_path;
use crate::planner::ChunkPlan;

const COPY_BUF_SIZE: usize = 1024 * 1024;

/// Concatenates the part files of `plan` into `dest`, in ascending chunk
/// index order, at each chunk's start offset. The destination is created
/// fresh and preallocated to the plan's total size. Every part must hold
/// exactly its chunk's length. Part files are left in place; the caller
/// removes them.
///
/// Blocking; call from `spawn_blocking` in async code.
pub fn assemble_parts(dest: &Path, plan: &ChunkPlan) -> Result<u64> {
    let out = OutputFile::create(dest, plan.total_size())
        .with_context(|| format!("create {}", dest.display()))?;

    let mut buf = vec![0u8; COPY_BUF_SIZE];
    for chunk in plan.chunks() {
        let p = part_path(dest, chunk.index);
        let mut part = File::open(&p)
            .with_context(|| format!("missing part file {}", p.display()))?;
        let mut offset = chunk.start;
        loop {
            let n = part
                .read(&mut buf)
                .with_context(|| format!("read {}", p.display()))?;
            if n == 0 {
                break;
            }
            if offset + n as u64 > chunk.end + 1 {
                anyhow::bail!("part {} is longer than its chunk ({} bytes)", chunk.index, chunk.len());
            }
            out.write_at(offset, &buf[..n])
                .with_context(|| format!("write {}", dest.display()))?;
            offset += n as u64;
        }
        let got = offset - chunk.start;
        if got != chunk.len() {
            anyhow::bail!(
                "part {} holds {} bytes, expected {}",
                chunk.index,
                got,
                chunk.len()
            );
        }
    }
    out.finish().with_context(|| format!("sync {}", dest.display()))?;
    Ok(plan.total_size())
}
