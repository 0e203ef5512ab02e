//! Chunk planning.
//!
//! Splits a resource of known size into contiguous, inclusive byte ranges.
//! The chunk size is derived from the total size (a fixed fraction of it)
//! but never drops below a floor, so small resources get few large chunks.

mod chunk;

pub use chunk::Chunk;

/// Default number of chunks a large resource is split into.
pub const DEFAULT_TARGET_CHUNKS: u64 = 32;

/// Default lower bound on chunk size (5 MiB).
pub const DEFAULT_MIN_CHUNK_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The probe reported no usable length; nothing can be fetched by range.
    #[error("resource length is zero or unknown")]
    EmptyResource,
}

/// Ordered chunk layout covering `[0, total_size)` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Nominal chunk size; the last chunk may be shorter.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Computes chunk layouts. Deterministic: the same size always yields the same plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    target_chunks: u64,
    min_chunk_bytes: u64,
}

impl Default for ChunkPlanner {
    fn default() -> Self {
        Self {
            target_chunks: DEFAULT_TARGET_CHUNKS,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
        }
    }
}

impl ChunkPlanner {
    /// Zero values are bumped to 1 so the arithmetic below never divides by zero.
    pub fn new(target_chunks: u64, min_chunk_bytes: u64) -> Self {
        Self {
            target_chunks: target_chunks.max(1),
            min_chunk_bytes: min_chunk_bytes.max(1),
        }
    }

    /// Chunk size used for a resource of `total_size` bytes.
    pub fn chunk_size_for(&self, total_size: u64) -> u64 {
        (total_size / self.target_chunks).max(self.min_chunk_bytes)
    }

    /// Builds the plan: chunk `i` spans `[i*size, min((i+1)*size - 1, total_size - 1)]`.
    pub fn plan(&self, total_size: u64) -> Result<ChunkPlan, PlanError> {
        if total_size == 0 {
            return Err(PlanError::EmptyResource);
        }

        let chunk_size = self.chunk_size_for(total_size);
        let count = total_size.div_ceil(chunk_size);

        let mut chunks = Vec::with_capacity(count as usize);
        for i in 0..count {
            let start = i * chunk_size;
            let end = (start + chunk_size - 1).min(total_size - 1);
            chunks.push(Chunk {
                index: i as usize,
                start,
                end,
            });
        }

        Ok(ChunkPlan {
            total_size,
            chunk_size,
            chunks,
        })
    }
}
