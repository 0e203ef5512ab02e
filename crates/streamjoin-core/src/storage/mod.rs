//! Disk I/O and temp file lifecycle.
//!
//! Each chunk streams into its own part file (`<dest>.part<N>`). Once every
//! chunk is done the parts are folded into a preallocated destination file in
//! ascending index order, and the parts are removed on every exit path.

mod assemble;
mod output;
mod part;

pub use assemble::assemble_parts;
pub use output::OutputFile;
pub use part::{part_path, remove_parts, remove_stray_parts, PartWriter};

/// Suffix between the destination name and the chunk index.
pub const PART_SUFFIX: &str = ".part";
