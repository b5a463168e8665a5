//! Errors that abort the repair of one font resource

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use write_fonts::read::ReadError;

/// A fatal, per-resource failure.
///
/// Everything recoverable (an undecodable name record, a cmap entry pointing
/// at a glyph the font does not have) is reported through
/// [`Reporter`](crate::report::Reporter) events and never aborts a resource.
/// A `FixError` ends processing of the one resource it occurred in; callers
/// batching multiple fonts are expected to carry on with the rest.
#[derive(Debug, Error)]
pub enum FixError {
    /// The font file could not be read from disk.
    #[error("reading '{}' failed: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The font container could not be parsed.
    #[error("parsing '{}' failed: {source}", path.display())]
    Parse { path: PathBuf, source: ReadError },

    /// The font has no 'cmap' table. A character map is structurally
    /// required for the fix to be meaningful, so this resource fails.
    #[error("font has no 'cmap' table")]
    CmapMissing,

    /// Writing the repaired font failed after the fixes were computed.
    #[error("saving repaired font to '{}' failed: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}
