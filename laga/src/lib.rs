//! Repairing the two font tables most responsible for cross-platform
//! compatibility.
//!
//! Older fonts (and fonts extracted from collections) frequently carry only
//! Macintosh-platform [`name`] records and lack the Windows Unicode BMP
//! [`cmap`] subtable that most modern consumers require. This crate provides:
//! - a locale mapper that derives Windows name records from existing
//!   Macintosh ones ([`name::derive_windows_names`]),
//! - a synthesizer that builds a Windows/Unicode BMP format 4 character map
//!   from whatever Unicode-compatible subtables a font already has, and
//!   drops the obsolete Macintosh format 2 subtable
//!   ([`cmap::synthesize_windows_bmp`]),
//! - a per-font pipeline that runs both fixes and persists the result
//!   ([`pipeline::fix_font_file`]).
//!
//! Both fixers operate on plain in-memory table models and can be exercised
//! without a font file; [`resource::FontResource`] binds the models to real
//! font binaries on top of the `write-fonts`/`read-fonts` stack.
//!
//! [`name`]: https://learn.microsoft.com/en-us/typography/opentype/spec/name
//! [`cmap`]: https://learn.microsoft.com/en-us/typography/opentype/spec/cmap

#![forbid(unsafe_code)]

pub mod cmap;
pub mod error;
pub mod glyphs;
pub mod name;
pub mod pipeline;
pub mod report;
pub mod resource;
pub mod serialize;

pub use error::FixError;
pub use pipeline::{fix_font_file, fix_resource, FixOptions, FixReport};
pub use report::{Event, LogReporter, Recorder, Reporter};
pub use resource::FontResource;

// https://learn.microsoft.com/en-us/typography/opentype/spec/name#platform-ids
pub const UNICODE_PLATFORM: u16 = 0;
pub const MACINTOSH_PLATFORM: u16 = 1;
pub const WINDOWS_PLATFORM: u16 = 3;

// https://learn.microsoft.com/en-us/typography/opentype/spec/name#windows-encoding-ids
pub const WINDOWS_SYMBOL_ENCODING: u16 = 0;
pub const WINDOWS_BMP_ENCODING: u16 = 1;
pub const WINDOWS_FULL_REPERTOIRE_ENCODING: u16 = 10;
