//! Diagnostics from the fixers, delivered to an injected observer
//!
//! The engine never talks to process-global logging state directly; every
//! component takes a [`Reporter`]. [`LogReporter`] forwards events to the
//! `log` crate for normal operation, [`Recorder`] collects them in memory so
//! tests (and batch summaries) can assert on exactly what happened.

use std::path::PathBuf;

/// One diagnostic event emitted while fixing a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A name record whose string bytes could not be decoded with its
    /// declared platform encoding. The record is kept but contributes no
    /// derived Windows record.
    UndecodableNameRecord {
        name_id: u16,
        platform_id: u16,
        encoding_id: u16,
        language_id: u16,
    },
    /// Number of Windows records appended by the locale mapper.
    WindowsNamesAdded { count: usize },
    /// A Windows/Unicode BMP format 4 subtable already exists; nothing to
    /// synthesize.
    BmpSubtablePresent,
    /// A Unicode-compatible subtable in a format the engine does not decode;
    /// it contributes nothing to the synthesized mapping.
    UndecodableSubtable {
        platform_id: u16,
        encoding_id: u16,
        format: u16,
    },
    /// Mapping entry dropped: format 4 cannot encode codepoints beyond the
    /// Basic Multilingual Plane.
    CodepointBeyondBmp { codepoint: u32 },
    /// Mapping entry dropped: the glyph name is not in the font's glyph
    /// order.
    UnknownGlyphName { codepoint: u32, glyph: String },
    /// Mapping entry dropped: the glyph's index cannot be encoded in a
    /// 16-bit subtable.
    GlyphIndexOutOfRange {
        codepoint: u32,
        glyph: String,
        index: u32,
    },
    /// A Windows/Unicode BMP format 4 subtable was built and appended.
    BmpSubtableSynthesized { mappings: usize },
    /// Number of legacy (Macintosh, encoding 1, format 2) subtables removed.
    /// Zero is a normal outcome.
    LegacySubtablesRemoved { count: usize },
    /// Deleting an intermediate artifact failed. Logged only; never fails
    /// the resource.
    CleanupFailed { path: PathBuf, error: String },
}

/// Observer for [`Event`]s.
pub trait Reporter {
    fn event(&mut self, event: Event);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn event(&mut self, event: Event) {
        (**self).event(event);
    }
}

/// Forwards every event to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn event(&mut self, event: Event) {
        match event {
            Event::UndecodableNameRecord {
                name_id,
                platform_id,
                encoding_id,
                language_id,
            } => log::warn!(
                "cannot decode name record (name id {name_id}, \
                 {platform_id}/{encoding_id}/{language_id:#06x}); skipping"
            ),
            Event::WindowsNamesAdded { count } => {
                log::debug!("name table fixed, {count} record(s) added")
            }
            Event::BmpSubtablePresent => {
                log::info!("Windows Unicode BMP format 4 subtable already present")
            }
            Event::UndecodableSubtable {
                platform_id,
                encoding_id,
                format,
            } => log::warn!(
                "cannot decode cmap subtable ({platform_id}, {encoding_id}) format {format}; \
                 it contributes no mappings"
            ),
            Event::CodepointBeyondBmp { codepoint } => {
                log::warn!("codepoint {codepoint:#x} is beyond the BMP; dropping mapping")
            }
            Event::UnknownGlyphName { codepoint, glyph } => log::warn!(
                "glyph name '{glyph}' not found in font; dropping mapping for {codepoint:#06x}"
            ),
            Event::GlyphIndexOutOfRange {
                codepoint,
                glyph,
                index,
            } => log::warn!(
                "glyph '{glyph}' has index {index}, outside 0..=65535; \
                 dropping mapping for {codepoint:#06x}"
            ),
            Event::BmpSubtableSynthesized { mappings } => log::info!(
                "added Windows Unicode BMP format 4 subtable with {mappings} mapping(s)"
            ),
            Event::LegacySubtablesRemoved { count } => {
                if count > 0 {
                    log::debug!("removed {count} legacy format 2 subtable(s)")
                }
            }
            Event::CleanupFailed { path, error } => log::warn!(
                "could not remove intermediate file '{}': {error}",
                path.display()
            ),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any recorded event matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&Event) -> bool) -> bool {
        self.events.iter().any(predicate)
    }
}

impl Reporter for Recorder {
    fn event(&mut self, event: Event) {
        self.events.push(event);
    }
}
