//! The character map model and the Windows Unicode BMP synthesizer
//!
//! Windows consumers expect a (platform 3, encoding 1) format 4 subtable.
//! [`synthesize_windows_bmp`] builds one when it is missing by merging every
//! Unicode-compatible subtable the font already carries, and unconditionally
//! drops the legacy Macintosh format 2 subtable that confuses modern
//! environments.

use std::collections::BTreeMap;

use crate::glyphs::GlyphOrder;
use crate::report::{Event, Reporter};
use crate::{
    MACINTOSH_PLATFORM, UNICODE_PLATFORM, WINDOWS_BMP_ENCODING,
    WINDOWS_FULL_REPERTOIRE_ENCODING, WINDOWS_PLATFORM, WINDOWS_SYMBOL_ENCODING,
};

// https://learn.microsoft.com/en-us/typography/opentype/spec/cmap
/// Format 2, the legacy "high-byte mapping" format used by old Macintosh
/// CJK fonts.
pub const HIGH_BYTE_MAPPING: u16 = 2;
/// Format 4, segment mapping to delta values; restricted to the BMP.
pub const SEGMENT_MAPPING: u16 = 4;

/// Codepoint → glyph name.
pub type Mapping = BTreeMap<u32, String>;

/// What a subtable's content looks like in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtableData {
    /// Parsed from a supported binary format. The original bytes are kept so
    /// untouched subtables round-trip byte-identically.
    Decoded { mapping: Mapping, raw: Vec<u8> },
    /// Synthesized in memory; compiled to format 4 when the font is saved.
    Built { mapping: Mapping },
    /// A format this crate does not interpret; carried through unchanged.
    Raw(Vec<u8>),
}

/// One cmap subtable with its platform/encoding/format discriminants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmapSubtable {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub format: u16,
    pub language: u32,
    pub data: SubtableData,
}

impl CmapSubtable {
    /// True when (platform, encoding) is one of the recognized Unicode
    /// pairs: the Unicode platform with any encoding, or Windows with the
    /// symbol, BMP or full-repertoire encodings.
    pub fn is_unicode(&self) -> bool {
        self.platform_id == UNICODE_PLATFORM
            || (self.platform_id == WINDOWS_PLATFORM
                && matches!(
                    self.encoding_id,
                    WINDOWS_SYMBOL_ENCODING
                        | WINDOWS_BMP_ENCODING
                        | WINDOWS_FULL_REPERTOIRE_ENCODING
                ))
    }

    /// The decoded mapping, if this subtable has one.
    pub fn mapping(&self) -> Option<&Mapping> {
        match &self.data {
            SubtableData::Decoded { mapping, .. } | SubtableData::Built { mapping } => {
                Some(mapping)
            }
            SubtableData::Raw(_) => None,
        }
    }
}

/// An order-preserving list of subtables.
///
/// Order matters: when several Unicode-compatible subtables map the same
/// codepoint, [`synthesize_windows_bmp`] lets the subtable that appears
/// later in the list win.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CmapTable {
    subtables: Vec<CmapSubtable>,
}

impl CmapTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subtables(subtables: Vec<CmapSubtable>) -> Self {
        Self { subtables }
    }

    pub fn len(&self) -> usize {
        self.subtables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }

    pub fn subtables(&self) -> &[CmapSubtable] {
        &self.subtables
    }

    pub fn push(&mut self, subtable: CmapSubtable) {
        self.subtables.push(subtable);
    }

    pub fn find(&self, platform_id: u16, encoding_id: u16, format: u16) -> Option<&CmapSubtable> {
        self.subtables.iter().find(|subtable| {
            subtable.platform_id == platform_id
                && subtable.encoding_id == encoding_id
                && subtable.format == format
        })
    }
}

/// What [`synthesize_windows_bmp`] did to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapFixSummary {
    /// Number of mappings in the newly built subtable, or `None` when a
    /// (Windows, BMP, format 4) subtable already existed.
    pub synthesized: Option<usize>,
    /// Number of legacy (Macintosh, 1, format 2) subtables removed.
    pub legacy_removed: usize,
}

/// Ensure a (Windows, Unicode BMP, format 4) subtable exists, then remove
/// every legacy (Macintosh, 1, format 2) subtable.
///
/// When the subtable is missing it is built from the union of all
/// Unicode-compatible subtables' entries, read in table order with the later
/// subtable winning per codepoint. Entries are dropped (and reported) when
/// the codepoint is beyond the BMP, the glyph name is not in `glyphs`, or
/// the resolved index does not fit in 16 bits. The new subtable is appended,
/// leaving every existing subtable in place.
///
/// The legacy removal always runs, whether or not anything was synthesized;
/// removing zero subtables is a normal outcome.
pub fn synthesize_windows_bmp<R: Reporter>(
    cmap: &mut CmapTable,
    glyphs: &GlyphOrder,
    reporter: &mut R,
) -> CmapFixSummary {
    let synthesized = if cmap
        .find(WINDOWS_PLATFORM, WINDOWS_BMP_ENCODING, SEGMENT_MAPPING)
        .is_some()
    {
        reporter.event(Event::BmpSubtablePresent);
        None
    } else {
        let mapping = merged_unicode_mapping(cmap, glyphs, reporter);
        let count = mapping.len();
        cmap.push(CmapSubtable {
            platform_id: WINDOWS_PLATFORM,
            encoding_id: WINDOWS_BMP_ENCODING,
            format: SEGMENT_MAPPING,
            language: 0,
            data: SubtableData::Built { mapping },
        });
        reporter.event(Event::BmpSubtableSynthesized { mappings: count });
        Some(count)
    };

    let before = cmap.subtables.len();
    cmap.subtables.retain(|subtable| {
        !(subtable.platform_id == MACINTOSH_PLATFORM
            && subtable.encoding_id == 1
            && subtable.format == HIGH_BYTE_MAPPING)
    });
    let legacy_removed = before - cmap.subtables.len();
    reporter.event(Event::LegacySubtablesRemoved {
        count: legacy_removed,
    });

    CmapFixSummary {
        synthesized,
        legacy_removed,
    }
}

/// The union of all Unicode-compatible subtables' valid entries, in table
/// order; when two subtables map the same codepoint the later one wins.
fn merged_unicode_mapping<R: Reporter>(
    cmap: &CmapTable,
    glyphs: &GlyphOrder,
    reporter: &mut R,
) -> Mapping {
    let mut merged = Mapping::new();
    for subtable in cmap.subtables() {
        if !subtable.is_unicode() {
            continue;
        }
        let Some(mapping) = subtable.mapping() else {
            reporter.event(Event::UndecodableSubtable {
                platform_id: subtable.platform_id,
                encoding_id: subtable.encoding_id,
                format: subtable.format,
            });
            continue;
        };
        for (&codepoint, glyph) in mapping {
            if codepoint > 0xFFFF {
                reporter.event(Event::CodepointBeyondBmp { codepoint });
                continue;
            }
            let Some(index) = glyphs.index_of(glyph) else {
                reporter.event(Event::UnknownGlyphName {
                    codepoint,
                    glyph: glyph.clone(),
                });
                continue;
            };
            if index > 0xFFFF {
                reporter.event(Event::GlyphIndexOutOfRange {
                    codepoint,
                    glyph: glyph.clone(),
                    index,
                });
                continue;
            }
            merged.insert(codepoint, glyph.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::report::Recorder;

    fn glyphs(names: &[&str]) -> GlyphOrder {
        GlyphOrder::new(names.iter().map(|n| n.to_string()).collect())
    }

    fn unicode_subtable(entries: &[(u32, &str)]) -> CmapSubtable {
        CmapSubtable {
            platform_id: UNICODE_PLATFORM,
            encoding_id: 3,
            format: SEGMENT_MAPPING,
            language: 0,
            data: SubtableData::Decoded {
                mapping: entries
                    .iter()
                    .map(|(cp, name)| (*cp, name.to_string()))
                    .collect(),
                raw: Vec::new(),
            },
        }
    }

    fn legacy_subtable() -> CmapSubtable {
        CmapSubtable {
            platform_id: MACINTOSH_PLATFORM,
            encoding_id: 1,
            format: HIGH_BYTE_MAPPING,
            language: 1,
            data: SubtableData::Raw(vec![0; 8]),
        }
    }

    fn windows_bmp(cmap: &CmapTable) -> &CmapSubtable {
        cmap.find(WINDOWS_PLATFORM, WINDOWS_BMP_ENCODING, SEGMENT_MAPPING)
            .expect("synthesized subtable missing")
    }

    #[test]
    fn synthesizes_from_unicode_subtables() {
        let mut cmap =
            CmapTable::from_subtables(vec![unicode_subtable(&[(65, "A"), (66, "B")])]);
        let summary =
            synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A", "B"]), &mut Recorder::new());

        assert_eq!(summary.synthesized, Some(2));
        assert_eq!(summary.legacy_removed, 0);
        assert_eq!(cmap.len(), 2);
        let built = windows_bmp(&cmap);
        assert_eq!(built.language, 0);
        assert_eq!(
            built.mapping().unwrap().get(&65).map(String::as_str),
            Some("A")
        );
    }

    #[test]
    fn existing_bmp_subtable_is_left_alone() {
        let existing = CmapSubtable {
            platform_id: WINDOWS_PLATFORM,
            encoding_id: WINDOWS_BMP_ENCODING,
            format: SEGMENT_MAPPING,
            language: 0,
            data: SubtableData::Decoded {
                mapping: [(65, "A".to_string())].into_iter().collect(),
                raw: vec![1, 2, 3],
            },
        };
        let mut cmap = CmapTable::from_subtables(vec![existing.clone()]);
        let mut recorder = Recorder::new();
        let summary = synthesize_windows_bmp(
            &mut cmap,
            &glyphs(&[".notdef", "A"]),
            &mut recorder,
        );

        assert_eq!(summary.synthesized, None);
        assert_eq!(cmap.len(), 1);
        assert_eq!(cmap.subtables()[0], existing);
        assert!(recorder.any(|event| matches!(event, Event::BmpSubtablePresent)));
    }

    #[test]
    fn codepoints_beyond_bmp_are_dropped() {
        let mut cmap =
            CmapTable::from_subtables(vec![unicode_subtable(&[(65, "A"), (0x10001, "B")])]);
        let mut recorder = Recorder::new();
        synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A", "B"]), &mut recorder);

        let mapping = windows_bmp(&cmap).mapping().unwrap();
        assert!(mapping.contains_key(&65));
        assert!(!mapping.contains_key(&0x10001));
        assert!(recorder.any(|event| matches!(
            event,
            Event::CodepointBeyondBmp { codepoint: 0x10001 }
        )));
    }

    #[test]
    fn unknown_glyph_names_are_dropped() {
        let mut cmap =
            CmapTable::from_subtables(vec![unicode_subtable(&[(65, "A"), (66, "ghost")])]);
        let mut recorder = Recorder::new();
        synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A"]), &mut recorder);

        let mapping = windows_bmp(&cmap).mapping().unwrap();
        assert_eq!(mapping.len(), 1);
        assert!(recorder.any(|event| matches!(
            event,
            Event::UnknownGlyphName { codepoint: 66, .. }
        )));
    }

    #[test]
    fn glyph_indices_beyond_u16_are_dropped() {
        let names: Vec<String> = (0..=0x10000).map(|i| format!("g{i}")).collect();
        let order = GlyphOrder::new(names);
        let mut cmap =
            CmapTable::from_subtables(vec![unicode_subtable(&[(65, "g1"), (66, "g65536")])]);
        let mut recorder = Recorder::new();
        synthesize_windows_bmp(&mut cmap, &order, &mut recorder);

        let mapping = windows_bmp(&cmap).mapping().unwrap();
        assert!(mapping.contains_key(&65));
        assert!(!mapping.contains_key(&66));
        assert!(recorder.any(|event| matches!(
            event,
            Event::GlyphIndexOutOfRange {
                codepoint: 66,
                index: 0x10000,
                ..
            }
        )));
    }

    #[test]
    fn later_subtable_wins_colliding_codepoints() {
        let mut cmap = CmapTable::from_subtables(vec![
            unicode_subtable(&[(65, "A"), (66, "B")]),
            unicode_subtable(&[(65, "B")]),
        ]);
        synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A", "B"]), &mut Recorder::new());

        let mapping = windows_bmp(&cmap).mapping().unwrap();
        assert_eq!(mapping.get(&65).map(String::as_str), Some("B"));
        assert_eq!(mapping.get(&66).map(String::as_str), Some("B"));
    }

    #[test]
    fn non_unicode_subtables_contribute_nothing() {
        let mac_subtable = CmapSubtable {
            platform_id: MACINTOSH_PLATFORM,
            encoding_id: 0,
            format: 0,
            language: 0,
            data: SubtableData::Decoded {
                mapping: [(67, "C".to_string())].into_iter().collect(),
                raw: Vec::new(),
            },
        };
        let mut cmap =
            CmapTable::from_subtables(vec![unicode_subtable(&[(65, "A")]), mac_subtable]);
        synthesize_windows_bmp(
            &mut cmap,
            &glyphs(&[".notdef", "A", "C"]),
            &mut Recorder::new(),
        );

        let mapping = windows_bmp(&cmap).mapping().unwrap();
        assert_eq!(mapping.len(), 1);
        assert!(!mapping.contains_key(&67));
    }

    #[test]
    fn undecodable_unicode_subtable_is_reported() {
        let opaque = CmapSubtable {
            platform_id: UNICODE_PLATFORM,
            encoding_id: 5,
            format: 14,
            language: 0,
            data: SubtableData::Raw(vec![0; 10]),
        };
        let mut cmap = CmapTable::from_subtables(vec![opaque]);
        let mut recorder = Recorder::new();
        let summary =
            synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef"]), &mut recorder);

        assert_eq!(summary.synthesized, Some(0));
        assert!(recorder.any(|event| matches!(
            event,
            Event::UndecodableSubtable { format: 14, .. }
        )));
    }

    #[test]
    fn legacy_subtable_is_removed() {
        let mut cmap = CmapTable::from_subtables(vec![
            legacy_subtable(),
            unicode_subtable(&[(65, "A")]),
        ]);
        let summary =
            synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A"]), &mut Recorder::new());

        assert_eq!(summary.legacy_removed, 1);
        assert!(cmap.find(MACINTOSH_PLATFORM, 1, HIGH_BYTE_MAPPING).is_none());
    }

    #[test]
    fn legacy_removal_without_legacy_subtable_is_a_no_op() {
        let before = CmapTable::from_subtables(vec![
            unicode_subtable(&[(65, "A")]),
            CmapSubtable {
                platform_id: WINDOWS_PLATFORM,
                encoding_id: WINDOWS_BMP_ENCODING,
                format: SEGMENT_MAPPING,
                language: 0,
                data: SubtableData::Raw(vec![9; 4]),
            },
        ]);
        let mut cmap = before.clone();
        let summary =
            synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef", "A"]), &mut Recorder::new());

        assert_eq!(summary.legacy_removed, 0);
        assert_eq!(cmap, before);
    }

    #[test]
    fn legacy_removal_runs_even_when_bmp_subtable_exists() {
        let mut cmap = CmapTable::from_subtables(vec![
            CmapSubtable {
                platform_id: WINDOWS_PLATFORM,
                encoding_id: WINDOWS_BMP_ENCODING,
                format: SEGMENT_MAPPING,
                language: 0,
                data: SubtableData::Raw(vec![9; 4]),
            },
            legacy_subtable(),
            legacy_subtable(),
        ]);
        let summary =
            synthesize_windows_bmp(&mut cmap, &glyphs(&[".notdef"]), &mut Recorder::new());

        assert_eq!(summary.synthesized, None);
        assert_eq!(summary.legacy_removed, 2);
        assert_eq!(cmap.len(), 1);
    }
}
