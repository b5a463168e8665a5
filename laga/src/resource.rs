//! One font's table set, loaded for repair
//!
//! This is the only module that touches the binary container. A
//! [`FontResource`] keeps the original font bytes, the two tables the engine
//! mutates as in-memory models, and the glyph order; saving recompiles
//! `name` and `cmap` and copies every other table through unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use write_fonts::read::tables::cmap::{Cmap, CmapSubtable as ReadCmapSubtable};
use write_fonts::read::tables::name::Name as ReadName;
use write_fonts::read::{FontRef, Offset, TableProvider, TopLevelTable};
use write_fonts::types::{GlyphId, GlyphId16, Tag};
use write_fonts::FontBuilder;

use crate::cmap::{CmapSubtable, CmapTable, Mapping, SubtableData};
use crate::error::FixError;
use crate::glyphs::GlyphOrder;
use crate::name::{NameRecord, NameTable};
use crate::serialize;

/// Container flavor, deciding the natural file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// CFF or CFF2 outlines.
    OpenType,
    /// TrueType outlines.
    TrueType,
}

impl Flavor {
    /// Sniff the flavor of a parsed font.
    pub fn of(font: &FontRef) -> Flavor {
        let has_cff = font.data_for_tag(Tag::new(b"CFF ")).is_some()
            || font.data_for_tag(Tag::new(b"CFF2")).is_some();
        if has_cff {
            Flavor::OpenType
        } else {
            Flavor::TrueType
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Flavor::OpenType => "otf",
            Flavor::TrueType => "ttf",
        }
    }
}

/// An opened font with its repairable tables modeled in memory.
///
/// The resource owns its tables exclusively; nothing is shared across
/// resources, so independent resources can be processed on independent
/// threads. Dropping the resource releases everything.
pub struct FontResource {
    path: PathBuf,
    data: Vec<u8>,
    flavor: Flavor,
    name: Option<NameTable>,
    cmap: Option<CmapTable>,
    glyph_order: GlyphOrder,
}

impl FontResource {
    /// Open a single font file.
    pub fn load(path: &Path) -> Result<Self, FixError> {
        let data = fs::read(path).map_err(|source| FixError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let (flavor, name, cmap, glyph_order) = {
            let font = FontRef::new(&data).map_err(|source| FixError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            let glyph_order = read_glyph_order(&font);
            let name = font.name().ok().map(|name| read_name_table(&name));
            let cmap = font.cmap().ok().map(|cmap| read_cmap_table(&cmap, &glyph_order));
            (Flavor::of(&font), name, cmap, glyph_order)
        };
        Ok(Self {
            path: path.to_path_buf(),
            data,
            flavor,
            name,
            cmap,
            glyph_order,
        })
    }

    /// The path this resource was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn glyph_order(&self) -> &GlyphOrder {
        &self.glyph_order
    }

    pub fn name(&self) -> Option<&NameTable> {
        self.name.as_ref()
    }

    /// The name table, created empty if the font had none.
    pub fn ensure_name(&mut self) -> &mut NameTable {
        self.name.get_or_insert_with(NameTable::new)
    }

    pub fn cmap(&self) -> Option<&CmapTable> {
        self.cmap.as_ref()
    }

    /// The cmap table together with the glyph order, for fixes that need
    /// both at once.
    pub fn cmap_with_glyphs(&mut self) -> Option<(&mut CmapTable, &GlyphOrder)> {
        self.cmap.as_mut().map(|cmap| (cmap, &self.glyph_order))
    }

    /// Write the repaired font to `path`.
    ///
    /// Recompiles `name` and `cmap` from their models; all other tables are
    /// the input's bytes, unchanged.
    pub fn save(&self, path: &Path) -> Result<(), FixError> {
        let persist = |source| FixError::Persist {
            path: path.to_path_buf(),
            source,
        };
        // The resource was parsed from these bytes at load time.
        let font = FontRef::new(&self.data).expect("already parsed once");
        let mut builder = FontBuilder::new();
        if let Some(name) = &self.name {
            builder.add_raw(ReadName::TAG, serialize::compile_name(name));
        }
        if let Some(cmap) = &self.cmap {
            builder.add_raw(Cmap::TAG, serialize::compile_cmap(cmap, &self.glyph_order));
        }
        builder.copy_missing_tables(font);
        fs::write(path, builder.build()).map_err(persist)
    }
}

/// Glyph names in glyph-id order, from `post` when it has names, with the
/// conventional `glyphNNNNN` fallback otherwise.
fn read_glyph_order(font: &FontRef) -> GlyphOrder {
    let num_glyphs = match font.maxp() {
        Ok(maxp) => maxp.num_glyphs() as usize,
        Err(_) => {
            log::warn!("font has no usable 'maxp' table; treating glyph order as empty");
            0
        }
    };
    let post = font.post().ok();
    let names = (0..num_glyphs)
        .map(|gid| {
            post.as_ref()
                .and_then(|post| post.glyph_name(GlyphId16::new(gid as u16)))
                .map(str::to_owned)
                .unwrap_or_else(|| format!("glyph{gid:05}"))
        })
        .collect();
    GlyphOrder::new(names)
}

fn read_name_table(name: &ReadName) -> NameTable {
    let storage = name.string_data();
    let bytes = storage.as_bytes();
    let mut table = NameTable::new();
    for record in name.name_record() {
        let start = record.string_offset().non_null().unwrap_or(0);
        let end = start + record.length() as usize;
        let Some(value) = bytes.get(start..end) else {
            log::warn!(
                "name record (name id {}) has string data out of bounds; dropping it",
                record.name_id().to_u16()
            );
            continue;
        };
        table.push(NameRecord::new(
            record.name_id().to_u16(),
            record.platform_id(),
            record.encoding_id(),
            record.language_id(),
            value.to_vec(),
        ));
    }
    table
}

fn read_cmap_table(cmap: &Cmap, glyphs: &GlyphOrder) -> CmapTable {
    let cmap_bytes = cmap.offset_data().as_bytes();
    let mut table = CmapTable::new();
    for (index, record) in cmap.encoding_records().iter().enumerate() {
        let platform_id = record.platform_id() as u16;
        let encoding_id = record.encoding_id();
        let subtable = match record.subtable(cmap.offset_data()) {
            Ok(subtable) => subtable,
            Err(error) => {
                log::warn!(
                    "cmap subtable ({platform_id}, {encoding_id}) is malformed ({error}); \
                     dropping it"
                );
                continue;
            }
        };
        // each 8-byte encoding record carries its subtable offset at byte 4
        let offset = match read_u32(cmap_bytes, 4 + index * 8 + 4) {
            Some(offset) => offset as usize,
            None => continue,
        };
        let Some((format, language, raw)) = subtable_bytes(cmap_bytes, offset) else {
            log::warn!(
                "cmap subtable ({platform_id}, {encoding_id}) has a malformed header; \
                 dropping it"
            );
            continue;
        };
        let data = match decode_mapping(&subtable, &raw, glyphs) {
            Some(mapping) => SubtableData::Decoded { mapping, raw },
            None => SubtableData::Raw(raw),
        };
        table.push(CmapSubtable {
            platform_id,
            encoding_id,
            format,
            language,
            data,
        });
    }
    table
}

/// Read a subtable's format, language and bytes straight from the binary.
///
/// Length and language live at format-dependent offsets; a declared length
/// running past the table is clamped.
fn subtable_bytes(cmap_bytes: &[u8], offset: usize) -> Option<(u16, u32, Vec<u8>)> {
    let format = read_u16(cmap_bytes, offset)?;
    let (length, language) = match format {
        0 | 2 | 4 | 6 => (
            read_u16(cmap_bytes, offset + 2)? as usize,
            read_u16(cmap_bytes, offset + 4)? as u32,
        ),
        8 | 10 | 12 | 13 => (
            read_u32(cmap_bytes, offset + 4)? as usize,
            read_u32(cmap_bytes, offset + 8)?,
        ),
        14 => (read_u32(cmap_bytes, offset + 2)? as usize, 0),
        _ => return None,
    };
    let end = offset.checked_add(length)?.min(cmap_bytes.len());
    let raw = cmap_bytes.get(offset..end)?.to_vec();
    Some((format, language, raw))
}

/// Decode the formats the engine understands into codepoint → glyph name.
///
/// Formats 4 and 12 go through the parser's iterators; the two trivial
/// legacy formats 0 and 6 are read from their bytes directly. Everything
/// else is opaque.
fn decode_mapping(
    subtable: &ReadCmapSubtable,
    raw: &[u8],
    glyphs: &GlyphOrder,
) -> Option<Mapping> {
    match subtable {
        ReadCmapSubtable::Format4(format4) => Some(collect_pairs(format4.iter(), glyphs)),
        ReadCmapSubtable::Format12(format12) => Some(collect_pairs(format12.iter(), glyphs)),
        _ => match read_u16(raw, 0)? {
            0 => decode_format_0(raw, glyphs),
            6 => decode_format_6(raw, glyphs),
            _ => None,
        },
    }
}

fn collect_pairs(
    pairs: impl Iterator<Item = (u32, GlyphId)>,
    glyphs: &GlyphOrder,
) -> Mapping {
    pairs
        .map(|(codepoint, gid)| (codepoint, glyph_name_for(gid.to_u32(), glyphs)))
        .collect()
}

/// The name for `gid`, synthesizing one for ids beyond the glyph order so
/// the synthesizer can flag the entry instead of this layer dropping it
/// silently.
fn glyph_name_for(gid: u32, glyphs: &GlyphOrder) -> String {
    glyphs
        .name(gid)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("glyph{gid:05}"))
}

fn decode_format_0(raw: &[u8], glyphs: &GlyphOrder) -> Option<Mapping> {
    let array = raw.get(6..262)?;
    Some(
        array
            .iter()
            .enumerate()
            .filter(|(_, &gid)| gid != 0)
            .map(|(codepoint, &gid)| (codepoint as u32, glyph_name_for(gid as u32, glyphs)))
            .collect(),
    )
}

fn decode_format_6(raw: &[u8], glyphs: &GlyphOrder) -> Option<Mapping> {
    let first_code = read_u16(raw, 6)? as u32;
    let entry_count = read_u16(raw, 8)? as usize;
    let mut mapping = Mapping::new();
    for entry in 0..entry_count {
        let gid = read_u16(raw, 10 + entry * 2)?;
        if gid != 0 {
            mapping.insert(
                first_code + entry as u32,
                glyph_name_for(gid as u32, glyphs),
            );
        }
    }
    Some(mapping)
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes(slice.try_into().unwrap()))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes(slice.try_into().unwrap()))
}
