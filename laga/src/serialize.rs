//! Binary compilation of the two repaired tables
//!
//! Only `name` and `cmap` are ever recompiled; every other table in a font
//! is copied through byte-for-byte by the resource layer. Subtables that
//! were decoded from an existing font keep their original bytes, so the only
//! structure built from scratch is the synthesized format 4 subtable.

use std::collections::HashMap;

use crate::cmap::{CmapTable, Mapping, SubtableData, SEGMENT_MAPPING};
use crate::glyphs::GlyphOrder;
use crate::name::NameTable;

/// Compile a name table.
///
/// Records are written sorted by (platform, encoding, language, name id) as
/// the format requires; identical string values share one storage slot.
pub fn compile_name(table: &NameTable) -> Vec<u8> {
    let mut order: Vec<_> = table.records().iter().collect();
    order.sort_by_key(|record| {
        (
            record.platform_id,
            record.encoding_id,
            record.language_id,
            record.name_id,
        )
    });

    let count = order.len();
    let storage_offset: u16 = (6 + count * 12).try_into().unwrap();
    let mut out = Vec::with_capacity(storage_offset as usize);
    out.extend(0u16.to_be_bytes()); // version
    out.extend((count as u16).to_be_bytes());
    out.extend(storage_offset.to_be_bytes());

    let mut storage: Vec<u8> = Vec::new();
    let mut shared: HashMap<&[u8], u16> = HashMap::new();
    for record in &order {
        let offset = *shared.entry(record.value.as_slice()).or_insert_with(|| {
            let offset = storage.len() as u16;
            storage.extend_from_slice(&record.value);
            offset
        });
        out.extend(record.platform_id.to_be_bytes());
        out.extend(record.encoding_id.to_be_bytes());
        out.extend(record.language_id.to_be_bytes());
        out.extend(record.name_id.to_be_bytes());
        out.extend((record.value.len() as u16).to_be_bytes());
        out.extend(offset.to_be_bytes());
    }
    out.extend_from_slice(&storage);
    out
}

/// Compile a cmap table.
///
/// Encoding records are written sorted by (platform, encoding), stably, so
/// the model's subtable order still decides ties. Subtables with identical
/// bytes share one offset.
pub fn compile_cmap(table: &CmapTable, glyphs: &GlyphOrder) -> Vec<u8> {
    let blobs: Vec<(u16, u16, Vec<u8>)> = table
        .subtables()
        .iter()
        .map(|subtable| {
            let bytes = match &subtable.data {
                SubtableData::Decoded { raw, .. } => raw.clone(),
                SubtableData::Raw(raw) => raw.clone(),
                SubtableData::Built { mapping } => {
                    debug_assert_eq!(subtable.format, SEGMENT_MAPPING);
                    compile_format_4(mapping, glyphs, subtable.language as u16)
                }
            };
            (subtable.platform_id, subtable.encoding_id, bytes)
        })
        .collect();

    let mut order: Vec<usize> = (0..blobs.len()).collect();
    order.sort_by_key(|&index| (blobs[index].0, blobs[index].1));

    let header_len = 4 + blobs.len() * 8;
    let mut out = Vec::with_capacity(header_len);
    out.extend(0u16.to_be_bytes()); // version
    out.extend((blobs.len() as u16).to_be_bytes());

    let mut data: Vec<u8> = Vec::new();
    let mut shared: HashMap<&[u8], u32> = HashMap::new();
    for &index in &order {
        let (platform_id, encoding_id, bytes) = &blobs[index];
        let offset = *shared.entry(bytes.as_slice()).or_insert_with(|| {
            let offset = (header_len + data.len()) as u32;
            data.extend_from_slice(bytes);
            offset
        });
        out.extend(platform_id.to_be_bytes());
        out.extend(encoding_id.to_be_bytes());
        out.extend(offset.to_be_bytes());
    }
    out.extend_from_slice(&data);
    out
}

/// Compile a mapping to a format 4 subtable.
///
/// Uses the plain layout with all idRangeOffsets zero and no glyphIdArray:
/// a new segment starts whenever codepoint or glyph index breaks its run,
/// and each segment encodes its glyphs through idDelta alone. idDelta
/// arithmetic is modulo 0x10000.
fn compile_format_4(mapping: &Mapping, glyphs: &GlyphOrder, language: u16) -> Vec<u8> {
    // BTreeMap iteration yields codepoints already sorted.
    let mut pairs: Vec<(u16, u16)> = Vec::with_capacity(mapping.len());
    for (&codepoint, glyph) in mapping {
        if codepoint > 0xFFFF {
            log::warn!("codepoint {codepoint:#x} cannot be encoded in format 4; dropped");
            continue;
        }
        let Some(index) = glyphs.index_of(glyph) else {
            log::warn!("glyph '{glyph}' not in glyph order; mapping dropped");
            continue;
        };
        let Ok(index) = u16::try_from(index) else {
            log::warn!("glyph '{glyph}' index {index} exceeds 16 bits; mapping dropped");
            continue;
        };
        pairs.push((codepoint as u16, index));
    }

    let mut start_code: Vec<u16> = Vec::new();
    let mut end_code: Vec<u16> = Vec::new();
    let mut id_delta: Vec<i16> = Vec::new();
    let mut prev = (u16::MAX - 1, u16::MAX - 1);
    for (codepoint, gid) in pairs {
        let next_in_run = (prev.0.wrapping_add(1), prev.1.wrapping_add(1));
        if (codepoint, gid) == next_in_run && !end_code.is_empty() {
            *end_code.last_mut().unwrap() = codepoint;
        } else {
            start_code.push(codepoint);
            end_code.push(codepoint);
            id_delta.push(gid.wrapping_sub(codepoint) as i16);
        }
        prev = (codepoint, gid);
    }

    // The format requires a final segment mapping 0xFFFF.
    start_code.push(0xFFFF);
    end_code.push(0xFFFF);
    id_delta.push(1);

    let seg_count: u16 = start_code.len().try_into().unwrap();
    let floor_log2 = 15 - seg_count.leading_zeros() as u16;
    let search_range = 2u16 << floor_log2;
    let entry_selector = floor_log2;
    let range_shift = seg_count * 2 - search_range;
    // 7 header fields, 4 parallel arrays plus the reserved pad, all 16-bit.
    let length: u16 = (16 + seg_count as usize * 8).try_into().unwrap();

    let mut out = Vec::with_capacity(length as usize);
    out.extend(SEGMENT_MAPPING.to_be_bytes());
    out.extend(length.to_be_bytes());
    out.extend(language.to_be_bytes());
    out.extend((seg_count * 2).to_be_bytes());
    out.extend(search_range.to_be_bytes());
    out.extend(entry_selector.to_be_bytes());
    out.extend(range_shift.to_be_bytes());
    for code in &end_code {
        out.extend(code.to_be_bytes());
    }
    out.extend(0u16.to_be_bytes()); // reservedPad
    for code in &start_code {
        out.extend(code.to_be_bytes());
    }
    for delta in &id_delta {
        out.extend(delta.to_be_bytes());
    }
    for _ in 0..seg_count {
        out.extend(0u16.to_be_bytes()); // idRangeOffset
    }
    out
}
