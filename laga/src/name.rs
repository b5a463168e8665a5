//! The name table model and the Macintosh → Windows locale mapper
//!
//! Many CJK fonts ship name records for the Macintosh platform only, which
//! leaves Windows consumers unable to display the localized family name.
//! [`derive_windows_names`] fills the gap: for every Macintosh record it
//! derives the equivalent (Windows, Unicode BMP) record, re-encoded as
//! UTF-16BE, under the matching Windows locale id.

use std::collections::HashSet;

use write_fonts::read::tables::name::{Encoding, MacRomanMapping};

use crate::report::{Event, Reporter};
use crate::{MACINTOSH_PLATFORM, WINDOWS_BMP_ENCODING, WINDOWS_PLATFORM};

/// The language id marking a record as language independent.
pub const LANGUAGE_INDEPENDENT: u16 = 0xFFFF;

/// Macintosh language id → Windows locale id.
///
/// Japanese appears twice: 0x11 is not a registered Macintosh language id
/// but occurs in the wild on Japanese records.
static MAC_TO_WINDOWS_LANGUAGE: &[(u16, u16)] = &[
    (0x00, 0x0409), // English -> English (United States)
    (0x07, 0x0804), // Simplified Chinese
    (0x09, 0x0404), // Traditional Chinese
    (0x0B, 0x0411), // Japanese
    (0x11, 0x0411), // Japanese
    (0x12, 0x0412), // Korean
];

/// The Windows locale a Macintosh record's language maps to.
///
/// Language-independent stays language-independent; a language with no
/// mapping keeps its id unchanged.
fn windows_language_for(mac_language: u16) -> u16 {
    if mac_language == LANGUAGE_INDEPENDENT {
        return LANGUAGE_INDEPENDENT;
    }
    MAC_TO_WINDOWS_LANGUAGE
        .iter()
        .find(|(mac, _)| *mac == mac_language)
        .map(|(_, windows)| *windows)
        .unwrap_or(mac_language)
}

/// The identity of a name slot: (name id, platform, encoding, language).
///
/// Two records with equal keys describe the same slot regardless of their
/// string values.
pub type NameKey = (u16, u16, u16, u16);

/// A single name record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub name_id: u16,
    pub platform_id: u16,
    pub encoding_id: u16,
    pub language_id: u16,
    /// Raw string bytes in the record's platform encoding.
    pub value: Vec<u8>,
}

impl NameRecord {
    pub fn new(
        name_id: u16,
        platform_id: u16,
        encoding_id: u16,
        language_id: u16,
        value: Vec<u8>,
    ) -> Self {
        Self {
            name_id,
            platform_id,
            encoding_id,
            language_id,
            value,
        }
    }

    pub fn key(&self) -> NameKey {
        (
            self.name_id,
            self.platform_id,
            self.encoding_id,
            self.language_id,
        )
    }

    /// Decode the record's value with its declared platform encoding.
    ///
    /// Strict: an unknown encoding, a trailing half code unit or an unpaired
    /// surrogate all return `None` rather than substituting replacement
    /// characters, so callers can skip records they cannot faithfully
    /// transcode.
    pub fn decode(&self) -> Option<String> {
        match Encoding::new(self.platform_id, self.encoding_id) {
            Encoding::Utf16Be => decode_utf16_be(&self.value),
            Encoding::MacRoman => Some(
                self.value
                    .iter()
                    .map(|&byte| MacRomanMapping.decode(byte))
                    .collect(),
            ),
            _ => None,
        }
    }
}

fn decode_utf16_be(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn encode_utf16_be(string: &str) -> Vec<u8> {
    string.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// An ordered collection of name records.
///
/// The table is append-only: normalization adds records but never removes or
/// rewrites existing ones, and insertion order is preserved for output
/// stability.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameTable {
    records: Vec<NameRecord>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<NameRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[NameRecord] {
        &self.records
    }

    pub fn push(&mut self, record: NameRecord) {
        self.records.push(record);
    }

    pub fn contains_key(&self, key: NameKey) -> bool {
        self.records.iter().any(|record| record.key() == key)
    }
}

/// Derive (Windows, Unicode BMP) records from the table's Macintosh records.
///
/// Works on a frozen view of the table: all additions are computed against
/// the records present on entry and merged in one step afterwards, so newly
/// derived records are never reprocessed as sources. A candidate is skipped
/// when its slot already exists, which also makes the pass idempotent. A
/// record that fails to decode is skipped and reported; it cannot abort the
/// pass.
///
/// Returns the number of records appended.
pub fn derive_windows_names<R: Reporter>(table: &mut NameTable, reporter: &mut R) -> usize {
    let mut seen: HashSet<NameKey> = table.records().iter().map(NameRecord::key).collect();
    let mut additions = Vec::new();
    for record in table.records() {
        if record.platform_id != MACINTOSH_PLATFORM {
            continue;
        }
        let Some(string) = record.decode() else {
            reporter.event(Event::UndecodableNameRecord {
                name_id: record.name_id,
                platform_id: record.platform_id,
                encoding_id: record.encoding_id,
                language_id: record.language_id,
            });
            continue;
        };
        let target_language = windows_language_for(record.language_id);
        let key = (
            record.name_id,
            WINDOWS_PLATFORM,
            WINDOWS_BMP_ENCODING,
            target_language,
        );
        if !seen.insert(key) {
            continue;
        }
        additions.push(NameRecord::new(
            record.name_id,
            WINDOWS_PLATFORM,
            WINDOWS_BMP_ENCODING,
            target_language,
            encode_utf16_be(&string),
        ));
    }

    let count = additions.len();
    for record in additions {
        table.push(record);
    }
    reporter.event(Event::WindowsNamesAdded { count });
    count
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::report::Recorder;

    fn mac_roman_record(name_id: u16, language_id: u16, value: &str) -> NameRecord {
        NameRecord::new(name_id, MACINTOSH_PLATFORM, 0, language_id, value.into())
    }

    #[test]
    fn derives_windows_english_record() {
        let mut table = NameTable::from_records(vec![mac_roman_record(1, 0, "MyFont")]);
        let added = derive_windows_names(&mut table, &mut Recorder::new());

        assert_eq!(added, 1);
        assert_eq!(table.len(), 2);
        let derived = &table.records()[1];
        assert_eq!(derived.key(), (1, WINDOWS_PLATFORM, WINDOWS_BMP_ENCODING, 0x0409));
        assert_eq!(derived.value, encode_utf16_be("MyFont"));
        assert_eq!(derived.decode().as_deref(), Some("MyFont"));
    }

    #[test]
    fn second_run_adds_nothing() {
        let mut table = NameTable::from_records(vec![mac_roman_record(1, 0, "MyFont")]);
        derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(table.len(), 2);

        let added = derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(added, 0);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn existing_windows_record_is_not_duplicated() {
        let mut table = NameTable::from_records(vec![
            mac_roman_record(4, 0, "MyFont Regular"),
            NameRecord::new(
                4,
                WINDOWS_PLATFORM,
                WINDOWS_BMP_ENCODING,
                0x0409,
                encode_utf16_be("MyFont Regular"),
            ),
        ]);
        let added = derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(added, 0);
        assert_eq!(table.len(), 2);
        assert!(table.contains_key((4, WINDOWS_PLATFORM, WINDOWS_BMP_ENCODING, 0x0409)));
    }

    #[test]
    fn language_independent_stays_language_independent() {
        let mut table =
            NameTable::from_records(vec![mac_roman_record(3, LANGUAGE_INDEPENDENT, "uid")]);
        derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(
            table.records()[1].key(),
            (3, WINDOWS_PLATFORM, WINDOWS_BMP_ENCODING, LANGUAGE_INDEPENDENT)
        );
    }

    #[test]
    fn unmapped_language_keeps_its_id() {
        // 0x03 (Italian) has no entry in the static mapping.
        let mut table = NameTable::from_records(vec![mac_roman_record(1, 0x03, "MioFont")]);
        derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(table.records()[1].language_id, 0x03);
    }

    #[test]
    fn both_japanese_ids_map_to_the_same_locale() {
        // Two Macintosh records whose languages both map to 0x0411 collide on
        // one Windows slot; only the first contributes, keeping the table
        // free of duplicate keys.
        let mut table = NameTable::from_records(vec![
            mac_roman_record(1, 0x0B, "first"),
            mac_roman_record(1, 0x11, "second"),
        ]);
        let added = derive_windows_names(&mut table, &mut Recorder::new());

        assert_eq!(added, 1);
        assert_eq!(table.len(), 3);
        let derived = &table.records()[2];
        assert_eq!(derived.language_id, 0x0411);
        assert_eq!(derived.decode().as_deref(), Some("first"));
    }

    #[test]
    fn undecodable_record_is_skipped_and_reported() {
        // Macintosh encoding 1 (Japanese) has no decoder; platform 0 with an
        // odd byte count is invalid UTF-16BE.
        let mut table = NameTable::from_records(vec![
            NameRecord::new(1, MACINTOSH_PLATFORM, 1, 0x0B, vec![0x83, 0x74]),
            NameRecord::new(2, MACINTOSH_PLATFORM, 0, 0, "ok".into()),
        ]);
        let mut recorder = Recorder::new();
        let added = derive_windows_names(&mut table, &mut recorder);

        assert_eq!(added, 1);
        assert_eq!(table.len(), 3);
        assert!(recorder.any(|event| matches!(
            event,
            Event::UndecodableNameRecord { name_id: 1, .. }
        )));
    }

    #[test]
    fn unpaired_surrogate_fails_decoding() {
        let record = NameRecord::new(1, crate::UNICODE_PLATFORM, 3, 0, vec![0xD8, 0x00]);
        assert_eq!(record.decode(), None);
    }

    #[test]
    fn non_macintosh_records_are_not_sources() {
        let mut table = NameTable::from_records(vec![NameRecord::new(
            1,
            WINDOWS_PLATFORM,
            WINDOWS_BMP_ENCODING,
            0x0409,
            encode_utf16_be("MyFont"),
        )]);
        let added = derive_windows_names(&mut table, &mut Recorder::new());
        assert_eq!(added, 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn mac_roman_high_bytes_decode() {
        let record = NameRecord::new(1, MACINTOSH_PLATFORM, 0, 0, vec![b'M', 0x8A, b'l']);
        assert_eq!(record.decode().as_deref(), Some("Mäl"));
    }
}
