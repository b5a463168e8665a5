//! The glyph order of a font: glyph names in glyph-index order

use std::collections::HashMap;

/// The set of valid glyph names for one font resource.
///
/// Indices are positions in the name list, so the index domain is
/// `0..len()`. If the same name appears more than once the first occurrence
/// wins name → index resolution.
#[derive(Debug, Default, Clone)]
pub struct GlyphOrder {
    names: Vec<String>,
    by_name: HashMap<String, u32>,
}

impl GlyphOrder {
    pub fn new(names: Vec<String>) -> Self {
        let mut by_name = HashMap::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            by_name.entry(name.clone()).or_insert(index as u32);
        }
        Self { names, by_name }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Resolve a glyph name to its index.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// The name at `index`, if the index is in range.
    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(names: &[&str]) -> GlyphOrder {
        GlyphOrder::new(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn name_index_round_trip() {
        let glyphs = order(&[".notdef", "A", "B"]);
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs.index_of("A"), Some(1));
        assert_eq!(glyphs.name(2), Some("B"));
        assert!(!glyphs.contains("C"));
        assert_eq!(glyphs.index_of("C"), None);
        assert_eq!(glyphs.iter().collect::<Vec<_>>(), vec![".notdef", "A", "B"]);
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let glyphs = order(&[".notdef", "dup", "dup"]);
        assert_eq!(glyphs.index_of("dup"), Some(1));
        assert_eq!(glyphs.name(2), Some("dup"));
    }
}
