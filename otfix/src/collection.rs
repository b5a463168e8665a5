//! Splitting a font collection into standalone member fonts
//!
//! Each member of a `.ttc` is written out as its own font file, named from
//! its full font name (name id 4) when one can be decoded. The written
//! files are intermediates: the batch repairs them and then deletes them.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use laga::resource::Flavor;
use laga::FixError;
use write_fonts::read::{FileRef, FontRef, TableProvider};
use write_fonts::FontBuilder;

/// Characters that cannot appear in a file name on common filesystems;
/// spaces are stripped too.
const HOSTILE: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', ' '];

/// Write every font in `path` into `output_dir` as a standalone file and
/// return the written paths.
pub fn split(path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, FixError> {
    let data = fs::read(path).map_err(|source| FixError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = FileRef::new(&data).map_err(|source| FixError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut members = Vec::new();
    let mut used_names = HashSet::new();
    for (index, font) in file.fonts().enumerate() {
        let font = match font {
            Ok(font) => font,
            Err(error) => {
                log::error!(
                    "font {index} in '{}' is malformed ({error}); skipping it",
                    path.display()
                );
                continue;
            }
        };
        let mut name = full_font_name(&font)
            .map(sanitize)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Font_{index}"));
        if !used_names.insert(name.clone()) {
            name = format!("Font_{index}");
            used_names.insert(name.clone());
        }
        let extension = Flavor::of(&font).extension();
        let member_path = output_dir.join(format!("{name}.{extension}"));

        let mut builder = FontBuilder::new();
        builder.copy_missing_tables(font);
        fs::write(&member_path, builder.build()).map_err(|source| FixError::Persist {
            path: member_path.clone(),
            source,
        })?;
        log::info!("extracted '{}'", member_path.display());
        members.push(member_path);
    }
    Ok(members)
}

/// The first decodable full-name record (name id 4), if any.
fn full_font_name(font: &FontRef) -> Option<String> {
    let name = font.name().ok()?;
    name.name_record()
        .iter()
        .filter(|record| record.name_id().to_u16() == 4)
        .filter_map(|record| record.string(name.string_data()).ok())
        .map(|value| value.to_string())
        .find(|value| !value.trim().is_empty())
}

fn sanitize(name: String) -> String {
    name.chars()
        .filter(|character| !HOSTILE.contains(character))
        .collect()
}
