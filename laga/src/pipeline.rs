//! The per-font repair pipeline
//!
//! One resource moves through a fixed sequence: open, fix the name table,
//! fix the character map (fatal if the font has none), persist under a
//! `_fixed` file name, and optionally delete the intermediate input it was
//! extracted from. Failures never cross resource boundaries; callers
//! batching many fonts simply collect one [`Result`] per font.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cmap::{synthesize_windows_bmp, CmapFixSummary};
use crate::error::FixError;
use crate::name::derive_windows_names;
use crate::report::{Event, Reporter};
use crate::resource::FontResource;

/// The suffix appended to a repaired font's file stem.
pub const FIXED_SUFFIX: &str = "_fixed";

/// How to run the pipeline for one font file.
#[derive(Debug, Clone)]
pub struct FixOptions {
    /// Directory the repaired font is written to.
    pub output_dir: PathBuf,
    /// Delete the input file once processing finishes. Used for members
    /// extracted from a collection; the deletion is best effort and can
    /// never fail the resource.
    pub remove_input: bool,
}

impl FixOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            remove_input: false,
        }
    }

    pub fn remove_input(mut self, remove: bool) -> Self {
        self.remove_input = remove;
        self
    }
}

/// What happened to one successfully repaired font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Windows name records appended.
    pub names_added: usize,
    /// Outcome of the character map fix.
    pub cmap: CmapFixSummary,
}

/// Run both fixes on an already-opened resource.
///
/// The name table is created empty when absent; a missing character map
/// fails the resource with [`FixError::CmapMissing`]. No I/O happens here.
pub fn fix_resource<R: Reporter>(
    resource: &mut FontResource,
    reporter: &mut R,
) -> Result<(usize, CmapFixSummary), FixError> {
    let names_added = derive_windows_names(resource.ensure_name(), reporter);
    let (cmap, glyphs) = resource.cmap_with_glyphs().ok_or(FixError::CmapMissing)?;
    let cmap_summary = synthesize_windows_bmp(cmap, glyphs, reporter);
    Ok((names_added, cmap_summary))
}

/// Open `path`, repair it, and persist the result into the output directory.
///
/// The output file name is the input's stem plus [`FIXED_SUFFIX`], keeping a
/// recognized `.otf`/`.ttf` extension (`Foo.otf` becomes `Foo_fixed.otf`;
/// any other extension is dropped). When `remove_input` is set the input
/// file is deleted after processing whether or not persisting succeeded;
/// a failed deletion is reported and otherwise ignored.
pub fn fix_font_file<R: Reporter>(
    path: &Path,
    options: &FixOptions,
    reporter: &mut R,
) -> Result<FixReport, FixError> {
    let result = open_fix_persist(path, options, reporter);
    if options.remove_input {
        if let Err(error) = fs::remove_file(path) {
            reporter.event(Event::CleanupFailed {
                path: path.to_path_buf(),
                error: error.to_string(),
            });
        }
    }
    result
}

fn open_fix_persist<R: Reporter>(
    path: &Path,
    options: &FixOptions,
    reporter: &mut R,
) -> Result<FixReport, FixError> {
    let mut resource = FontResource::load(path)?;
    let (names_added, cmap) = fix_resource(&mut resource, reporter)?;
    let output = output_path(path, &options.output_dir);
    resource.save(&output)?;
    Ok(FixReport {
        input: path.to_path_buf(),
        output,
        names_added,
        cmap,
    })
    // `resource` drops here on every path, releasing the font.
}

/// `<output_dir>/<stem>_fixed[.otf|.ttf]`, derived from the input name.
fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("font");
    let extension = input
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);
    let file_name = match extension.as_deref() {
        Some(extension @ ("otf" | "ttf")) => format!("{stem}{FIXED_SUFFIX}.{extension}"),
        _ => format!("{stem}{FIXED_SUFFIX}"),
    };
    output_dir.join(file_name)
}
