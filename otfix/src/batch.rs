//! Walking a directory of fonts and repairing each one

use std::path::{Path, PathBuf};

use laga::{fix_font_file, FixOptions, LogReporter};
use rayon::prelude::*;

use crate::collection;

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Aggregate outcome of one batch: (repaired, failed) counts over all
/// resources, collection members included.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub fixed: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn merge(self, other: BatchSummary) -> BatchSummary {
        BatchSummary {
            fixed: self.fixed + other.fixed,
            failed: self.failed + other.failed,
        }
    }

    fn one(result: bool) -> BatchSummary {
        if result {
            BatchSummary { fixed: 1, failed: 0 }
        } else {
            BatchSummary { fixed: 0, failed: 1 }
        }
    }
}

/// Repair every font file in `input_dir`, in parallel.
pub fn run(input_dir: &Path, output_dir: &Path) -> BatchSummary {
    let files = discover(input_dir);
    if files.is_empty() {
        log::warn!("no font files found in '{}'", input_dir.display());
        return BatchSummary::default();
    }
    files
        .par_iter()
        .map(|path| process_file(path, output_dir))
        .reduce(BatchSummary::default, BatchSummary::merge)
}

fn process_file(path: &Path, output_dir: &Path) -> BatchSummary {
    log::info!("processing '{}'", path.display());
    if has_extension(path, "ttc") {
        process_collection(path, output_dir)
    } else {
        BatchSummary::one(fix_one(path, &FixOptions::new(output_dir)))
    }
}

fn process_collection(path: &Path, output_dir: &Path) -> BatchSummary {
    let members = match collection::split(path, output_dir) {
        Ok(members) => members,
        Err(error) => {
            log::error!("cannot split '{}': {error}", path.display());
            return BatchSummary { fixed: 0, failed: 1 };
        }
    };
    // members are intermediates: repaired, then deleted
    let options = FixOptions::new(output_dir).remove_input(true);
    members
        .iter()
        .map(|member| BatchSummary::one(fix_one(member, &options)))
        .fold(BatchSummary::default(), BatchSummary::merge)
}

fn fix_one(path: &Path, options: &FixOptions) -> bool {
    match fix_font_file(path, options, &mut LogReporter) {
        Ok(report) => {
            log::info!(
                "repaired '{}' -> '{}'",
                path.display(),
                report.output.display()
            );
            true
        }
        Err(error) => {
            log::error!("failed to repair '{}': {error}", path.display());
            false
        }
    }
}

/// Font files directly inside `dir`, sorted for a deterministic batch order.
fn discover(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && FONT_EXTENSIONS
                    .iter()
                    .any(|extension| has_extension(path, extension))
        })
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(wanted))
}
