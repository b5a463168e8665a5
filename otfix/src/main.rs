//! Batch font repair tool
//!
//! Scans a directory for `.ttf`, `.otf` and `.ttc` files, repairs each
//! font's `name` and `cmap` tables, and writes the results as `_fixed`
//! files into an output directory. Collections are split into their member
//! fonts first; each member is repaired like any other font and the
//! intermediate file is cleaned up afterwards.
//!
//! Fonts are independent of each other, so they are repaired in parallel;
//! one font failing never stops the batch.

use std::path::PathBuf;

use clap::Parser;

mod batch;
mod collection;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory scanned for .ttf, .otf and .ttc files.
    #[arg(default_value = "input")]
    input_dir: PathBuf,

    /// Directory repaired fonts are written to.
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Number of fonts repaired in parallel. Defaults to the number of
    /// available cores.
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .expect("worker pool configured twice");
    }

    if !args.input_dir.is_dir() {
        eprintln!(
            "input directory '{}' does not exist",
            args.input_dir.display()
        );
        std::process::exit(1);
    }
    if let Err(error) = std::fs::create_dir_all(&args.output_dir) {
        eprintln!(
            "cannot create output directory '{}': {error}",
            args.output_dir.display()
        );
        std::process::exit(1);
    }

    let summary = batch::run(&args.input_dir, &args.output_dir);
    log::info!(
        "{} font(s) repaired, {} failed",
        summary.fixed,
        summary.failed
    );
    if summary.failed > 0 {
        std::process::exit(1);
    }
}
