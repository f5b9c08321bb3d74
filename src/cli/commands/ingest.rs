//! Ingest command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use walkdir::WalkDir;

use crate::cli::output::{IngestStats, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::build_pipeline;
use crate::utils::is_text_file;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// File or directory to ingest
    #[arg(required = true)]
    pub path: PathBuf,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// List what would be ingested without touching the index
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    if !args.path.exists() {
        anyhow::bail!("path does not exist: {}", args.path.display());
    }
    let path = args.path.canonicalize().context("invalid path")?;

    let files = collect_files(&path, &args.exclude, &config.indexing.exclude_patterns)?;
    if files.is_empty() {
        println!("{}", formatter.format_message("No files found to ingest."));
        return Ok(());
    }

    if args.dry_run {
        println!(
            "{}",
            formatter.format_message(&format!("Dry run: would ingest {} files", files.len()))
        );
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let pipeline = build_pipeline(&config)
        .await
        .context("failed to initialize pipeline")?;

    let pb = ProgressBar::new(files.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .context("invalid progress template")?
        .progress_chars("#>-");
    pb.set_style(style);
    if format == OutputFormat::Json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut stats = IngestStats {
        files_scanned: files.len() as u64,
        backend: pipeline.store().name().to_string(),
        ..Default::default()
    };

    for file_path in &files {
        pb.inc(1);

        if !is_text_file(file_path) {
            debug!(path = %file_path.display(), "skipping non-text file");
            stats.files_skipped += 1;
            continue;
        }

        let document = match pipeline.loader().load_path(file_path) {
            Ok(doc) => doc,
            Err(e) => {
                if verbose {
                    pb.println(format!("Skipping {}: {}", file_path.display(), e));
                }
                stats.files_skipped += 1;
                continue;
            }
        };

        if document.content.is_empty() {
            stats.files_skipped += 1;
            continue;
        }

        let report = pipeline
            .ingest_document(document)
            .await
            .with_context(|| format!("failed to ingest {}", file_path.display()))?;
        stats.files_ingested += 1;
        stats.chunks_added += report.chunks_added as u64;
    }

    pb.finish_and_clear();

    stats.entries = pipeline
        .store()
        .count()
        .await
        .context("failed to count index entries")?;
    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    println!("{}", formatter.format_ingest_stats(&stats));

    Ok(())
}

fn collect_files(path: &Path, exclude: &[String], default_exclude: &[String]) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let patterns: Vec<glob::Pattern> = exclude
        .iter()
        .chain(default_exclude.iter())
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.context("failed to read directory entry")?;
        let entry_path = entry.path();
        if !entry_path.is_file() {
            continue;
        }

        let path_str = entry_path.to_string_lossy();
        if !patterns.iter().any(|p| p.matches(&path_str)) {
            files.push(entry_path.to_path_buf());
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_applies_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("docs")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("docs/a.md"), "alpha").unwrap();
        std::fs::write(root.join("docs/b.txt"), "beta").unwrap();
        std::fs::write(root.join("node_modules/pkg/c.md"), "gamma").unwrap();

        let files = collect_files(
            root,
            &["**/*.txt".to_string()],
            &["**/node_modules/**".to_string()],
        )
        .unwrap();

        assert_eq!(files, vec![root.join("docs/a.md")]);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "text").unwrap();

        let files = collect_files(&file, &[], &["**/*.txt".to_string()]).unwrap();
        assert_eq!(files, vec![file]);
    }
}
