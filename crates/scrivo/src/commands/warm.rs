//! `scrivo warm` command implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use glob::Pattern;
use scrivo_renderer::RenderStatus;

use super::{ConfigArgs, content_cache};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the warm command.
#[derive(Args)]
pub(crate) struct WarmArgs {
    /// Documentation source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Only load files whose path relative to the source directory matches.
    #[arg(long, default_value = "**/*.md")]
    include: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl WarmArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(self.source_dir.clone())?;
        let source_dir = std::path::absolute(&config.docs_resolved.source_dir)?;
        if !source_dir.is_dir() {
            return Err(CliError::Validation(format!(
                "Source directory not found: {}",
                source_dir.display()
            )));
        }

        let pattern = Pattern::new(&self.include)?;
        let files = collect_files(&source_dir, &pattern);
        output.info(&format!(
            "Loading {} documents from {}",
            files.len(),
            source_dir.display()
        ));

        let start = Instant::now();
        let cache = content_cache(&config);
        let report = cache.prewarm(&files);

        for path in &files {
            if let Some(rendered) = cache.get_cached(path)
                && rendered.status != RenderStatus::Complete
            {
                super::report(&output, path, &rendered);
            }
        }

        let stats = cache.stats();
        let summary = format!(
            "Loaded {} documents in {:.0}ms ({} entries, ~{} KiB)",
            report.loaded,
            start.elapsed().as_secs_f64() * 1000.0,
            stats.entries,
            stats.approx_bytes / 1024
        );
        if report.failed == 0 {
            output.success(&summary);
        } else {
            output.warning(&summary);
            output.warning(&format!("{} documents could not be read", report.failed));
        }
        Ok(())
    }
}

/// Walk `root` and return files whose relative path matches `pattern`.
///
/// Hidden files and directories are skipped. Output is sorted.
fn collect_files(root: &Path, pattern: &Pattern) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk(root, root, pattern, &mut files);
    files.sort();
    files
}

fn walk(root: &Path, dir: &Path, pattern: &Pattern, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "Failed to read directory");
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            walk(root, &path, pattern, files);
        } else if path
            .strip_prefix(root)
            .is_ok_and(|relative| pattern.matches_path(relative))
        {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collect_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide/deep")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("index.md"), "").unwrap();
        fs::write(root.join("guide/01-setup.md"), "").unwrap();
        fs::write(root.join("guide/deep/faq.md"), "").unwrap();
        fs::write(root.join("guide/notes.txt"), "").unwrap();
        fs::write(root.join(".hidden/secret.md"), "").unwrap();

        let files = collect_files(root, &Pattern::new("**/*.md").unwrap());
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("guide/01-setup.md"),
                PathBuf::from("guide/deep/faq.md"),
                PathBuf::from("index.md"),
            ]
        );
    }

    #[test]
    fn test_collect_files_with_narrow_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("guide")).unwrap();
        fs::write(root.join("index.md"), "").unwrap();
        fs::write(root.join("guide/a.md"), "").unwrap();

        let files = collect_files(root, &Pattern::new("guide/*.md").unwrap());
        assert_eq!(files, vec![root.join("guide/a.md")]);
    }
}
