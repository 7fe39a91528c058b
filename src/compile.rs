//! One-shot compile: bundle an entry file and write it to an output directory.
//!
//! The bundle is produced fully in memory before the output directory is
//! touched, so a failing pipeline leaves previous output in place.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{BundleError, Result};
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::utils::path::{clean, normalize_path};

/// Output directory name substituted for the entry's parent directory.
pub const DIST_DIR: &str = "dist";

/// `<entry parent's parent>/dist`, e.g. `site/src/index.html` -> `site/dist`.
pub fn default_output_dir(entry: &Path) -> PathBuf {
    let entry = normalize_path(entry);
    let project = entry
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    project.join(DIST_DIR)
}

/// Load `entry`, report its dependencies, run every pipeline stage and
/// write the result.
///
/// Returns the path of the written file.
pub fn compile(entry: &Path, output_dir: Option<&Path>, options: PipelineOptions) -> Result<PathBuf> {
    let doc = Document::load(entry)?;
    for line in doc.summary().lines() {
        crate::log!("deps"; "{}", line);
    }
    compile_document(doc, output_dir, options)
}

fn compile_document(
    mut doc: Document,
    output_dir: Option<&Path>,
    options: PipelineOptions,
) -> Result<PathBuf> {
    let entry = doc.path().to_path_buf();
    let output_dir = match output_dir {
        Some(dir) => clean(&normalize_path(dir)),
        None => default_output_dir(&entry),
    };
    check_output_dir(&entry, &output_dir)?;

    Pipeline::new(options).run(&mut doc)?;

    let file_name = entry.file_name().unwrap_or(OsStr::new("index.html"));
    let output = output_dir.join(file_name);
    write_output(&output_dir, &output, doc.into_html())?;

    crate::debug!("compile"; "{} -> {}", entry.display(), output.display());
    Ok(output)
}

/// Reject output locations that cannot be wiped safely.
fn check_output_dir(entry: &Path, output_dir: &Path) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(BundleError::OutputNotDir(output_dir.to_path_buf()));
    }
    if entry.starts_with(output_dir) {
        return Err(BundleError::OutputContainsEntry {
            output: output_dir.to_path_buf(),
            entry: entry.to_path_buf(),
        });
    }
    Ok(())
}

fn write_output(output_dir: &Path, output: &Path, html: String) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| BundleError::Write(output_dir.to_path_buf(), e))?;
    }
    fs::create_dir_all(output_dir).map_err(|e| BundleError::Write(output_dir.to_path_buf(), e))?;
    fs::write(output, html).map_err(|e| BundleError::Write(output.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: PipelineOptions = PipelineOptions { minify: false };

    fn site(index: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("index.html"), index).unwrap();
        (dir, src.join("index.html"))
    }

    #[test]
    fn test_default_output_dir() {
        let (dir, entry) = site("<p>x</p>");
        let expected = dir.path().canonicalize().unwrap().join("dist");
        assert_eq!(default_output_dir(&entry), expected);
    }

    #[test]
    fn test_compile_writes_into_dist() {
        let (dir, entry) = site("<head></head><body><p>x</p></body>");
        let output = compile(&entry, None, RAW).unwrap();

        assert_eq!(output.file_name().unwrap(), "index.html");
        assert!(output.starts_with(dir.path().canonicalize().unwrap().join("dist")));
        assert_eq!(fs::read_to_string(output).unwrap(), "<head></head><body><p>x</p></body>");
    }

    #[test]
    fn test_compile_clears_previous_output() {
        let (dir, entry) = site("<p>x</p>");
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("stale.txt"), "old").unwrap();

        compile(&entry, Some(&out), RAW).unwrap();
        assert!(!out.join("stale.txt").exists());
        assert!(out.join("index.html").is_file());
    }

    #[test]
    fn test_failed_bundle_writes_nothing() {
        let (dir, entry) = site(r#"<body><img src="logo.png"></body>"#);
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("previous.html"), "keep").unwrap();

        let err = compile(&entry, Some(&out), RAW).unwrap_err();
        assert!(matches!(err, BundleError::MissingImage { .. }));
        assert!(!out.join("index.html").exists());
        assert!(out.join("previous.html").exists());
    }

    #[test]
    fn test_output_is_a_file() {
        let (dir, entry) = site("<p>x</p>");
        let out = dir.path().join("out");
        fs::write(&out, "file").unwrap();

        let err = compile(&entry, Some(&out), RAW).unwrap_err();
        assert!(matches!(err, BundleError::OutputNotDir(_)));
    }

    #[test]
    fn test_output_containing_entry_is_rejected() {
        let (dir, entry) = site("<p>x</p>");
        let err = compile(&entry, Some(dir.path()), RAW).unwrap_err();
        assert!(matches!(err, BundleError::OutputContainsEntry { .. }));
        assert!(entry.exists());
    }
}
