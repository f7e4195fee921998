//! Per-request scratch files.
//!
//! A [`ScratchJob`] names the two files one request may leave in the scratch
//! directory (`<id>.<ext>` and `<id>.pdf`) and removes both when dropped.
//! Tying removal to `Drop` covers every exit path: early `?` returns, a
//! client disconnect that cancels the handler future, and the success path,
//! where the job rides along with the response body and is dropped once the
//! last byte has been sent.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension used when the upload's own extension is missing or unusable.
pub const DEFAULT_SOURCE_EXT: &str = "docx";

/// Extension of the converter's output.
const OUTPUT_EXT: &str = "pdf";

/// The scratch paths of one request.
#[derive(Debug)]
pub struct ScratchJob {
    id: String,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl ScratchJob {
    /// Derive the input and output paths from `id`. No file is created.
    ///
    /// A `pdf` source extension is replaced by [`DEFAULT_SOURCE_EXT`] so the
    /// input can never be mistaken for the converter's output.
    pub fn new(dir: &Path, id: impl Into<String>, source_ext: &str) -> Self {
        let id = id.into();
        let source_ext = if source_ext.eq_ignore_ascii_case(OUTPUT_EXT) {
            DEFAULT_SOURCE_EXT
        } else {
            source_ext
        };
        Self {
            input_path: dir.join(format!("{id}.{source_ext}")),
            output_path: dir.join(format!("{id}.{OUTPUT_EXT}")),
            id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Where the converter is expected to write the PDF.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Drop for ScratchJob {
    fn drop(&mut self) {
        remove_quietly(&self.input_path);
        remove_quietly(&self.output_path);
        debug!("Scratch files for {} removed", self.id);
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
    }
}

/// Pick the scratch input extension for an uploaded filename.
///
/// The converter chooses its import filter from the extension, so the real
/// one is kept when it is a plain 1–10 character alphanumeric token.
/// Anything else falls back to [`DEFAULT_SOURCE_EXT`], and so does `pdf`,
/// which would collide with the output path.
pub fn source_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| (1..=10).contains(&e.len()))
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .filter(|e| !e.eq_ignore_ascii_case(OUTPUT_EXT))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_SOURCE_EXT.to_string())
}

/// Make sure the scratch directory exists and is a directory.
pub async fn prepare_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let meta = tokio::fs::metadata(dir).await?;
    if !meta.is_dir() {
        return Err(io::Error::other(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_share_id() {
        let job = ScratchJob::new(Path::new("/scratch"), "abc", "odt");
        assert_eq!(job.input_path(), Path::new("/scratch/abc.odt"));
        assert_eq!(job.output_path(), Path::new("/scratch/abc.pdf"));
        assert_eq!(job.id(), "abc");
    }

    #[test]
    fn drop_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let job = ScratchJob::new(dir.path(), "abc", "docx");
        std::fs::write(job.input_path(), b"in").unwrap();
        std::fs::write(job.output_path(), b"out").unwrap();

        drop(job);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let job = ScratchJob::new(dir.path(), "abc", "docx");
        std::fs::write(job.input_path(), b"in").unwrap();
        // output never produced
        drop(job);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn drop_leaves_other_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("abd.pdf"), b"keep").unwrap();
        drop(ScratchJob::new(dir.path(), "abc", "docx"));
        assert!(dir.path().join("abd.pdf").exists());
    }

    #[test]
    fn extension_kept_when_plain() {
        assert_eq!(source_extension("report.docx"), "docx");
        assert_eq!(source_extension("Slides.PPTX"), "pptx");
        assert_eq!(source_extension("notes.odt"), "odt");
        assert_eq!(source_extension("archive.tar.rtf"), "rtf");
    }

    #[test]
    fn extension_falls_back() {
        assert_eq!(source_extension("README"), "docx");
        assert_eq!(source_extension("weird.d-x"), "docx");
        assert_eq!(source_extension("long.abcdefghijk"), "docx");
        assert_eq!(source_extension(""), "docx");
        assert_eq!(source_extension(".hidden"), "docx");
    }

    #[test]
    fn pdf_upload_never_shares_output_path() {
        assert_eq!(source_extension("scan.pdf"), "docx");
        assert_eq!(source_extension("SCAN.PDF"), "docx");

        let job = ScratchJob::new(Path::new("/scratch"), "abc", "Pdf");
        assert_eq!(job.input_path(), Path::new("/scratch/abc.docx"));
        assert_ne!(job.input_path(), job.output_path());
    }

    #[tokio::test]
    async fn prepare_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        prepare_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn prepare_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"").unwrap();
        assert!(prepare_dir(&file).await.is_err());
    }
}
