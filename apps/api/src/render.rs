//! PDF-to-image rendering for vision context.
//!
//! The first page of each PDF attachment is rasterized to a 150 dpi PNG in a
//! temp subdirectory of the upload dir, handed to the vision process, then
//! deleted. Rendering goes through poppler's `pdftoppm` with a structured
//! argument list.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to create temp directory {path}: {source}")]
    TempDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run pdftoppm: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pdftoppm exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Case-insensitive `.pdf` extension check. Non-PDF attachments produce no
/// vision context.
pub fn is_pdf(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Strips any directory components from a client-supplied attachment name so
/// it can only resolve inside the upload dir.
pub fn sanitize_filename(filename: &str) -> Option<&str> {
    Path::new(filename).file_name().and_then(|name| name.to_str())
}

/// Renders the first page of `pdf_path` to `<out_dir>/<stem>_page1.png`.
pub async fn render_first_page(pdf_path: &Path, out_dir: &Path) -> Result<PathBuf, RenderError> {
    if !pdf_path.is_file() {
        return Err(RenderError::NotFound(pdf_path.to_path_buf()));
    }
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| RenderError::TempDir {
            path: out_dir.to_path_buf(),
            source,
        })?;

    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let prefix = out_dir.join(format!("{stem}_page1"));

    let output = Command::new("pdftoppm")
        .args(["-png", "-r", "150", "-f", "1", "-l", "1", "-singlefile"])
        .arg(pdf_path)
        .arg(&prefix)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RenderError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let image_path = prefix.with_extension("png");
    debug!(image = %image_path.display(), "rendered PDF first page");
    Ok(image_path)
}

/// Rendered images owned by one request. Dropping the guard removes the
/// files best-effort, so every exit path — including errors during
/// generation or extraction — releases them.
#[derive(Default)]
pub struct TempImages {
    paths: Vec<PathBuf>,
}

impl TempImages {
    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for TempImages {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove temp image");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check_is_case_insensitive() {
        assert!(is_pdf("cv.pdf"));
        assert!(is_pdf("CV.PDF"));
        assert!(!is_pdf("cv.docx"));
        assert!(!is_pdf("pdf"));
        assert!(!is_pdf(""));
    }

    #[test]
    fn sanitize_strips_directory_components() {
        assert_eq!(sanitize_filename("cv.pdf"), Some("cv.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd.pdf"), Some("passwd.pdf"));
        assert_eq!(sanitize_filename("dir/cv.pdf"), Some("cv.pdf"));
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn temp_images_removes_files_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cv_page1.png");
        std::fs::write(&file, b"png").unwrap();

        let mut images = TempImages::default();
        images.push(file.clone());
        assert!(!images.is_empty());
        drop(images);

        assert!(!file.exists());
    }

    #[tokio::test]
    async fn missing_pdf_is_reported_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_first_page(&dir.path().join("nope.pdf"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::NotFound(_)));
    }
}
