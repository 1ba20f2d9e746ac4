//! OCR collaborator: text extraction from chart/figure images.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use resai_common::ResaiError;
use tokio::process::Command;
use tracing::{debug, instrument};

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Opaque text read from `image`.
    async fn extract_text(&self, image: &Path) -> Result<String, ResaiError>;
}

/// Runs the `tesseract` CLI, which handles greyscale/threshold preprocessing itself.
pub struct TesseractCli {
    executable_path: PathBuf,
    language: Option<String>,
}

impl TesseractCli {
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl TextExtractor for TesseractCli {
    #[instrument(skip(self), fields(bin = %self.executable_path.display()))]
    async fn extract_text(&self, image: &Path) -> Result<String, ResaiError> {
        if !image.is_file() {
            return Err(ResaiError::Tool(format!("image not found: {}", image.display())));
        }

        let mut cmd = Command::new(&self.executable_path);
        cmd.arg(image).arg("stdout");
        if let Some(lang) = &self.language {
            cmd.arg("-l").arg(lang);
        }
        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResaiError::Tool(format!("tesseract failed: {}", stderr.trim())));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(chars = text.len(), "OCR completed");
        Ok(text)
    }
}
