//! Vision-capable generation via the multimodal llama.cpp CLI.
//!
//! Each call spawns an independent process with its own model load, so
//! vision requests run concurrently with each other and with the in-process
//! session. Arguments are always passed as a structured list — filenames and
//! prompt text never travel through a shell.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to spawn vision process `{cli}`: {source}")]
    Spawn {
        cli: String,
        #[source]
        source: std::io::Error,
    },

    #[error("vision process exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Per-task generation budget for the vision CLI.
#[derive(Debug, Clone, Copy)]
pub struct VisionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl VisionOptions {
    pub const CV_EXTRACTION: Self = Self {
        temperature: 0.3,
        max_tokens: 800,
    };
    pub const DRAFT_REPLY: Self = Self {
        temperature: 0.7,
        max_tokens: 1000,
    };
    pub const CLASSIFICATION: Self = Self {
        temperature: 0.3,
        max_tokens: 500,
    };
}

#[derive(Clone)]
pub struct VisionRunner {
    cli_path: PathBuf,
    model_path: PathBuf,
    mmproj_path: PathBuf,
}

impl VisionRunner {
    pub fn new(cli_path: PathBuf, model_path: PathBuf, mmproj_path: PathBuf) -> Self {
        Self {
            cli_path,
            model_path,
            mmproj_path,
        }
    }

    /// Runs one vision generation and returns the process stdout. A non-zero
    /// exit is an error; stderr is logged either way.
    pub async fn run(
        &self,
        prompt: &str,
        images: &[PathBuf],
        options: VisionOptions,
    ) -> Result<String, VisionError> {
        let args = self.build_args(prompt, images, options);
        info!(images = images.len(), temperature = options.temperature, max_tokens = options.max_tokens, "invoking vision model");

        let output: Output = Command::new(&self.cli_path)
            .args(&args)
            .output()
            .await
            .map_err(|source| VisionError::Spawn {
                cli: self.cli_path.display().to_string(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            debug!(stderr = %stderr, "vision process stderr");
        }
        if !output.status.success() {
            return Err(VisionError::Failed {
                status: output.status,
                stderr: stderr.into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn build_args(&self, prompt: &str, images: &[PathBuf], options: VisionOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            self.model_path.clone().into(),
            "--mmproj".into(),
            self.mmproj_path.clone().into(),
        ];
        for image in images {
            args.push("--image".into());
            args.push(image.clone().into());
        }
        args.push("-p".into());
        args.push(prompt.into());
        args.push("--n-gpu-layers".into());
        args.push("0".into());
        args.push("--temp".into());
        args.push(options.temperature.to_string().into());
        args.push("-n".into());
        args.push(options.max_tokens.to_string().into());
        args
    }

    /// The paths this runner depends on, for startup existence checks.
    pub fn required_files(&self) -> [&Path; 3] {
        [&self.cli_path, &self.model_path, &self.mmproj_path]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> VisionRunner {
        VisionRunner::new(
            PathBuf::from("/opt/llama-mtmd-cli"),
            PathBuf::from("/models/vision.gguf"),
            PathBuf::from("/models/mmproj.gguf"),
        )
    }

    #[test]
    fn builds_one_image_flag_per_rendered_page() {
        let images = vec![PathBuf::from("/tmp/a_page1.png"), PathBuf::from("/tmp/b_page1.png")];
        let args = runner().build_args("prompt", &images, VisionOptions::CV_EXTRACTION);
        let image_flags = args.iter().filter(|a| *a == "--image").count();
        assert_eq!(image_flags, 2);
    }

    #[test]
    fn fixed_flags_and_budgets_are_structured_arguments() {
        let args = runner().build_args("a prompt; with $(shell) chars", &[], VisionOptions::CLASSIFICATION);
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        // Prompt is a single argv entry, untouched.
        let p = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[p + 1], "a prompt; with $(shell) chars");

        let gpu = args.iter().position(|a| a == "--n-gpu-layers").unwrap();
        assert_eq!(args[gpu + 1], "0");
        let temp = args.iter().position(|a| a == "--temp").unwrap();
        assert_eq!(args[temp + 1], "0.3");
        let n = args.iter().position(|a| a == "-n").unwrap();
        assert_eq!(args[n + 1], "500");
    }

    #[test]
    fn task_budgets_match_contract() {
        assert_eq!(VisionOptions::CV_EXTRACTION.max_tokens, 800);
        assert_eq!(VisionOptions::DRAFT_REPLY.max_tokens, 1000);
        assert!((VisionOptions::DRAFT_REPLY.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(VisionOptions::CLASSIFICATION.max_tokens, 500);
    }
}
