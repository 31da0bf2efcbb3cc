use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables, with defaults
/// matching the development layout (models under `models/`, uploads under
/// `uploads/`).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,

    /// GGUF model for the in-process persona session (`llama-engine` builds).
    pub model_path: PathBuf,
    /// Context window for the persona session.
    pub n_ctx: u32,
    pub n_threads: i32,

    /// Multimodal llama.cpp CLI used for vision tasks.
    pub vision_cli_path: PathBuf,
    pub vision_model_path: PathBuf,
    pub mmproj_path: PathBuf,

    /// Directory attachments are resolved from by filename. Rendered pages
    /// land in `<uploads_dir>/temp`.
    pub uploads_dir: PathBuf,

    /// Base URL the persona result is forwarded to, best-effort. Forwarding
    /// is disabled when unset.
    pub persona_forward_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            model_path: env_or("MODEL_PATH", "models/gemma-3-1b-it-q4_0.gguf").into(),
            n_ctx: env_or("N_CTX", "2048")
                .parse::<u32>()
                .context("N_CTX must be a positive integer")?,
            n_threads: env_or("N_THREADS", "4")
                .parse::<i32>()
                .context("N_THREADS must be a positive integer")?,
            vision_cli_path: env_or("VISION_CLI_PATH", "bin/llama-mtmd-cli").into(),
            vision_model_path: env_or("VISION_MODEL_PATH", "models/gemma-3-4b-it-q4_0.gguf").into(),
            mmproj_path: env_or("MMPROJ_PATH", "models/mmproj-model-f16-4B.gguf").into(),
            uploads_dir: env_or("UPLOADS_DIR", "uploads").into(),
            persona_forward_url: std::env::var("PERSONA_FORWARD_URL").ok(),
        })
    }

    /// Temp directory rendered attachment pages are written to.
    pub fn temp_dir(&self) -> PathBuf {
        self.uploads_dir.join("temp")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
