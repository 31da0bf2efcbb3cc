//! llama.cpp-backed [`InferenceEngine`], compiled with the `llama-engine`
//! feature.
//!
//! The backend and model are created once at startup and live for the
//! process lifetime (they are leaked rather than freed, which is equivalent
//! for a process-scoped singleton and sidesteps the context's borrow of the
//! model). The context and sampler chain belong to the session and are
//! cleared at the start of every generation.

use std::num::NonZeroU32;
use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use llama_cpp_2::context::params::LlamaContextParams;
use llama_cpp_2::context::LlamaContext;
use llama_cpp_2::llama_backend::LlamaBackend;
use llama_cpp_2::llama_batch::LlamaBatch;
use llama_cpp_2::model::params::LlamaModelParams;
use llama_cpp_2::model::{AddBos, LlamaModel, Special};
use llama_cpp_2::sampling::LlamaSampler;
use llama_cpp_2::token::LlamaToken;
use tracing::info;

use super::engine::{EngineError, InferenceEngine, Token};

// Sampler configuration matching the persona model's tuning.
const TOP_K: i32 = 40;
const TOP_P: f32 = 0.9;
const TEMPERATURE: f32 = 0.7;
const DEFAULT_SEED: u32 = 0xFFFF_FFFF;

pub struct LlamaEngine {
    model: &'static LlamaModel,
    ctx: LlamaContext<'static>,
    sampler: LlamaSampler,
    n_ctx: usize,
    /// Bytes of an incomplete UTF-8 sequence carried across steps.
    pending: Vec<u8>,
}

impl LlamaEngine {
    pub fn load(model_path: &Path, n_ctx: u32, n_threads: i32) -> Result<Self> {
        let backend: &'static LlamaBackend =
            Box::leak(Box::new(LlamaBackend::init().context("llama backend init failed")?));

        info!(path = %model_path.display(), "loading model");
        let model: &'static LlamaModel = Box::leak(Box::new(
            LlamaModel::load_from_file(backend, model_path, &LlamaModelParams::default())
                .with_context(|| format!("failed to load model from {}", model_path.display()))?,
        ));

        let ctx_params = LlamaContextParams::default()
            .with_n_ctx(Some(
                NonZeroU32::new(n_ctx).ok_or_else(|| anyhow!("N_CTX must be non-zero"))?,
            ))
            .with_n_threads(n_threads)
            .with_n_batch(512);
        let ctx = model
            .new_context(backend, ctx_params)
            .context("failed to create context")?;

        info!(n_ctx, n_threads, "model and context initialized");
        Ok(Self {
            model,
            ctx,
            sampler: build_sampler(),
            n_ctx: n_ctx as usize,
            pending: Vec::new(),
        })
    }
}

fn build_sampler() -> LlamaSampler {
    LlamaSampler::chain_simple([
        LlamaSampler::top_k(TOP_K),
        LlamaSampler::top_p(TOP_P, 1),
        LlamaSampler::temp(TEMPERATURE),
        LlamaSampler::dist(DEFAULT_SEED),
    ])
}

impl InferenceEngine for LlamaEngine {
    fn context_window(&self) -> usize {
        self.n_ctx
    }

    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError> {
        self.model
            .str_to_token(text, AddBos::Always)
            .map(|tokens| tokens.into_iter().map(|t| Token(t.0)).collect())
            .map_err(|e| EngineError::Tokenization(e.to_string()))
    }

    fn decode_prompt(&mut self, tokens: &[Token]) -> Result<(), EngineError> {
        let mut batch = LlamaBatch::new(tokens.len(), 1);
        let last = tokens.len().saturating_sub(1);
        for (i, token) in tokens.iter().enumerate() {
            batch
                .add(LlamaToken(token.0), i as i32, &[0], i == last)
                .map_err(|e| EngineError::Decode(e.to_string()))?;
        }
        self.ctx
            .decode(&mut batch)
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    fn decode_one(&mut self, token: Token, pos: usize) -> Result<(), EngineError> {
        let mut batch = LlamaBatch::new(1, 1);
        batch
            .add(LlamaToken(token.0), pos as i32, &[0], true)
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        self.ctx
            .decode(&mut batch)
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    fn sample(&mut self) -> Token {
        Token(self.sampler.sample(&self.ctx, -1).0)
    }

    fn accept(&mut self, token: Token) {
        self.sampler.accept(LlamaToken(token.0));
    }

    fn token_to_piece(&mut self, token: Token) -> String {
        let Ok(bytes) = self.model.token_to_bytes(LlamaToken(token.0), Special::Tokenize) else {
            return String::new();
        };
        self.pending.extend_from_slice(&bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(piece) => {
                let piece = piece.to_string();
                self.pending.clear();
                piece
            }
            Err(e) => {
                // Emit the valid prefix, keep the incomplete tail for the
                // next step.
                let valid = e.valid_up_to();
                let piece = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                piece
            }
        }
    }

    fn eos_token(&self) -> Token {
        Token(self.model.token_eos().0)
    }

    fn is_valid_token(&self, token: Token) -> bool {
        token.0 >= 0 && token.0 < self.model.n_vocab()
    }

    fn reset(&mut self) {
        self.ctx.clear_kv_cache();
        self.sampler = build_sampler();
        self.pending.clear();
    }
}
