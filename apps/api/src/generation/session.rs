//! Generation session — exclusive owner of one model/context pair.
//!
//! All in-process generation is serialized through the session's mutex:
//! concurrent requests queue and execute strictly one at a time, because the
//! context and sampler chain are not safely shareable across simultaneous
//! generations. `generate` blocks for the full duration; handlers call it
//! from `spawn_blocking`.

use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info};

use super::decode_loop;
use super::decode_loop::GenerationResult;
use super::engine::{EngineError, InferenceEngine};

#[derive(Debug, Error)]
pub enum GenerateError {
    /// The server was started without an inference engine.
    #[error("inference engine not initialized")]
    NotInitialized,

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("prompt is {prompt_tokens} tokens, context window is {context_window}")]
    PromptTooLong {
        prompt_tokens: usize,
        context_window: usize,
    },

    #[error("prompt decode failed: {0}")]
    Decode(String),
}

pub struct GenerationSession {
    engine: Mutex<Box<dyn InferenceEngine>>,
}

impl GenerationSession {
    pub fn new(engine: Box<dyn InferenceEngine>) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    /// Runs one full generation: reset state, tokenize, decode the prompt,
    /// then the autoregressive loop. Holds the session lock throughout.
    pub fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
    ) -> Result<GenerationResult, GenerateError> {
        // A panic mid-generation poisons the mutex, but the reset below wipes
        // whatever state that generation left behind, so the guard is safe to
        // recover rather than turning every later request into a panic.
        let mut engine = self
            .engine
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        // No cross-request memory: clear the context and sampler chain before
        // any of this request's tokens enter the state.
        engine.reset();

        let tokens = engine.tokenize(prompt).map_err(|e| match e {
            EngineError::Tokenization(msg) => GenerateError::Tokenization(msg),
            EngineError::Decode(msg) => GenerateError::Decode(msg),
        })?;
        debug!(
            prompt_chars = prompt.len(),
            prompt_tokens = tokens.len(),
            "prompt tokenized"
        );

        let context_window = engine.context_window();
        if tokens.len() >= context_window {
            return Err(GenerateError::PromptTooLong {
                prompt_tokens: tokens.len(),
                context_window,
            });
        }

        engine
            .decode_prompt(&tokens)
            .map_err(|e| GenerateError::Decode(e.to_string()))?;

        // Keep frequency/repeat-aware samplers aware of the prompt.
        for &token in &tokens {
            engine.accept(token);
        }

        let result = decode_loop::run(engine.as_mut(), tokens.len(), max_tokens);
        info!(
            generated_chars = result.text.len(),
            stop = %result.stop,
            "generation complete"
        );
        Ok(result)
    }
}
