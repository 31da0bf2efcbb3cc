//! Inference-engine capability surface.
//!
//! The engine itself (weights, tokenizer, forward pass) is an external
//! collaborator; this trait is the exact surface the generation session
//! consumes. The production adapter over llama.cpp lives in
//! `generation::llama` behind the `llama-engine` feature.

use thiserror::Error;

/// Integer identifier for a sub-word unit in the engine's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub i32);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

/// One loaded model plus its mutable per-session state (KV cache, position
/// counter, sampler chain). Exclusively owned by a [`GenerationSession`];
/// never shared between in-flight generations.
///
/// [`GenerationSession`]: super::session::GenerationSession
pub trait InferenceEngine: Send {
    /// Maximum number of tokens (prompt + generated) the context can hold.
    fn context_window(&self) -> usize;

    /// Converts text into a token sequence.
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError>;

    /// Decodes the full prompt as one batch. Implementations request logits
    /// only for the final position.
    fn decode_prompt(&mut self, tokens: &[Token]) -> Result<(), EngineError>;

    /// Decodes a single freshly sampled token at position `pos`.
    fn decode_one(&mut self, token: Token, pos: usize) -> Result<(), EngineError>;

    /// Samples one token from the logits of the last decoded position.
    fn sample(&mut self) -> Token;

    /// Registers a token with the sampler chain's acceptance state, keeping
    /// frequency/repeat-aware samplers aware of everything in the context.
    fn accept(&mut self, token: Token);

    /// Text fragment for a token. May be empty for control tokens or while
    /// the engine is holding back an incomplete UTF-8 sequence.
    fn token_to_piece(&mut self, token: Token) -> String;

    /// The end-of-sequence token for this vocabulary.
    fn eos_token(&self) -> Token;

    /// Whether `token` is a real vocabulary entry. Guards against the engine
    /// handing back an out-of-range identifier.
    fn is_valid_token(&self, token: Token) -> bool;

    /// Clears context memory and resets the sampler chain. Called at the
    /// start of every generation so no request observes another request's
    /// residual state.
    fn reset(&mut self);
}
