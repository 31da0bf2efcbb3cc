//! Autoregressive decode/sample/stop loop for one request.
//!
//! Sampled tokens are classified in a fixed order: end-of-sequence stops the
//! loop immediately, out-of-range identifiers stop it defensively, everything
//! else is appended, accepted, and decoded into the context at the next
//! position. A decode failure mid-stream keeps whatever was generated so far.

use tracing::{debug, warn};

use super::engine::InferenceEngine;

/// Why a generation stopped. Operational diagnosis only; the pipeline never
/// distinguishes these in the client-visible response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfSequence,
    MaxTokens,
    InvalidToken,
    DecodeFailure,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::EndOfSequence => write!(f, "end_of_sequence"),
            StopReason::MaxTokens => write!(f, "max_tokens_reached"),
            StopReason::InvalidToken => write!(f, "invalid_token"),
            StopReason::DecodeFailure => write!(f, "decode_failure"),
        }
    }
}

/// Accumulated text plus the reason generation stopped.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
    pub stop: StopReason,
}

/// Runs the decode loop after the prompt has been decoded.
///
/// `prompt_len` is the number of prompt tokens already in the context; the
/// position counter continues from there and increases by exactly one per
/// accepted step, so no token is ever decoded twice.
pub(super) fn run(
    engine: &mut dyn InferenceEngine,
    prompt_len: usize,
    max_tokens: usize,
) -> GenerationResult {
    let mut text = String::new();
    let mut pos = prompt_len;
    let mut generated = 0;

    while generated < max_tokens {
        let token = engine.sample();

        if token == engine.eos_token() {
            debug!(generated, "eos token sampled");
            return GenerationResult {
                text,
                stop: StopReason::EndOfSequence,
            };
        }

        if !engine.is_valid_token(token) {
            warn!(token = token.0, generated, "engine sampled invalid token");
            return GenerationResult {
                text,
                stop: StopReason::InvalidToken,
            };
        }

        // Empty pieces (control tokens) contribute nothing but still advance
        // the context.
        text.push_str(&engine.token_to_piece(token));
        engine.accept(token);

        if let Err(e) = engine.decode_one(token, pos) {
            warn!(error = %e, generated, "decode failed mid-generation, keeping partial output");
            return GenerationResult {
                text,
                stop: StopReason::DecodeFailure,
            };
        }

        pos += 1;
        generated += 1;
    }

    GenerationResult {
        text,
        stop: StopReason::MaxTokens,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::MockEngine;
    use super::*;

    #[test]
    fn stops_on_first_eos() {
        let mut engine = MockEngine::new(&[(10, "Hello"), (11, " world")]).with_eos_after(2);
        let result = run(&mut engine, 4, 64);
        assert_eq!(result.stop, StopReason::EndOfSequence);
        assert_eq!(result.text, "Hello world");
    }

    #[test]
    fn respects_max_tokens_budget() {
        let mut engine = MockEngine::new(&[(10, "a"), (11, "b"), (12, "c"), (13, "d")]);
        let result = run(&mut engine, 0, 3);
        assert_eq!(result.stop, StopReason::MaxTokens);
        assert_eq!(result.text, "abc");
    }

    #[test]
    fn zero_budget_terminates_immediately() {
        let mut engine = MockEngine::new(&[(10, "never")]);
        let result = run(&mut engine, 0, 0);
        assert_eq!(result.stop, StopReason::MaxTokens);
        assert!(result.text.is_empty());
        assert_eq!(engine.decode_calls(), 0);
    }

    #[test]
    fn invalid_token_stops_without_emitting() {
        let mut engine = MockEngine::new(&[(10, "ok"), (-3, "bad"), (11, "unreached")]);
        let result = run(&mut engine, 0, 16);
        assert_eq!(result.stop, StopReason::InvalidToken);
        assert_eq!(result.text, "ok");
    }

    #[test]
    fn decode_failure_keeps_partial_output() {
        let mut engine =
            MockEngine::new(&[(10, "keep "), (11, "this"), (12, " lost")]).fail_decode_at(2);
        let result = run(&mut engine, 0, 16);
        assert_eq!(result.stop, StopReason::DecodeFailure);
        assert_eq!(result.text, "keep this");
    }

    #[test]
    fn empty_piece_emits_nothing_but_continues() {
        let mut engine = MockEngine::new(&[(10, "a"), (11, ""), (12, "b")]);
        let result = run(&mut engine, 0, 3);
        assert_eq!(result.text, "ab");
        assert_eq!(result.stop, StopReason::MaxTokens);
    }

    #[test]
    fn positions_strictly_increase_from_prompt_length() {
        let mut engine = MockEngine::new(&[(10, "a"), (11, "b"), (12, "c")]);
        let _ = run(&mut engine, 7, 3);
        assert_eq!(engine.decoded_positions(), vec![7, 8, 9]);
    }
}
