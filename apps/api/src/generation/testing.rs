//! Scripted engine used by session and decode-loop tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::engine::{EngineError, InferenceEngine, Token};

const EOS: i32 = 2;

/// Counters shared with the test after the engine moves into a session.
#[derive(Default)]
pub(crate) struct MockStats {
    pub resets: AtomicUsize,
    pub prompt_decodes: AtomicUsize,
    pub decode_calls: AtomicUsize,
    pub accepted: Mutex<Vec<i32>>,
    pub decoded_positions: Mutex<Vec<usize>>,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

/// Engine that replays a fixed token script. Sampling past the end of the
/// script yields EOS.
pub(crate) struct MockEngine {
    script: Vec<(i32, String)>,
    cursor: usize,
    eos_after: Option<usize>,
    context_window: usize,
    fail_decode_at: Option<usize>,
    panic_decode_at: Option<usize>,
    fail_tokenize: bool,
    step_delay: Option<Duration>,
    stats: Arc<MockStats>,
}

impl MockEngine {
    pub fn new(script: &[(i32, &str)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(t, piece)| (*t, piece.to_string()))
                .collect(),
            cursor: 0,
            eos_after: None,
            context_window: 2048,
            fail_decode_at: None,
            panic_decode_at: None,
            fail_tokenize: false,
            step_delay: None,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn with_eos_after(mut self, sampled: usize) -> Self {
        self.eos_after = Some(sampled);
        self
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    /// Fails the nth `decode_one` call (1-based).
    pub fn fail_decode_at(mut self, call: usize) -> Self {
        self.fail_decode_at = Some(call);
        self
    }

    /// Panics on the nth `decode_one` call (1-based), counted across
    /// generations, poisoning any lock held at that point.
    pub fn panic_decode_at(mut self, call: usize) -> Self {
        self.panic_decode_at = Some(call);
        self
    }

    pub fn with_failing_tokenizer(mut self) -> Self {
        self.fail_tokenize = true;
        self
    }

    /// Sleeps inside every `decode_one`, making lock contention observable.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    pub fn decode_calls(&self) -> usize {
        self.stats.decode_calls.load(Ordering::SeqCst)
    }

    pub fn decoded_positions(&self) -> Vec<usize> {
        self.stats.decoded_positions.lock().unwrap().clone()
    }
}

impl InferenceEngine for MockEngine {
    fn context_window(&self) -> usize {
        self.context_window
    }

    fn tokenize(&self, text: &str) -> Result<Vec<Token>, EngineError> {
        if self.fail_tokenize {
            return Err(EngineError::Tokenization("scripted failure".into()));
        }
        Ok(text.split_whitespace().map(|_| Token(1)).collect())
    }

    fn decode_prompt(&mut self, _tokens: &[Token]) -> Result<(), EngineError> {
        self.stats.prompt_decodes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn decode_one(&mut self, _token: Token, pos: usize) -> Result<(), EngineError> {
        let n = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(n, Ordering::SeqCst);
        if let Some(delay) = self.step_delay {
            std::thread::sleep(delay);
        }
        self.stats.active.fetch_sub(1, Ordering::SeqCst);

        let call = self.stats.decode_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.decoded_positions.lock().unwrap().push(pos);
        if self.panic_decode_at == Some(call) {
            panic!("scripted panic");
        }
        if self.fail_decode_at == Some(call) {
            return Err(EngineError::Decode("scripted failure".into()));
        }
        Ok(())
    }

    fn sample(&mut self) -> Token {
        if self.eos_after.is_some_and(|n| self.cursor >= n) || self.cursor >= self.script.len() {
            return Token(EOS);
        }
        let token = Token(self.script[self.cursor].0);
        self.cursor += 1;
        token
    }

    fn accept(&mut self, token: Token) {
        self.stats.accepted.lock().unwrap().push(token.0);
    }

    fn token_to_piece(&mut self, token: Token) -> String {
        self.script
            .iter()
            .find(|(t, _)| *t == token.0)
            .map(|(_, piece)| piece.clone())
            .unwrap_or_default()
    }

    fn eos_token(&self) -> Token {
        Token(EOS)
    }

    fn is_valid_token(&self, token: Token) -> bool {
        token.0 >= 0
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.stats.resets.fetch_add(1, Ordering::SeqCst);
    }
}
