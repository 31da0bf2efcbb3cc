// In-process autoregressive generation: one model/context pair behind a
// single-writer session. The engine itself is consumed through the
// InferenceEngine capability trait; llama.cpp wiring is feature-gated.

pub mod decode_loop;
pub mod engine;
#[cfg(feature = "llama-engine")]
pub mod llama;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
