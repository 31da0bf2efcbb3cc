use std::sync::Arc;

use crate::config::Config;
use crate::generation::session::GenerationSession;
use crate::vision::VisionRunner;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// In-process generation session. `None` when the server was built
    /// without the `llama-engine` feature; persona requests then fail with
    /// `NotInitialized`.
    pub session: Option<Arc<GenerationSession>>,
    pub vision: VisionRunner,
    /// Client for the best-effort persona forward (5s connect / 10s total).
    pub forward_client: reqwest::Client,
}
