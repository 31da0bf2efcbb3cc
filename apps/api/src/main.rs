mod config;
mod errors;
mod extract;
mod generation;
mod pipeline;
mod prompts;
mod render;
mod routes;
mod state;
mod vision;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::session::GenerationSession;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vision::VisionRunner;

// Timeouts for the best-effort persona forward.
const FORWARD_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const FORWARD_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_env_filter(&config.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting smolchat API v{}", env!("CARGO_PKG_VERSION"));

    let session = build_session(&config)?;
    if session.is_none() {
        warn!("no in-process engine; persona requests will fail with NotInitialized");
    }

    let vision = VisionRunner::new(
        config.vision_cli_path.clone(),
        config.vision_model_path.clone(),
        config.mmproj_path.clone(),
    );
    for path in vision.required_files() {
        if !path.is_file() {
            warn!(path = %path.display(), "vision dependency missing; vision endpoints will fail");
        }
    }

    let forward_client = reqwest::Client::builder()
        .connect_timeout(FORWARD_CONNECT_TIMEOUT)
        .timeout(FORWARD_READ_TIMEOUT)
        .build()?;

    let state = AppState {
        config: config.clone(),
        session,
        vision,
        forward_client,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset, scoped to this crate's events. The
/// package name is hyphenated but tracing targets use the module path, so the
/// hyphen must become an underscore for the directive to match anything.
fn default_env_filter(level: &str) -> EnvFilter {
    let target = env!("CARGO_PKG_NAME").replace('-', "_");
    EnvFilter::new(format!("{target}={level}"))
}

/// Loads the in-process model once for the process lifetime. Load failure is
/// fatal: serving persona requests without a model would only defer the error.
#[cfg(feature = "llama-engine")]
fn build_session(config: &Config) -> Result<Option<Arc<GenerationSession>>> {
    let engine = generation::llama::LlamaEngine::load(
        &config.model_path,
        config.n_ctx,
        config.n_threads,
    )?;
    Ok(Some(Arc::new(GenerationSession::new(Box::new(engine)))))
}

#[cfg(not(feature = "llama-engine"))]
fn build_session(_config: &Config) -> Result<Option<Arc<GenerationSession>>> {
    Ok(None)
}
