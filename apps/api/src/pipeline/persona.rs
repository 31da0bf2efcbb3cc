//! POST /ai/profile/persona — one-sentence persona summary from the
//! in-process text model.

use anyhow::anyhow;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{invalid_json, require};
use crate::errors::AppError;
use crate::extract;
use crate::generation::session::GenerateError;
use crate::prompts;
use crate::state::AppState;

/// Generation budget for the persona summary.
const PERSONA_MAX_TOKENS: usize = 256;

#[derive(Debug, Deserialize)]
pub struct PersonaRequest {
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub language: Option<String>,
    pub samples: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PersonaResponse {
    pub user_id: String,
    pub persona_string: String,
}

/// Validate → build prompt → serialized in-process generation → line
/// extraction (with deterministic fallback) → best-effort forward.
pub async fn handle_persona(
    State(state): State<AppState>,
    payload: Result<Json<PersonaRequest>, JsonRejection>,
) -> Result<Json<PersonaResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;

    let user_id = require(request.user_id, "user_id")?;
    let name = require(request.name, "name")?;
    let position = require(request.position, "position")?;
    let department = require(request.department, "department")?;
    let language = require(request.language, "language")?;
    let samples = require(request.samples, "samples")?;

    info!(%user_id, %name, "persona generation requested");

    let prompt = prompts::persona_prompt(&name, &position, &department, &language, &samples);

    let session = state
        .session
        .clone()
        .ok_or(GenerateError::NotInitialized)?;
    // generate() blocks on the session mutex for the full generation.
    let result = tokio::task::spawn_blocking(move || session.generate(&prompt, PERSONA_MAX_TOKENS))
        .await
        .map_err(|e| AppError::Internal(anyhow!("generation task panicked: {e}")))??;

    let persona_string = match extract::extract_persona_line(&result.text, &name) {
        Some(line) => line,
        None => {
            info!(%user_id, "no persona line extracted, synthesizing fallback");
            extract::fallback_persona(&name, &position, &department, &language)
        }
    };
    debug!(persona = %persona_string, "persona resolved");

    // Fire-and-forget: forward failure is logged and never affects the
    // primary response.
    if let Some(base_url) = state.config.persona_forward_url.clone() {
        tokio::spawn(forward_persona(
            state.forward_client.clone(),
            base_url,
            persona_string.clone(),
        ));
    }

    Ok(Json(PersonaResponse {
        user_id,
        persona_string,
    }))
}

async fn forward_persona(client: reqwest::Client, base_url: String, text: String) {
    let url = format!("{base_url}/ai/profile/persona");
    match client.post(&url).json(&json!({ "text": text })).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(%url, "persona forwarded downstream");
        }
        Ok(response) => {
            warn!(%url, status = %response.status(), "persona forward rejected");
        }
        Err(e) => {
            warn!(%url, error = %e, "persona forward failed");
        }
    }
}
