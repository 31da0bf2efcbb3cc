//! Inbox endpoints backed by the vision subprocess: CV detection, draft
//! replies, and classification. Each request spawns its own vision process,
//! so these run concurrently with each other and with the persona session.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{invalid_json, render_attachments, require};
use crate::errors::AppError;
use crate::extract;
use crate::prompts;
use crate::state::AppState;
use crate::vision::VisionOptions;

#[derive(Debug, Deserialize)]
pub struct Attachment {
    pub filename: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// POST /ai/inbox/detect-cv
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DetectCvRequest {
    pub email_id: Option<String>,
    /// Attachment filenames, resolved against the upload directory.
    pub attachments: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct DetectCvResponse {
    pub email_id: String,
    pub cv_detected: bool,
    pub metadata: Value,
}

pub async fn handle_detect_cv(
    State(state): State<AppState>,
    payload: Result<Json<DetectCvRequest>, JsonRejection>,
) -> Result<Json<DetectCvResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let email_id = require(request.email_id, "email_id")?;
    let attachments = require(request.attachments, "attachments")?;

    info!(%email_id, attachments = attachments.len(), "cv detection requested");

    let images = render_attachments(&state.config, attachments.iter().map(String::as_str)).await;

    let (cv_detected, metadata) = if images.is_empty() {
        (false, json!({}))
    } else {
        let output = state
            .vision
            .run(
                &prompts::cv_extraction_prompt(),
                images.paths(),
                VisionOptions::CV_EXTRACTION,
            )
            .await?;
        let metadata = extract::parse_cv_metadata(&output);
        if metadata.is_fallback() {
            warn!(%email_id, "cv metadata unrecoverable, using defaults");
        }
        (true, serde_json::to_value(metadata.into_inner()).map_err(anyhow::Error::from)?)
    };

    Ok(Json(DetectCvResponse {
        email_id,
        cv_detected,
        metadata,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /ai/inbox/draft-reply
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DraftReplyRequest {
    pub email_id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub persona_string: Option<String>,
    pub instruction: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct DraftReplyResponse {
    pub email_id: String,
    pub subject: String,
    pub draft_reply: String,
}

pub async fn handle_draft_reply(
    State(state): State<AppState>,
    payload: Result<Json<DraftReplyRequest>, JsonRejection>,
) -> Result<Json<DraftReplyResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let email_id = require(request.email_id, "email_id")?;
    let subject = require(request.subject, "subject")?;
    let body = require(request.body, "body")?;
    let persona_string = require(request.persona_string, "persona_string")?;

    info!(%email_id, "draft reply requested");

    let images = render_attachments(
        &state.config,
        request
            .attachments
            .iter()
            .filter_map(|a| a.filename.as_deref()),
    )
    .await;

    let prompt = prompts::draft_reply_prompt(
        &persona_string,
        &subject,
        &body,
        request.instruction.as_deref(),
        !images.is_empty(),
    );
    let output = state
        .vision
        .run(&prompt, images.paths(), VisionOptions::DRAFT_REPLY)
        .await?;

    let reply = extract::parse_draft_reply(&output);
    if reply.is_fallback() {
        warn!(%email_id, "draft reply unrecoverable, using fallback record");
    }
    let reply = reply.into_inner();

    Ok(Json(DraftReplyResponse {
        email_id,
        subject: reply.subject,
        draft_reply: reply.draft_reply,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /ai/inbox/classify
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub email_id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub email_id: String,
    pub category: String,
    pub confidence: f64,
}

pub async fn handle_classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, AppError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let email_id = require(request.email_id, "email_id")?;
    let subject = require(request.subject, "subject")?;
    let body = require(request.body, "body")?;

    info!(%email_id, "classification requested");

    let images = render_attachments(
        &state.config,
        request
            .attachments
            .iter()
            .filter_map(|a| a.filename.as_deref()),
    )
    .await;

    let prompt = prompts::classification_prompt(&subject, &body, !images.is_empty());
    let output = state
        .vision
        .run(&prompt, images.paths(), VisionOptions::CLASSIFICATION)
        .await?;

    let classification = extract::parse_classification(&output).into_inner();

    Ok(Json(ClassifyResponse {
        email_id,
        category: classification.category,
        confidence: classification.confidence,
    }))
}
