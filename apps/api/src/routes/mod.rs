pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::{inbox, persona};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ai/profile/persona", post(persona::handle_persona))
        .route("/ai/inbox/detect-cv", post(inbox::handle_detect_cv))
        .route("/ai/inbox/draft-reply", post(inbox::handle_draft_reply))
        .route("/ai/inbox/classify", post(inbox::handle_classify))
        .with_state(state)
}
