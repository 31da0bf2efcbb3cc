//! Per-endpoint request pipelines: validate → prompt → generate → extract →
//! respond. Validation failures return 400 before any generation work;
//! rendered temp images are released on every exit path by the `TempImages`
//! drop guard.

pub mod inbox;
pub mod persona;

use axum::extract::rejection::JsonRejection;
use tracing::warn;

use crate::config::Config;
use crate::errors::AppError;
use crate::render::{self, TempImages};

/// Pulls a required field out of a request, naming it in the 400 message.
fn require<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or(AppError::MissingField(field))
}

fn invalid_json(rejection: JsonRejection) -> AppError {
    AppError::InvalidJson(rejection.body_text())
}

/// Renders each PDF attachment's first page into the temp dir. Non-PDF
/// attachments are ignored; a render failure skips that attachment and
/// continues with the rest.
async fn render_attachments<'a>(
    config: &Config,
    filenames: impl Iterator<Item = &'a str>,
) -> TempImages {
    let mut images = TempImages::default();
    for filename in filenames {
        let Some(name) = render::sanitize_filename(filename) else {
            continue;
        };
        if !render::is_pdf(name) {
            continue;
        }
        let pdf_path = config.uploads_dir.join(name);
        match render::render_first_page(&pdf_path, &config.temp_dir()).await {
            Ok(image) => images.push(image),
            Err(e) => {
                warn!(attachment = name, error = %e, "skipping attachment, render failed");
            }
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_names_the_missing_field() {
        let err = require::<String>(None, "email_id").unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: email_id");
        assert_eq!(require(Some(1), "email_id").unwrap(), 1);
    }
}
