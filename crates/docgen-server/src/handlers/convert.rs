//! Conversion API endpoint.
//!
//! Accepts a multipart upload with a Markdown `file` and an optional
//! `template` name, and responds with the converted document.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use docgen_convert::{ConvertRequest, is_markdown_filename, is_safe_filename, looks_binary};

use crate::error::ServerError;
use crate::state::AppState;

/// Multipart field holding the Markdown file.
const FILE_FIELD: &str = "file";

/// Multipart field holding the template name.
const TEMPLATE_FIELD: &str = "template";

/// Raw upload as read from the multipart body.
#[derive(Debug, Default)]
struct Upload {
    filename: Option<String>,
    content: Option<Vec<u8>>,
    template: Option<String>,
}

impl Upload {
    async fn read(multipart: &mut Multipart) -> Result<Self, ServerError> {
        let mut upload = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some(FILE_FIELD) => {
                    upload.filename = Some(field.file_name().unwrap_or_default().to_owned());
                    upload.content = Some(field.bytes().await?.to_vec());
                }
                Some(TEMPLATE_FIELD) => {
                    let template = field.text().await?;
                    upload.template = Some(template.trim().to_owned()).filter(|t| !t.is_empty());
                }
                _ => {}
            }
        }
        Ok(upload)
    }

    /// Validate the upload and turn it into a conversion request.
    fn into_request(self) -> Result<ConvertRequest, ServerError> {
        let (Some(filename), Some(content)) = (self.filename, self.content) else {
            return Err(bad_request("No file part in the request"));
        };
        if filename.is_empty() {
            return Err(bad_request("No file selected"));
        }
        if !is_markdown_filename(&filename) {
            return Err(bad_request(
                "File must be a Markdown file (.md or .markdown)",
            ));
        }
        if !is_safe_filename(&filename) {
            return Err(bad_request("Invalid filename"));
        }
        if looks_binary(&content) {
            return Err(bad_request("File appears to be binary, not text"));
        }
        let markdown =
            String::from_utf8(content).map_err(|_| bad_request("File must be UTF-8 encoded text"))?;

        let mut request = ConvertRequest::new(markdown).with_source_name(filename);
        if let Some(template) = self.template {
            request = request.with_template(template);
        }
        Ok(request)
    }
}

fn bad_request(message: &str) -> ServerError {
    ServerError::BadRequest(message.to_owned())
}

/// Handle POST /api/convert.
pub(crate) async fn post_convert(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, ServerError> {
    let compiler = Arc::clone(state.converter.compiler());
    if !tokio::task::spawn_blocking(move || compiler.is_available()).await? {
        return Err(ServerError::CompilerUnavailable);
    }

    let request = Upload::read(&mut multipart).await?.into_request()?;
    tracing::info!(
        file = request.source_name.as_deref().unwrap_or_default(),
        template = request.template.as_deref(),
        "Received conversion request"
    );

    let converter = state.converter.clone();
    let document = tokio::task::spawn_blocking(move || converter.convert(&request)).await??;

    // Read before returning: the workspace is removed after the grace period.
    let body = tokio::fs::read(&document.artifact).await?;
    let format = document.format;
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"document.{}\"", format.extension()),
            ),
        ],
        body,
    )
        .into_response())
}
