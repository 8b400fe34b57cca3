//! Router fixtures for handler tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use docgen_convert::{
    CleanupRegistry, CompileError, CompileJob, Converter, DocumentCompiler, TemplateStore,
    WorkspaceManager,
};
use docgen_diagrams::{DiagramBlock, DiagramRenderer, RenderFailure, RenderedImage};

use crate::app::create_router;
use crate::state::AppState;

const BOUNDARY: &str = "docgen-test-boundary";

/// Renders every diagram to a fixed byte string.
pub(crate) struct StubRenderer;

impl DiagramRenderer for StubRenderer {
    fn render(&self, _block: &DiagramBlock, output: &Path) -> Result<RenderedImage, RenderFailure> {
        fs::write(output, b"png")?;
        Ok(RenderedImage {
            path: output.to_path_buf(),
            bytes: 3,
        })
    }
}

/// Copies the input Markdown to the output path.
pub(crate) struct StubCompiler {
    pub(crate) available: bool,
}

impl DocumentCompiler for StubCompiler {
    fn compile(&self, job: &CompileJob) -> Result<(), CompileError> {
        if !self.available {
            return Err(CompileError::Unavailable {
                program: "pandoc".to_owned(),
            });
        }
        fs::copy(job.working_dir.join(&job.input), job.output_path())?;
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// A router over a temporary upload root and template directory.
pub(crate) struct TestApp {
    pub(crate) dir: tempfile::TempDir,
    pub(crate) registry: Arc<CleanupRegistry>,
    pub(crate) router: Router,
}

impl TestApp {
    pub(crate) fn new(available: bool) -> Self {
        Self::with_limit(available, 1024 * 1024)
    }

    pub(crate) fn with_limit(available: bool, max_upload_bytes: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("templates")).unwrap();
        let registry = Arc::new(CleanupRegistry::new().unwrap());
        let converter = Converter::new(
            Arc::new(StubRenderer),
            Arc::new(StubCompiler { available }),
            WorkspaceManager::new(dir.path().join("uploads"), Arc::clone(&registry)),
        )
        .with_templates(TemplateStore::new(dir.path().join("templates")));
        let router = create_router(Arc::new(AppState::new(converter)), max_upload_bytes);
        Self {
            dir,
            registry,
            router,
        }
    }

    pub(crate) fn add_template(&self, name: &str) {
        fs::write(self.dir.path().join("templates").join(name), b"template").unwrap();
    }

    pub(crate) fn workspace_count(&self) -> usize {
        fs::read_dir(self.dir.path().join("uploads")).map_or(0, Iterator::count)
    }
}

/// One multipart form part.
pub(crate) enum Part<'a> {
    File { name: &'a str, filename: &'a str, content: &'a [u8] },
    Text { name: &'a str, value: &'a str },
}

/// Build a `POST /api/convert` request with a multipart body.
pub(crate) fn convert_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; \
                         filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub(crate) async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub(crate) async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
