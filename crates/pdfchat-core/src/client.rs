use std::future::Future;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const UPLOAD_ENDPOINT: &str = "/upload_pdf/";
const ASK_ENDPOINT: &str = "/ask/";
const RESET_ENDPOINT: &str = "/reset_all_db/";

#[derive(Deserialize)]
struct UploadResponse {
    file_id: String,
}

#[derive(Deserialize)]
struct AskResponse {
    response: String,
}

/// The remote question-answering service.
///
/// Futures are `Send` so the UI can run them on spawned tasks.
pub trait QaService: Send + Sync {
    /// Upload a PDF and return the identifier the service assigned to it
    fn upload_pdf(&self, path: &Path) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Ask a question about a previously uploaded document
    fn ask(
        &self,
        document_id: &str,
        query: &str,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Drop every document the service has stored
    fn reset_all(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Clone)]
pub struct HttpQaClient {
    client: Client,
    base_url: String,
}

impl HttpQaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn post_form(
        &self,
        endpoint: &'static str,
        form: Option<Form>,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.client.post(self.url(endpoint));
        if let Some(form) = form {
            request = request.multipart(form);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint, source })?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                endpoint,
                status: response.status(),
            });
        }

        Ok(response)
    }
}

impl QaService for HttpQaClient {
    async fn upload_pdf(&self, path: &Path) -> Result<String, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        debug!(file = %file_name, bytes = bytes.len(), "uploading pdf");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|source| ClientError::Transport {
                endpoint: UPLOAD_ENDPOINT,
                source,
            })?;
        let form = Form::new().part("file", part);

        let response = self.post_form(UPLOAD_ENDPOINT, Some(form)).await?;
        let upload: UploadResponse = response.json().await.map_err(|source| ClientError::Decode {
            endpoint: UPLOAD_ENDPOINT,
            source,
        })?;

        Ok(upload.file_id)
    }

    async fn ask(&self, document_id: &str, query: &str) -> Result<String, ClientError> {
        let form = Form::new()
            .text("file_id", document_id.to_string())
            .text("query", query.to_string());

        let response = self.post_form(ASK_ENDPOINT, Some(form)).await?;
        let answer: AskResponse = response.json().await.map_err(|source| ClientError::Decode {
            endpoint: ASK_ENDPOINT,
            source,
        })?;

        Ok(answer.response)
    }

    async fn reset_all(&self) -> Result<(), ClientError> {
        self.post_form(RESET_ENDPOINT, None).await?;
        Ok(())
    }
}
