//! Thin typed client for the hosted assistant service.

pub mod types;

use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::fs;
use std::path::Path;
use thiserror::Error;

use types::{
    ApiErrorBody, Assistant, AssistantId, CreateAssistantRequest, CreateMessageRequest,
    DeletionStatus, FileId, FileObject, ListResponse, Message, Run, RunId, RunStep, Thread,
    ThreadId,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// The assistants surface was a beta in this API revision; every call to it
/// must opt in with this header, which the official SDKs add implicitly.
const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v1");

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("File read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },
    #[error("Invalid file path: {0}")]
    InvalidPath(String),
}

pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Point the client at a different host, e.g. a stub server in tests.
    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(method = %method, path, "api request");
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }

    /// Upload a local file for the `assistants` purpose.
    pub async fn upload_file(&self, path: &Path) -> Result<FileObject, ClientError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ClientError::InvalidPath(path.display().to_string()))?
            .to_string_lossy()
            .to_string();

        let file_content = fs::read(path)?;

        let form = multipart::Form::new().text("purpose", "assistants").part(
            "file",
            multipart::Part::bytes(file_content)
                .file_name(file_name)
                .mime_str("application/octet-stream")?,
        );

        let response = self
            .request(Method::POST, "/v1/files")
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch a stored file's raw bytes.
    pub async fn retrieve_file_content(&self, id: &FileId) -> Result<Vec<u8>, ClientError> {
        let response = self
            .request(Method::GET, &format!("/v1/files/{id}/content"))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }

    pub async fn delete_file(&self, id: &FileId) -> Result<DeletionStatus, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/v1/files/{id}")))
            .await
    }

    pub async fn create_assistant(
        &self,
        request: &CreateAssistantRequest,
    ) -> Result<Assistant, ClientError> {
        self.send(self.request(Method::POST, "/v1/assistants").json(request))
            .await
    }

    /// Attach files to an existing assistant.
    pub async fn update_assistant_files(
        &self,
        id: &AssistantId,
        file_ids: &[FileId],
    ) -> Result<Assistant, ClientError> {
        self.send(
            self.request(Method::POST, &format!("/v1/assistants/{id}"))
                .json(&json!({ "file_ids": file_ids })),
        )
        .await
    }

    pub async fn delete_assistant(&self, id: &AssistantId) -> Result<DeletionStatus, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/v1/assistants/{id}")))
            .await
    }

    /// Create a thread pre-seeded with the given messages.
    pub async fn create_thread(
        &self,
        messages: &[CreateMessageRequest],
    ) -> Result<Thread, ClientError> {
        self.send(
            self.request(Method::POST, "/v1/threads")
                .json(&json!({ "messages": messages })),
        )
        .await
    }

    pub async fn delete_thread(&self, id: &ThreadId) -> Result<DeletionStatus, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/v1/threads/{id}")))
            .await
    }

    pub async fn list_messages(&self, thread: &ThreadId) -> Result<Vec<Message>, ClientError> {
        let list: ListResponse<Message> = self
            .send(self.request(Method::GET, &format!("/v1/threads/{thread}/messages")))
            .await?;
        Ok(list.data)
    }

    pub async fn create_run(
        &self,
        thread: &ThreadId,
        assistant: &AssistantId,
    ) -> Result<Run, ClientError> {
        self.send(
            self.request(Method::POST, &format!("/v1/threads/{thread}/runs"))
                .json(&json!({ "assistant_id": assistant })),
        )
        .await
    }

    pub async fn retrieve_run(&self, thread: &ThreadId, run: &RunId) -> Result<Run, ClientError> {
        self.send(self.request(Method::GET, &format!("/v1/threads/{thread}/runs/{run}")))
            .await
    }

    pub async fn list_run_steps(
        &self,
        thread: &ThreadId,
        run: &RunId,
    ) -> Result<Vec<RunStep>, ClientError> {
        let list: ListResponse<RunStep> = self
            .send(self.request(
                Method::GET,
                &format!("/v1/threads/{thread}/runs/{run}/steps"),
            ))
            .await?;
        Ok(list.data)
    }
}

fn api_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => ClientError::Api {
            status,
            message: parsed.error.message,
            code: parsed.error.code,
        },
        Err(_) => ClientError::Api {
            status,
            message: if body.is_empty() {
                "empty error body".to_string()
            } else {
                body.to_string()
            },
            code: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_decodes_service_payload() {
        let body = r#"{"error":{"message":"No such file","type":"invalid_request_error","code":"not_found"}}"#;
        match api_error(404, body) {
            ClientError::Api {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "No such file");
                assert_eq!(code.as_deref(), Some("not_found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn api_error_keeps_unparseable_body() {
        match api_error(502, "<html>bad gateway</html>") {
            ClientError::Api {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 502);
                assert_eq!(message, "<html>bad gateway</html>");
                assert!(code.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_rejects_path_without_file_name() {
        let client = OpenAIClient::with_base_url("test-key".to_string(), "http://127.0.0.1:9");
        let result = client.upload_file(Path::new("/")).await;
        assert!(matches!(result, Err(ClientError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn upload_surfaces_missing_local_file_as_io_error() {
        let client = OpenAIClient::with_base_url("test-key".to_string(), "http://127.0.0.1:9");
        let result = client
            .upload_file(Path::new("/no/such/input/file.csv"))
            .await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
