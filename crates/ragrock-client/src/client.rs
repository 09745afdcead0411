//! reqwest-based client for the `/api/*` HTTP contract.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ragrock_core::backend::{Anonymous, ChatBackend, DocumentBackend, SessionProvider};
use ragrock_core::config::ServerConfig;
use ragrock_core::types::{
    AdminClearAllResponse, ChatRequest, ChatResponse, FileListItem, FileUploadResponse,
    HealthStatus,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::credentials::{CredentialStore, Credentials};
use crate::error::ClientError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// File extensions accepted by `POST /api/upload`.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["pdf", "txt", "doc", "docx", "md"];

/// Header carrying the admin secret on `/api/admin/*`.
pub const ADMIN_TOKEN_HEADER: &str = "admin-token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the RAG-&-Rock backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl ApiClient {
    /// Creates an anonymous client for `base_url` without a request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_session(base_url, None, Arc::new(Anonymous))
    }

    /// Creates a client with an optional per-request timeout and a session
    /// provider supplying the bearer token.
    pub fn with_session(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            session,
        })
    }

    /// Creates a client from the `[server]` config section.
    pub fn from_config(
        server: &ServerConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, ClientError> {
        let timeout = match server.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::with_session(server.base_url.clone(), timeout, session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and check its status, returning the raw response on
    /// success. No session credentials are attached.
    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!(status = status.as_u16(), %message, "Backend returned an error");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Like `dispatch`, with the session's bearer token attached.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ClientError> {
        self.dispatch(self.authorize(request)).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        Self::decode(self.execute(request).await?).await
    }

    /// `GET /api/health`.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.send_json(self.http.get(self.url("/health"))).await
    }

    /// `GET /api/files`, in backend order.
    #[instrument(skip(self))]
    pub async fn list_files(&self) -> Result<Vec<FileListItem>, ClientError> {
        let files: Vec<FileListItem> = self.send_json(self.http.get(self.url("/files"))).await?;
        debug!(count = files.len(), "Listed files");
        Ok(files)
    }

    /// `DELETE /api/files/{id}`.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, file_id: i64) -> Result<(), ClientError> {
        self.execute(self.http.delete(self.url(&format!("/files/{}", file_id))))
            .await?;
        Ok(())
    }

    /// `POST /api/chat`.
    #[instrument(skip(self, request), fields(file_id = ?request.file_id, k = request.k))]
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        debug!("Sending chat request");
        let response: ChatResponse = self
            .send_json(self.http.post(self.url("/chat")).json(request))
            .await?;
        debug!(sources = response.sources.len(), "Received chat response");
        Ok(response)
    }

    /// `POST /api/upload` with the file in multipart field `file`.
    ///
    /// The extension is checked locally before anything is read or sent.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload_file(&self, path: &Path) -> Result<FileUploadResponse, ClientError> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_accepted_file(&filename) {
            return Err(ClientError::UnsupportedFileType(filename));
        }

        let bytes = tokio::fs::read(path).await?;
        debug!(size = bytes.len(), "Uploading file");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);
        self.send_json(self.http.post(self.url("/upload")).multipart(form))
            .await
    }

    /// `POST /api/admin/clear_all`. Authenticated by the `admin-token`
    /// header only; the user's bearer token is not sent. A blank token is
    /// rejected without a request being made.
    #[instrument(skip(self, admin_token))]
    pub async fn admin_clear_all(
        &self,
        admin_token: &str,
    ) -> Result<AdminClearAllResponse, ClientError> {
        let admin_token = admin_token.trim();
        if admin_token.is_empty() {
            return Err(ClientError::MissingAdminToken);
        }
        let response = self
            .dispatch(
                self.http
                    .post(self.url("/admin/clear_all"))
                    .header(ADMIN_TOKEN_HEADER, admin_token),
            )
            .await?;
        Self::decode(response).await
    }

    /// `POST /api/auth/login` with multipart fields `username` and
    /// `password`. Returns the access token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let form = reqwest::multipart::Form::new()
            .text("username", username.to_string())
            .text("password", password.to_string());
        let token: TokenResponse = self
            .send_json(self.http.post(self.url("/auth/login")).multipart(form))
            .await?;
        Ok(token.access_token)
    }

    /// `POST /api/auth/register` with a JSON body.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.execute(
            self.http
                .post(self.url("/auth/register"))
                .json(&serde_json::json!({ "username": username, "password": password })),
        )
        .await?;
        Ok(())
    }

    /// Log in and remember the session in `store`.
    pub async fn sign_in(
        &self,
        store: &CredentialStore,
        username: &str,
        password: &str,
    ) -> Result<Credentials, ClientError> {
        let access_token = self.login(username, password).await?;
        let credentials = Credentials {
            username: username.to_string(),
            access_token,
        };
        store.login(credentials.clone())?;
        Ok(credentials)
    }

    /// Create an account, then sign in with it. Nothing is stored if
    /// registration fails.
    pub async fn register_and_sign_in(
        &self,
        store: &CredentialStore,
        username: &str,
        password: &str,
    ) -> Result<Credentials, ClientError> {
        self.register(username, password).await?;
        self.sign_in(store, username, password).await
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    type Error = ClientError;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        ApiClient::chat(self, request).await
    }
}

#[async_trait]
impl DocumentBackend for ApiClient {
    type Error = ClientError;

    async fn list_files(&self) -> Result<Vec<FileListItem>, ClientError> {
        ApiClient::list_files(self).await
    }

    async fn delete_file(&self, file_id: i64) -> Result<(), ClientError> {
        ApiClient::delete_file(self, file_id).await
    }
}

/// Whether `filename` has one of the accepted upload extensions.
pub fn is_accepted_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Extract the user-facing message from an error response body.
///
/// Prefers `detail`, then `message`, then "Request failed". A structured
/// `detail` is rendered as JSON text. A body that is not JSON yields
/// "Unknown error".
pub fn error_message(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return "Unknown error".to_string(),
    };

    let non_empty = |field: &str| match value.get(field) {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    non_empty("detail")
        .or_else(|| non_empty("message"))
        .unwrap_or_else(|| "Request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragrock_core::backend::StaticToken;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://localhost:9000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.url("/files"), "http://localhost:9000/api/files");
    }

    #[test]
    fn test_empty_base_url_uses_default() {
        let client = ApiClient::new("").unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_config() {
        let server = ServerConfig {
            base_url: "http://10.0.0.2:8000".to_string(),
            request_timeout_secs: 0,
        };
        let client =
            ApiClient::from_config(&server, Arc::new(StaticToken("abc".into()))).unwrap();
        assert_eq!(client.url("/chat"), "http://10.0.0.2:8000/api/chat");
        assert_eq!(client.session.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_accepted_extensions() {
        assert!(is_accepted_file("report.pdf"));
        assert!(is_accepted_file("NOTES.MD"));
        assert!(is_accepted_file("a.b.docx"));
        assert!(!is_accepted_file("image.png"));
        assert!(!is_accepted_file("README"));
        assert!(!is_accepted_file(""));
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(r#"{"detail": "model unavailable", "message": "other"}"#),
            "model unavailable"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_message() {
        assert_eq!(error_message(r#"{"message": "Invalid file"}"#), "Invalid file");
        assert_eq!(
            error_message(r#"{"detail": "", "message": "Invalid file"}"#),
            "Invalid file"
        );
    }

    #[test]
    fn test_error_message_structured_detail() {
        let message = error_message(r#"{"detail": [{"loc": ["body", "question"]}]}"#);
        assert!(message.starts_with('['));
        assert!(message.contains("question"));
    }

    #[test]
    fn test_error_message_defaults() {
        assert_eq!(error_message("{}"), "Request failed");
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), "Unknown error");
        assert_eq!(error_message(""), "Unknown error");
    }
}
