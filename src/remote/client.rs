//! HTTP client for the document cloud.
//!
//! A listing takes two requests: the configured device token is exchanged
//! for a short-lived user token, which then authorizes the document list.
//!
//! Transient failures (connect errors, timeouts, HTTP 429 and 5xx) are
//! retried with exponential backoff: base, 2x base, 4x base, ...

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use std::future::Future;
use std::time::Duration;

use super::{DocumentSource, RemoteError};
use crate::config::RemoteConfig;
use crate::models::RawDocument;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Document cloud client.
pub struct RemarkableClient {
    http: reqwest::Client,
    api_url: String,
    auth_url: String,
    device_token: Option<String>,
    max_retries: u32,
    base_delay: Duration,
}

impl RemarkableClient {
    /// Creates a client from config. A missing device token is not an error
    /// here; it is reported by [`DocumentSource::check_configured`].
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            device_token: config.device_token.clone().filter(|t| !t.is_empty()),
            max_retries: config.max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn user_token_url(&self) -> String {
        format!("{}/token/json/2/user/new", self.auth_url)
    }

    fn docs_url(&self) -> String {
        format!("{}/document-storage/json/2/docs", self.api_url)
    }

    fn user_agent() -> String {
        format!("remarkidian/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Exchanges the device token for a user token.
    async fn user_token(&self) -> Result<String, RemoteError> {
        let device_token = self
            .device_token
            .as_deref()
            .ok_or(RemoteError::NotConfigured)?;

        let response = self
            .http
            .post(self.user_token_url())
            .header(AUTHORIZATION, format!("Bearer {}", device_token))
            .header(USER_AGENT, Self::user_agent())
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let token = response.text().await?.trim().to_string();
        if token.is_empty() {
            return Err(RemoteError::Decode("empty user token".to_string()));
        }
        Ok(token)
    }

    async fn fetch_documents(&self) -> Result<Vec<RawDocument>, RemoteError> {
        let user_token = self.user_token().await?;

        let response = self
            .http
            .get(self.docs_url())
            .header(AUTHORIZATION, format!("Bearer {}", user_token))
            .header(USER_AGENT, Self::user_agent())
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let documents: Vec<RawDocument> = response.json().await?;
        Ok(documents)
    }
}

#[async_trait]
impl DocumentSource for RemarkableClient {
    fn check_configured(&self) -> Result<(), RemoteError> {
        match self.device_token {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotConfigured),
        }
    }

    async fn list_documents(&self) -> Result<Vec<RawDocument>, RemoteError> {
        let documents = with_retry("list_documents", self.max_retries, self.base_delay, || {
            self.fetch_documents()
        })
        .await?;

        tracing::info!("Retrieved {} documents from the cloud", documents.len());
        Ok(documents)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Runs `f`, retrying transient failures with exponential backoff.
async fn with_retry<F, Fut, T>(
    operation: &str,
    max_retries: u32,
    base_delay: Duration,
    f: F,
) -> Result<T, RemoteError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < max_retries && err.is_transient() => {
                let delay = base_delay * 2u32.pow(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct FakeCloud {
        /// Number of docs requests to fail with 503 before succeeding
        failures_left: Arc<AtomicU32>,
        docs_calls: Arc<AtomicU32>,
    }

    async fn issue_user_token(headers: HeaderMap) -> Response {
        match headers.get("authorization").and_then(|h| h.to_str().ok()) {
            Some("Bearer device-token") => "user-token\n".into_response(),
            _ => (StatusCode::UNAUTHORIZED, "invalid device token").into_response(),
        }
    }

    async fn list_docs(State(cloud): State<FakeCloud>, headers: HeaderMap) -> Response {
        cloud.docs_calls.fetch_add(1, Ordering::SeqCst);
        if headers.get("authorization").and_then(|h| h.to_str().ok()) != Some("Bearer user-token")
        {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        if cloud
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        Json(serde_json::json!([
            {"ID": "f1", "VissibleName": "Work", "Type": "CollectionType", "Parent": "", "Version": 1},
            {"ID": "d1", "VissibleName": "Plan.pdf", "Type": "DocumentType", "Parent": "f1", "Version": 3}
        ]))
        .into_response()
    }

    async fn spawn_cloud(failures: u32) -> (String, FakeCloud) {
        let cloud = FakeCloud {
            failures_left: Arc::new(AtomicU32::new(failures)),
            docs_calls: Arc::new(AtomicU32::new(0)),
        };
        let app = Router::new()
            .route("/token/json/2/user/new", post(issue_user_token))
            .route("/document-storage/json/2/docs", get(list_docs))
            .with_state(cloud.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), cloud)
    }

    fn config(base_url: &str, device_token: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            api_url: format!("{}/", base_url),
            auth_url: base_url.to_string(),
            device_token: device_token.map(String::from),
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = RemarkableClient::from_config(&config("http://cloud.test/", None)).unwrap();
        assert_eq!(
            client.docs_url(),
            "http://cloud.test/document-storage/json/2/docs"
        );
        assert_eq!(
            client.user_token_url(),
            "http://cloud.test/token/json/2/user/new"
        );
    }

    #[test]
    fn test_missing_or_empty_token_is_not_configured() {
        let client = RemarkableClient::from_config(&config("http://cloud.test", None)).unwrap();
        assert!(matches!(
            client.check_configured(),
            Err(RemoteError::NotConfigured)
        ));

        let client =
            RemarkableClient::from_config(&config("http://cloud.test", Some(""))).unwrap();
        assert!(client.check_configured().is_err());
    }

    #[tokio::test]
    async fn test_list_documents() {
        let (url, _cloud) = spawn_cloud(0).await;
        let client = RemarkableClient::from_config(&config(&url, Some("device-token"))).unwrap();

        let docs = client.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].id.as_deref(), Some("d1"));
        assert_eq!(docs[1].parent.as_deref(), Some("f1"));
    }

    #[tokio::test]
    async fn test_bad_device_token_is_auth_failure() {
        let (url, cloud) = spawn_cloud(0).await;
        let client = RemarkableClient::from_config(&config(&url, Some("wrong"))).unwrap();

        let err = client.list_documents().await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(cloud.docs_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let (url, cloud) = spawn_cloud(2).await;
        let client = RemarkableClient::from_config(&config(&url, Some("device-token")))
            .unwrap()
            .with_base_delay(Duration::from_millis(1));

        let docs = client.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(cloud.docs_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let (url, cloud) = spawn_cloud(10).await;
        let client = RemarkableClient::from_config(&config(&url, Some("device-token")))
            .unwrap()
            .with_base_delay(Duration::from_millis(1));

        let err = client.list_documents().await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 503, .. }));
        // One attempt plus max_retries
        assert_eq!(cloud.docs_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_permanent_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), RemoteError> =
            with_retry("test", 5, Duration::from_millis(1), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Decode("bad json".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
