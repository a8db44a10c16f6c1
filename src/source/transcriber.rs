//! Speech-to-text over HTTP.
//!
//! [`HttpTranscriber`] posts a WAV payload to the configured endpoint and
//! expects `{ "text": "..." }` back.  A non-2xx status or a body that does not
//! parse is a hard failure; nothing is retried here.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::ErrorCode;
use crate::config::TranscriptionConfig;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscribeError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-2xx status.
    #[error("transcription service returned HTTP {0}")]
    Status(u16),

    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    #[error("failed to encode audio: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Request(e.to_string())
        }
    }
}

impl From<hound::Error> for TranscribeError {
    fn from(e: hound::Error) -> Self {
        TranscribeError::Encode(e.to_string())
    }
}

impl TranscribeError {
    /// The service could not be reached at all (worth retrying later).
    pub fn is_network(&self) -> bool {
        matches!(self, TranscribeError::Request(_) | TranscribeError::Timeout)
    }

    /// The error code a session reports for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            TranscribeError::Request(_) | TranscribeError::Timeout => ErrorCode::Network,
            TranscribeError::Encode(_) => ErrorCode::Other("audio-encoding".into()),
            TranscribeError::Status(_) | TranscribeError::Parse(_) => {
                ErrorCode::Other("transcription-failed".into())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Turns a WAV payload into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: Vec<u8>, locale: &str) -> Result<String, TranscribeError>;
}

// ---------------------------------------------------------------------------
// HttpTranscriber
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Posts audio to an HTTP transcription endpoint.
///
/// The request body is the raw WAV file (`Content-Type: audio/wav`); the
/// locale travels as the `language` query parameter, and `model` is added
/// when configured.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl HttpTranscriber {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: Vec<u8>, locale: &str) -> Result<String, TranscribeError> {
        let mut query = vec![("language", locale.to_string())];
        if let Some(model) = self.config.model.as_deref().filter(|m| !m.is_empty()) {
            query.push(("model", model.to_string()));
        }

        let mut req = self
            .client
            .post(&self.config.endpoint)
            .query(&query)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(wav);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranscribeError::Status(status.as_u16()));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Parse(e.to_string()))?;

        log::debug!("transcriber: received {} chars", body.text.len());
        Ok(body.text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one request with `status` and `body`; returns the
    /// endpoint URL and a handle yielding the raw request head.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read the head, then the body announced by Content-Length.
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "client closed early");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            head
        });

        (format!("http://{addr}/transcribe"), handle)
    }

    fn transcriber(endpoint: String, api_key: Option<&str>) -> HttpTranscriber {
        HttpTranscriber::from_config(&TranscriptionConfig {
            endpoint,
            api_key: api_key.map(str::to_string),
            model: Some("base".into()),
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn returns_text_from_json() {
        let (url, server) = serve_once("200 OK", r#"{"text":"Play the video"}"#).await;
        let text = transcriber(url, Some("sk-test"))
            .transcribe(vec![1, 2, 3, 4], "en-US")
            .await
            .unwrap();
        assert_eq!(text, "Play the video");

        let head = server.await.unwrap().to_lowercase();
        assert!(head.starts_with("post /transcribe?language=en-us&model=base "));
        assert!(head.contains("authorization: bearer sk-test"));
        assert!(head.contains("content-type: audio/wav"));
    }

    #[tokio::test]
    async fn empty_api_key_sends_no_auth_header() {
        let (url, server) = serve_once("200 OK", r#"{"text":"pause"}"#).await;
        transcriber(url, Some(""))
            .transcribe(vec![0; 8], "ja")
            .await
            .unwrap();
        assert!(!server.await.unwrap().to_lowercase().contains("authorization"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = transcriber(url, None)
            .transcribe(vec![0; 8], "en-US")
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::Status(503));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let (url, _server) = serve_once("200 OK", r#"{"transcript":"play"}"#).await;
        let err = transcriber(url, None)
            .transcribe(vec![0; 8], "en-US")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::Parse(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        // Bind then drop to get a port nothing listens on.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let err = transcriber(format!("http://{addr}/transcribe"), None)
            .transcribe(vec![0; 8], "en-US")
            .await
            .unwrap_err();
        assert!(err.is_network(), "{err:?}");
    }

    #[test]
    fn failures_map_to_session_codes() {
        assert_eq!(TranscribeError::Timeout.code(), ErrorCode::Network);
        assert_eq!(
            TranscribeError::Request("connection refused".into()).code(),
            ErrorCode::Network
        );
        assert_eq!(
            TranscribeError::Status(500).code(),
            ErrorCode::Other("transcription-failed".into())
        );
        let encode: TranscribeError = hound::Error::Unsupported.into();
        assert_eq!(encode.code(), ErrorCode::Other("audio-encoding".into()));
    }

    #[test]
    fn transcriber_is_object_safe() {
        let t: Box<dyn Transcriber> = Box::new(transcriber("http://localhost".into(), None));
        drop(t);
    }
}
