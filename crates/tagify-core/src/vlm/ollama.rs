//! Ollama VLM backend for local vision model inference.
//!
//! Talks to an Ollama instance via its `/api/chat` endpoint.
//! No authentication required, just needs Ollama running with a vision model
//! such as `llava` pulled.

use super::client::VlmClient;
use super::text::trim_indent;
use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::types::UploadedImage;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::io;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Bytes read from the image per body chunk. A multiple of 3, so every
/// chunk but the last encodes to base64 without padding.
const READ_CHUNK_SIZE: usize = 48 * 1024;

/// Closes the `images` array, the message, the `messages` array and the request.
const BODY_SUFFIX: &str = "\"]}]}";

/// Ollama client for a single configured vision model.
pub struct OllamaClient {
    endpoint: String,
    model: String,
    json_mode: bool,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(endpoint: &str, config: &ModelConfig) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            json_mode: config.json_mode,
            timeout: Duration::from_millis(config.timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    /// Everything in the /api/chat request body up to the image's base64 text.
    ///
    /// The request is one user turn whose `images` array holds the image. Ollama
    /// images carry no media type; the model sniffs the format.
    fn body_prefix(&self, instruction: &str) -> Result<String, PipelineError> {
        let quote = |value: &str| {
            serde_json::to_string(value)
                .map_err(|e| PipelineError::invocation(format!("Failed to encode request: {e}")))
        };
        let format = if self.json_mode {
            "\"format\":\"json\","
        } else {
            ""
        };
        Ok(format!(
            "{{\"model\":{},\"stream\":false,{format}\"messages\":[{{\"role\":\"user\",\"content\":{},\"images\":[\"",
            quote(&self.model)?,
            quote(instruction)?,
        ))
    }
}

/// Ollama /api/chat response.
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

type ImageReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

/// Reader plus the bytes held back until a multiple of 3 is available.
struct EncodeState {
    reader: ImageReader,
    pending: Vec<u8>,
    done: bool,
}

/// Base64-encode the image as it is read, one bounded chunk at a time.
async fn next_encoded_chunk(mut state: EncodeState) -> io::Result<Option<(Vec<u8>, EncodeState)>> {
    if state.done {
        return Ok(None);
    }

    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = state.reader.read(&mut chunk).await?;
        if n == 0 {
            // End of image: flush the remainder with padding
            state.done = true;
            if state.pending.is_empty() {
                return Ok(None);
            }
            let encoded = STANDARD.encode(&state.pending).into_bytes();
            state.pending.clear();
            return Ok(Some((encoded, state)));
        }

        state.pending.extend_from_slice(&chunk[..n]);
        let whole = state.pending.len() - state.pending.len() % 3;
        if whole > 0 {
            let encoded = STANDARD.encode(&state.pending[..whole]).into_bytes();
            state.pending.drain(..whole);
            return Ok(Some((encoded, state)));
        }
    }
}

/// The full request body as a stream: JSON prefix, base64 image, JSON suffix.
///
/// Neither the raw image nor its base64 text is ever held in full.
fn request_body(
    prefix: String,
    image: UploadedImage,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
    let state = EncodeState {
        reader: image.into_stream(),
        pending: Vec::with_capacity(2),
        done: false,
    };

    stream::once(async move { Ok::<_, io::Error>(prefix.into_bytes()) })
        .chain(stream::try_unfold(state, next_encoded_chunk))
        .chain(stream::once(async { Ok(BODY_SUFFIX.as_bytes().to_vec()) }))
}

#[async_trait]
impl VlmClient for OllamaClient {
    async fn invoke(
        &self,
        image: UploadedImage,
        instruction: &str,
    ) -> Result<String, PipelineError> {
        let url = format!("{}/api/chat", self.endpoint);

        tracing::debug!(
            model = %self.model,
            filename = image.filename().unwrap_or("<unnamed>"),
            declared_bytes = image.size(),
            "Sending image to Ollama"
        );

        let body = request_body(self.body_prefix(instruction)?, image);

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(reqwest::Body::wrap_stream(body))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::invocation(format!("Ollama request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::ModelInvocation {
                message: format!("Ollama HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let chat: ChatResponse = resp.json().await.map_err(|e| {
            PipelineError::invocation(format!("Failed to parse Ollama response: {e}"))
        })?;

        let content = chat
            .message
            .map(|m| m.content)
            .ok_or_else(|| PipelineError::invocation("Ollama response has no message"))?;

        let text = trim_indent(&content);
        if text.is_empty() {
            return Err(PipelineError::invocation(
                "Ollama returned empty response: no content generated",
            ));
        }

        tracing::debug!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "Ollama responded"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accept one connection, capture the request body, reply with `status` and `body`.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 8192];

            // Read headers, then the body: Content-Length bytes, or chunks
            // up to the terminating zero-size chunk
            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let chunked = headers.contains("transfer-encoding: chunked");
            let content_length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            loop {
                let complete = if chunked {
                    request[header_end..].ends_with(b"0\r\n\r\n")
                } else {
                    request.len() >= header_end + content_length
                };
                if complete {
                    break;
                }
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let body_bytes = if chunked {
                dechunk(&request[header_end..])
            } else {
                request[header_end..].to_vec()
            };

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&body_bytes).into_owned()
        });

        (endpoint, handle)
    }

    /// Decode an HTTP/1.1 chunked body.
    fn dechunk(mut raw: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        loop {
            let line_end = raw.windows(2).position(|w| w == b"\r\n").unwrap();
            let size_line = std::str::from_utf8(&raw[..line_end]).unwrap();
            let size_hex = size_line.split(';').next().unwrap().trim();
            let size = usize::from_str_radix(size_hex, 16).unwrap();
            if size == 0 {
                return body;
            }
            let data_start = line_end + 2;
            body.extend_from_slice(&raw[data_start..data_start + size]);
            raw = &raw[data_start + size + 2..];
        }
    }

    async fn collect_body(prefix: &str, image: UploadedImage) -> Vec<Vec<u8>> {
        request_body(prefix.to_string(), image)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await
    }

    fn client(endpoint: &str) -> OllamaClient {
        OllamaClient::new(endpoint, &ModelConfig::default())
    }

    fn jpeg() -> UploadedImage {
        UploadedImage::from_bytes(b"test".to_vec(), "image/jpeg").with_filename("test.jpg")
    }

    #[tokio::test]
    async fn test_invoke_returns_trimmed_content() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"message":{"role":"assistant","content":"\n   {\"1\":\"tag1\",\"2\":\"tag2\",\"3\":\"tag3\"}\n"},"done":true}"#,
        )
        .await;

        let text = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap();
        assert_eq!(text, r#"{"1":"tag1","2":"tag2","3":"tag3"}"#);

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["model"], "llava");
        assert_eq!(request["stream"], false);
        assert_eq!(request["format"], "json");
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(request["messages"][0]["content"], "list tags");
        // base64("test")
        assert_eq!(request["messages"][0]["images"][0], "dGVzdA==");
    }

    #[tokio::test]
    async fn test_json_mode_off_omits_format() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"message":{"content":"{}"}}"#).await;
        let config = ModelConfig {
            json_mode: false,
            ..ModelConfig::default()
        };

        OllamaClient::new(&endpoint, &config)
            .invoke(jpeg(), "list tags")
            .await
            .unwrap();

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert!(request.get("format").is_none());
    }

    #[tokio::test]
    async fn test_http_error_carries_status() {
        let (endpoint, _server) =
            serve_once("404 Not Found", r#"{"error":"model 'llava' not found"}"#).await;

        let err = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap_err();
        match err {
            PipelineError::ModelInvocation {
                status_code,
                message,
            } => {
                assert_eq!(status_code, Some(404));
                assert!(message.contains("not found"));
            }
            other => panic!("Expected ModelInvocation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_message_is_invocation_error() {
        let (endpoint, _server) = serve_once("200 OK", r#"{"done":true}"#).await;
        let err = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelInvocation { .. }));
    }

    #[tokio::test]
    async fn test_garbage_envelope_is_invocation_error() {
        let (endpoint, _server) = serve_once("200 OK", "not json").await;
        let err = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap_err();
        assert!(matches!(err, PipelineError::ModelInvocation { .. }));
    }

    #[tokio::test]
    async fn test_blank_content_is_invocation_error() {
        let (endpoint, _server) =
            serve_once("200 OK", r#"{"message":{"content":"  \n  "}}"#).await;
        let err = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        // Grab a free port, then close it so the connect is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&endpoint).invoke(jpeg(), "list tags").await.unwrap_err();
        match err {
            PipelineError::ModelInvocation { status_code, .. } => assert_eq!(status_code, None),
            other => panic!("Expected ModelInvocation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_invocation_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        // Accept but never answer
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let config = ModelConfig {
            timeout_ms: 200,
            ..ModelConfig::default()
        };
        let err = OllamaClient::new(&endpoint, &config)
            .invoke(jpeg(), "list tags")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelInvocation { .. }));
    }

    #[tokio::test]
    async fn test_request_body_streams_image_in_bounded_chunks() {
        let bytes: Vec<u8> = (0..(READ_CHUNK_SIZE * 2 + 17)).map(|i| i as u8).collect();
        let expected = STANDARD.encode(&bytes);
        let image = UploadedImage::from_bytes(bytes, "image/png");

        let chunks = collect_body("[\"", image).await;
        assert_eq!(chunks.first().unwrap(), b"[\"");
        assert_eq!(chunks.last().unwrap(), BODY_SUFFIX.as_bytes());

        let image_chunks = &chunks[1..chunks.len() - 1];
        assert!(image_chunks.len() >= 3, "got {} chunks", image_chunks.len());
        let max_encoded = READ_CHUNK_SIZE / 3 * 4 + 4;
        for chunk in image_chunks {
            assert!(chunk.len() <= max_encoded, "chunk of {} bytes", chunk.len());
        }

        let encoded: Vec<u8> = image_chunks.concat();
        assert_eq!(String::from_utf8(encoded).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_request_body_is_valid_json() {
        let client = client("http://localhost:11434");
        let instruction = "Say \"hi\"\n\tthen list tags";
        let prefix = client.body_prefix(instruction).unwrap();
        let image = UploadedImage::from_bytes(b"hello".to_vec(), "image/jpeg");

        let body = collect_body(&prefix, image).await.concat();
        let request: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(request["model"], "llava");
        assert_eq!(request["format"], "json");
        assert_eq!(request["messages"][0]["content"], instruction);
        assert_eq!(request["messages"][0]["images"][0], STANDARD.encode(b"hello"));
        assert_eq!(request["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_body_empty_image() {
        let image = UploadedImage::from_bytes(Vec::<u8>::new(), "image/jpeg");
        let chunks = collect_body("[\"", image).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat(), b"[\"\"]}]}".to_vec());
    }

    #[tokio::test]
    async fn test_invoke_sends_large_image_whole() {
        let (endpoint, server) = serve_once("200 OK", r#"{"message":{"content":"{}"}}"#).await;
        let bytes: Vec<u8> = (0..(READ_CHUNK_SIZE * 3 + 1)).map(|i| (i * 7) as u8).collect();
        let expected = STANDARD.encode(&bytes);

        client(&endpoint)
            .invoke(UploadedImage::from_bytes(bytes, "image/png"), "list tags")
            .await
            .unwrap();

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["messages"][0]["images"][0], expected);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = client("http://localhost:11434/");
        assert_eq!(client.endpoint, "http://localhost:11434");
        assert_eq!(client.model, "llava");
    }
}
