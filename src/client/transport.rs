//! # Submission Transport
//!
//! Sends one [`Submission`] to the gateway and returns whatever came back.
//! The transport does not interpret the response; that is the client's job.

use crate::report::AnalysisResponse;
use crate::submission::{Submission, AUDIO_FIELD, AUDIO_FILENAME, AUDIO_MIME, REFERENCE_FIELD};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// A response was received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub status: u16,
    /// `None` when the body was not a recognisable response document.
    pub body: Option<AnalysisResponse>,
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug)]
pub enum TransportError {
    /// The request could not be built (bad endpoint, bad MIME type).
    Request(String),
    /// Connection refused, DNS failure, timeout, reset.
    Connect(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "could not build request: {}", msg),
            TransportError::Connect(msg) => write!(f, "could not reach gateway: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Send one submission. Called at most once per recording.
    async fn send(&self, submission: Submission) -> Result<GatewayReply, TransportError>;
}

/// Multipart POST over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// `endpoint` is the full URL of the analysis route,
    /// e.g. `http://127.0.0.1:8080/analyze-tajweed`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("recite/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn send(&self, submission: Submission) -> Result<GatewayReply, TransportError> {
        let (reference, audio) = submission.into_parts();
        let audio_len = audio.len();

        let part = reqwest::multipart::Part::bytes(audio)
            .file_name(AUDIO_FILENAME)
            .mime_str(AUDIO_MIME)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text(REFERENCE_FIELD, reference.into_string())
            .part(AUDIO_FIELD, part);

        debug!(endpoint = %self.endpoint, audio_bytes = audio_len, "Posting submission");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    TransportError::Request(e.to_string())
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        // A reply arrived; a body we can't read or parse is still a reply.
        let body = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<AnalysisResponse>(&bytes).ok(),
            Err(_) => None,
        };

        info!(status, parsed = body.is_some(), "Gateway replied");
        Ok(GatewayReply { status, body })
    }
}
