//! Image capture and single-exchange analysis requests.
//!
//! Frames come from a camera seam ([`FrameSource`]) or a user-selected file,
//! get encoded as base64 data URLs, and are posted to the backend's
//! `/analyze_image` endpoint. Each call is one best-effort request/response
//! exchange — failures become transcript entries, never retries.

use crate::error::{ClientError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A live camera stream handle.
///
/// The stream must not outlive the single-frame capture: implementations
/// release the underlying device in `Drop`, so every exit path — including
/// capture failure — tears it down.
pub trait FrameStream {
    /// Grab one still frame as encoded JPEG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be captured.
    fn capture_jpeg(&mut self) -> Result<Vec<u8>>;
}

/// Camera acquisition seam.
pub trait FrameSource {
    /// Open the camera and return a live stream handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the camera is unavailable or access is denied.
    fn open(&mut self) -> Result<Box<dyn FrameStream>>;
}

/// Acquire a camera stream, wait for exposure to settle, capture one frame,
/// and return it as a data URL. The stream is released before returning on
/// every path.
///
/// # Errors
///
/// Returns an error if acquisition or capture fails.
pub async fn capture_from_camera<S: FrameSource>(
    source: &mut S,
    settle_delay: Duration,
) -> Result<String> {
    let mut stream = source.open()?;
    // Give auto-exposure and focus time to stabilize before grabbing.
    tokio::time::sleep(settle_delay).await;
    let jpeg = stream.capture_jpeg()?;
    drop(stream);
    Ok(encode_data_url(&jpeg, "image/jpeg"))
}

/// Encode a user-selected file as a data URL, guessing the media type from
/// its extension.
#[must_use]
pub fn encode_upload(file_name: &str, bytes: &[u8]) -> String {
    let media_type = match file_name.rsplit('.').next() {
        Some("png") | Some("PNG") => "image/png",
        Some("gif") | Some("GIF") => "image/gif",
        Some("webp") | Some("WEBP") => "image/webp",
        _ => "image/jpeg",
    };
    encode_data_url(bytes, media_type)
}

/// Base64 data-URL encoding shared by camera and upload paths.
#[must_use]
pub fn encode_data_url(bytes: &[u8], media_type: &str) -> String {
    format!(
        "data:{media_type};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Outcome of one analysis exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The backend produced an answer.
    Answer(String),
    /// The backend returned an error payload.
    Rejected(String),
    /// The exchange itself failed (network, non-JSON response, ...).
    Transport(String),
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    image: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the `/analyze_image` exchange.
pub struct AnalysisClient {
    client: reqwest::Client,
    endpoint: String,
}

impl AnalysisClient {
    /// Create a client for the given endpoint URL.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Issue exactly one analysis exchange; never retries.
    pub async fn analyze(&self, image_data: &str, prompt: &str) -> AnalysisOutcome {
        match self.request(image_data, prompt).await {
            Ok(outcome) => outcome,
            Err(e) => AnalysisOutcome::Transport(e.to_string()),
        }
    }

    async fn request(&self, image_data: &str, prompt: &str) -> Result<AnalysisOutcome> {
        debug!("posting image for analysis ({} bytes)", image_data.len());
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest {
                image: image_data,
                message: prompt,
            })
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if let Some(answer) = body.response {
            Ok(AnalysisOutcome::Answer(answer))
        } else if let Some(error) = body.error {
            Ok(AnalysisOutcome::Rejected(error))
        } else {
            Err(ClientError::Protocol(
                "analysis response carried neither a result nor an error".into(),
            ))
        }
    }
}
