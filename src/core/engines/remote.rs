// src/core/engines/remote.rs
//! HTTP adapters for engine sidecars running on the same host. Images are
//! passed by path, so the sidecar must see the artifact directory.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EngineError, FaceComparator, FaceComparison, OcrEngine, OcrToken, NO_DETECTION};

#[derive(Debug, Serialize)]
struct CompareRequest<'a> {
    img1_path: &'a str,
    img2_path: &'a str,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    image_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Tesseract-style `image_to_data` dictionary.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: Vec<String>,
    conf: Vec<RawConfidence>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawConfidence {
    Number(f64),
    Text(String),
}

impl RawConfidence {
    fn value(&self) -> f64 {
        match self {
            RawConfidence::Number(n) => *n,
            RawConfidence::Text(s) => s.trim().parse().unwrap_or(NO_DETECTION),
        }
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EngineError::Transport(e.to_string()))
}

fn path_str(path: &Path) -> Result<&str, EngineError> {
    path.to_str()
        .ok_or_else(|| EngineError::InvalidResponse(format!("non UTF-8 path {}", path.display())))
}

async fn post_json<B, R>(client: &reqwest::Client, url: &str, body: &B) -> Result<R, EngineError>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                EngineError::Transport(format!("timed out calling {}", url))
            } else {
                EngineError::Transport(e.to_string())
            }
        })?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("engine returned {}", status));
        debug!("Engine at {} rejected request: {}", url, message);
        return Err(EngineError::Rejected(message));
    }

    serde_json::from_slice(&bytes).map_err(|e| EngineError::InvalidResponse(e.to_string()))
}

pub struct RemoteFaceComparator {
    client: reqwest::Client,
    url: String,
}

impl RemoteFaceComparator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FaceComparator for RemoteFaceComparator {
    async fn compare(&self, first: &Path, second: &Path) -> Result<FaceComparison, EngineError> {
        let request = CompareRequest {
            img1_path: path_str(first)?,
            img2_path: path_str(second)?,
        };
        let comparison: FaceComparison = post_json(&self.client, &self.url, &request).await?;
        if !comparison.distance.is_finite() || comparison.distance < 0.0 {
            return Err(EngineError::InvalidResponse(format!(
                "distance {} out of range",
                comparison.distance
            )));
        }
        Ok(comparison)
    }
}

pub struct RemoteOcrEngine {
    client: reqwest::Client,
    url: String,
}

impl RemoteOcrEngine {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    async fn recognize(&self, image: &Path) -> Result<Vec<OcrToken>, EngineError> {
        let request = RecognizeRequest {
            image_path: path_str(image)?,
        };
        let response: RecognizeResponse = post_json(&self.client, &self.url, &request).await?;
        tokens_from_response(response)
    }
}

fn tokens_from_response(response: RecognizeResponse) -> Result<Vec<OcrToken>, EngineError> {
    if response.text.len() != response.conf.len() {
        return Err(EngineError::InvalidResponse(format!(
            "{} texts but {} confidences",
            response.text.len(),
            response.conf.len()
        )));
    }

    Ok(response
        .text
        .into_iter()
        .zip(response.conf.iter())
        .map(|(text, conf)| OcrToken::new(text, conf.value()))
        .collect())
}
