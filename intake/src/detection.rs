use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::{self, Either};
use futures::pin_mut;
use log::{debug, warn};
use serde::Serialize;
use shared::{AnalysisRequest, AnalysisResponse, MediaType};

use crate::error::DetectionError;

/// Image bytes submitted for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisPayload {
    pub bytes: Arc<[u8]>,
    pub media_type: MediaType,
}

impl AnalysisPayload {
    pub fn to_request(&self) -> AnalysisRequest {
        AnalysisRequest {
            image_data: STANDARD.encode(&self.bytes),
            mime_type: self.media_type.mime().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub condition_label: String,
    /// Always within `0.0..=100.0`.
    pub confidence_percent: f32,
    pub severity: Option<String>,
}

impl TryFrom<AnalysisResponse> for DetectionResult {
    type Error = DetectionError;

    fn try_from(response: AnalysisResponse) -> Result<Self, Self::Error> {
        let label = response.condition_label.trim();
        if label.is_empty() {
            return Err(DetectionError::service(None, "response has no condition label"));
        }
        let confidence = response.confidence_percent;
        if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
            return Err(DetectionError::service(
                None,
                format!("confidence {confidence} is outside 0-100"),
            ));
        }
        Ok(DetectionResult {
            condition_label: label.to_string(),
            confidence_percent: confidence,
            severity: response.severity.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Transport to the external analysis service.
#[allow(async_fn_in_trait)]
pub trait AnalysisService {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, DetectionError>;
}

/// Source of delays, supplied by the host runtime.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

pub struct DetectionPipeline<A, T> {
    service: A,
    timer: T,
    timeout: Duration,
}

impl<A: AnalysisService, T: Timer> DetectionPipeline<A, T> {
    pub fn new(service: A, timer: T, timeout: Duration) -> Self {
        Self {
            service,
            timer,
            timeout,
        }
    }

    pub fn service(&self) -> &A {
        &self.service
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Submits one payload. Responses slower than the configured timeout
    /// resolve to [`DetectionError::Timeout`]; the request itself is dropped.
    pub async fn detect(&self, payload: &AnalysisPayload) -> Result<DetectionResult, DetectionError> {
        let request = payload.to_request();
        debug!(
            "Submitting {} bytes of {} for analysis",
            payload.bytes.len(),
            payload.media_type
        );

        let submit = self.service.submit(&request);
        let deadline = self.timer.sleep(self.timeout);
        pin_mut!(submit, deadline);

        let response = match future::select(submit, deadline).await {
            Either::Left((response, _)) => response,
            Either::Right(((), _)) => Err(DetectionError::Timeout(self.timeout)),
        };

        match response.and_then(DetectionResult::try_from) {
            Ok(result) => Ok(result),
            Err(err) => {
                warn!("Detection request failed: {err}");
                Err(err)
            }
        }
    }
}
