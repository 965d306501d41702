use gloo_net::http::Request;
use intake::{AnalysisService, DetectionError};
use shared::{AnalysisRequest, AnalysisResponse};

/// Posts analysis requests as JSON to the configured endpoint.
pub struct HttpAnalysisService {
    endpoint: String,
}

impl HttpAnalysisService {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

fn browser_offline() -> bool {
    web_sys::window().is_some_and(|w| !w.navigator().on_line())
}

impl AnalysisService for HttpAnalysisService {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, DetectionError> {
        if browser_offline() {
            return Err(DetectionError::NetworkUnavailable("browser is offline".into()));
        }

        let response = Request::post(&self.endpoint)
            .json(request)
            .map_err(|e| DetectionError::service(None, format!("Failed to build request: {}", e)))?
            .send()
            .await
            .map_err(|e| DetectionError::NetworkUnavailable(e.to_string()))?;

        let status = response.status();
        if !response.ok() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Analysis service answered {}: {}", status, body);
            return Err(DetectionError::service(
                Some(status),
                format!("Server error: {} - {}", status, body),
            ));
        }

        response
            .json::<AnalysisResponse>()
            .await
            .map_err(|e| DetectionError::service(Some(status), format!("Failed to parse response: {}", e)))
    }
}
