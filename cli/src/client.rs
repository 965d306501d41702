use std::future::Future;
use std::time::Duration;

use intake::{AnalysisService, DetectionError, Timer};
use reqwest::Client as HttpClient;
use shared::{AnalysisRequest, AnalysisResponse};
use url::Url;

/// Analysis service reached over HTTP with a JSON body.
#[derive(Clone)]
pub struct ReqwestAnalysisService {
    http_client: HttpClient,
    endpoint: Url,
}

impl ReqwestAnalysisService {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolves a configured endpoint, which may be a path, against a base URL.
pub fn resolve_endpoint(base: &str, endpoint: &str) -> Result<Url, url::ParseError> {
    match Url::parse(endpoint) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)?.join(endpoint),
        Err(e) => Err(e),
    }
}

fn classify(err: reqwest::Error) -> DetectionError {
    if err.is_connect() || err.is_request() {
        DetectionError::NetworkUnavailable(err.to_string())
    } else {
        DetectionError::service(err.status().map(|s| s.as_u16()), err.to_string())
    }
}

impl AnalysisService for ReqwestAnalysisService {
    async fn submit(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, DetectionError> {
        log::debug!("POST {} ({})", self.endpoint, request.mime_type);
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectionError::service(
                Some(status.as_u16()),
                format!("Server error: {} - {}", status, body),
            ));
        }

        response.json::<AnalysisResponse>().await.map_err(|e| {
            DetectionError::service(Some(status.as_u16()), format!("Failed to parse response: {}", e))
        })
    }
}

pub struct TokioTimer;

impl Timer for TokioTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_endpoint_joins_base() {
        let url = resolve_endpoint("http://localhost:8080", "/api/analyze").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/analyze");
    }

    #[test]
    fn absolute_endpoint_ignores_base() {
        let url = resolve_endpoint("http://localhost:8080", "https://screening.test/v1/analyze").unwrap();
        assert_eq!(url.host_str(), Some("screening.test"));
    }

    #[test]
    fn bad_base_is_reported() {
        assert!(resolve_endpoint("not a url", "/api/analyze").is_err());
    }
}
