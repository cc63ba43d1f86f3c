use crate::api::{HealthResponse, MathRequest, MathResponse};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::math::Operation;
use std::time::Duration;

/// Typed client for a running math service.
#[derive(Clone)]
pub struct MathClient {
    http: HttpClient,
    base_url: String,
}

impl MathClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self> {
        let http = HttpClient::new(
            concat!("mathapi/", env!("CARGO_PKG_VERSION")),
            timeout,
            max_retries,
        )?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn evaluate(
        &self,
        op: Operation,
        operand1: f64,
        operand2: f64,
    ) -> Result<MathResponse> {
        let url = format!("{}/api/math/{}", self.base_url, op.route());
        let request = MathRequest { operand1, operand2 };
        self.http.post_json(&url, &request).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.http
            .get_json(&format!("{}/health", self.base_url))
            .await
    }
}
