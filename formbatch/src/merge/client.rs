//! HTTP transport for the merge service.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use super::response::{MergeResponse, NON_TEXT_PREVIEW};
use super::{MergePayload, MergeService, MergedDocument};
use crate::config::Config;
use crate::error::{FormBatchError, Result};

/// Path of the merge operation relative to the service base URL.
pub const MERGE_PATH: &str = "/merge";

/// Full merge URL for a base URL, ignoring trailing slashes on the base.
pub fn merge_endpoint(base_url: &str) -> String {
    format!("{}{MERGE_PATH}", base_url.trim().trim_end_matches('/'))
}

/// Name suggested to the service for the merged file.
pub fn output_name(now: DateTime<FixedOffset>) -> String {
    format!("Merged_{}.pdf", now.format("%Y%m%d_%H%M%S"))
}

/// [`MergeService`] calling `POST {base}/merge` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMergeClient {
    client: Client,
    endpoint: String,
    config: Config,
}

impl HttpMergeClient {
    /// Builds a client for the configured service.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| {
                FormBatchError::invalid_config(format!("cannot build HTTP client: {err}"))
            })?;

        Ok(Self {
            client,
            endpoint: merge_endpoint(&config.merge_service_url),
            config: config.clone(),
        })
    }

    /// URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MergeService for HttpMergeClient {
    async fn merge(&self, payload: &MergePayload) -> Result<MergedDocument> {
        let request = payload.to_request(output_name(self.config.now()));
        tracing::debug!(
            endpoint = %self.endpoint,
            files = payload.len(),
            bytes = payload.total_bytes(),
            output = %request.output_name,
            "sending merge request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, application/pdf")
            .json(&request)
            .send()
            .await
            .map_err(|err| FormBatchError::MergeUnreachable {
                reason: err.to_string(),
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        tracing::info!(status, content_type = %content_type, "merge response");

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) if (200..300).contains(&status) => {
                return Err(FormBatchError::MergeParse {
                    reason: err.to_string(),
                });
            }
            Err(_) => {
                return Err(FormBatchError::MergeHttp {
                    status,
                    preview: NON_TEXT_PREVIEW.to_string(),
                });
            }
        };

        MergeResponse::classify(status, &content_type, &body)?.into_document()
    }
}
