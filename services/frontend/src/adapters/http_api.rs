//! services/frontend/src/adapters/http_api.rs
//!
//! This module contains the adapter for the detection backend's REST API.
//! It implements the `DetectionApi` port from the `core` crate with `reqwest`.

use async_trait::async_trait;
use leafscan_core::ports::{ApiReply, DetectionApi, ImageUpload, PortError, PortResult};
use leafscan_core::SessionToken;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Bearer-authenticated client for `{base}/detections` and `{base}/articles`.
#[derive(Clone)]
pub struct HttpDetectionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetectionApi {
    /// Creates a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> PortResult<ApiReply> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        debug!(status, body_len = body.len(), "Backend replied");
        Ok(ApiReply { status, body })
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Network(format!("request timed out: {}", e))
    } else if e.is_builder() {
        PortError::Unexpected(e.to_string())
    } else {
        PortError::Network(e.to_string())
    }
}

//=========================================================================================
// `DetectionApi` Trait Implementation
//=========================================================================================

#[async_trait]
impl DetectionApi for HttpDetectionApi {
    async fn upload_image(
        &self,
        token: &SessionToken,
        upload: ImageUpload,
    ) -> PortResult<ApiReply> {
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = Form::new().part(upload.field, part);

        let request = self
            .client
            .post(self.url("/detections"))
            .bearer_auth(token.as_str())
            .multipart(form);
        self.send(request).await
    }

    async fn fetch_history(&self, token: &SessionToken) -> PortResult<ApiReply> {
        let request = self
            .client
            .get(self.url("/detections/history"))
            .bearer_auth(token.as_str());
        self.send(request).await
    }

    async fn fetch_article(&self, token: &SessionToken, slug: &str) -> PortResult<ApiReply> {
        let request = self
            .client
            .get(self.url(&format!("/articles/{}", slug)))
            .bearer_auth(token.as_str());
        self.send(request).await
    }
}
