pub mod error;
pub mod types;

pub use error::{Result, VoucherVisionError};
pub use types::{ProcessResponse, RequestOptions, API_KEY_HEADER, AUTHORIZATION_HEADER};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use types::UrlRequest;

pub const DEFAULT_BASE_URL: &str = "https://vouchervision-go-738307415303.us-central1.run.app";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct VoucherVisionClient {
    client: reqwest::Client,
    base_url: String,
}

impl VoucherVisionClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Process a remotely hosted image via `/process-url`.
    pub async fn process_url(&self, image_url: &str, options: &RequestOptions) -> Result<Value> {
        let endpoint = format!("{}/process-url", self.base_url);
        let body = UrlRequest::new(image_url, options);
        tracing::debug!(image_url, engines = ?options.engines, "Submitting image URL");

        let resp = self
            .client
            .post(&endpoint)
            .headers(auth_headers(options)?)
            .json(&body)
            .send()
            .await?;

        read_json(resp).await
    }

    /// Upload a local image to `/process` as multipart form data.
    pub async fn process_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        media_type: &str,
        options: &RequestOptions,
    ) -> Result<Value> {
        let endpoint = format!("{}/process", self.base_url);
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(media_type)
            .map_err(|e| VoucherVisionError::InvalidOptions(e.to_string()))?;
        let form = options
            .form_fields()
            .into_iter()
            .fold(Form::new().part("file", part), |form, (key, value)| {
                form.text(key, value)
            });

        tracing::debug!(file_name, size, engines = ?options.engines, "Uploading image file");

        let resp = self
            .client
            .post(&endpoint)
            .headers(auth_headers(options)?)
            .multipart(form)
            .send()
            .await?;

        read_json(resp).await
    }

    /// Hit `/cors-test` to confirm the service is reachable.
    pub async fn cors_test(&self) -> Result<Value> {
        let endpoint = format!("{}/cors-test", self.base_url);
        let resp = self.client.get(&endpoint).send().await?;
        read_json(resp).await
    }
}

fn auth_headers(options: &RequestOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| VoucherVisionError::InvalidOptions(format!("header {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| VoucherVisionError::InvalidOptions(format!("header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

async fn read_json(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            body
        };
        return Err(VoucherVisionError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(resp.json().await?)
}
