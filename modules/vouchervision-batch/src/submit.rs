use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use vouchervision_client::{RequestOptions, VoucherVisionClient};

use crate::record::{ItemSource, WorkItem};

// --- Submitter trait ---

/// Sends one work item to the processing service and returns the decoded
/// response. Any error is recorded against the item by the driver.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, item: &WorkItem, options: &RequestOptions) -> Result<Value>;
}

#[async_trait]
impl Submitter for VoucherVisionClient {
    async fn submit(&self, item: &WorkItem, options: &RequestOptions) -> Result<Value> {
        match &item.source {
            ItemSource::Url(url) => Ok(self.process_url(url, options).await?),
            ItemSource::File(file) => {
                let bytes = tokio::fs::read(&file.path)
                    .await
                    .with_context(|| format!("Failed to read {}", file.path.display()))?;
                Ok(self
                    .process_file(&file.name, bytes, &file.media_type, options)
                    .await?)
            }
        }
    }
}
