//! Best-effort usage log
//!
//! Records one small JSON document per successful analysis in an external
//! S3-compatible store. Writes run detached from the request and their
//! failures are only logged.

pub mod client;
pub mod mock;

pub use client::S3UsageStore;
pub use mock::MockUsageStore;

use crate::models::UsageRecord;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Persist one record; returns the key it was written under.
    async fn record(&self, record: &UsageRecord) -> Result<String>;
    /// Check connectivity; returns a human-readable status line.
    async fn ping(&self) -> Result<String>;
}

/// Spawn the write so it never delays or fails the caller.
pub fn record_in_background(store: Arc<dyn UsageStore>, record: UsageRecord) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.record(&record).await {
            Ok(key) => tracing::debug!("Usage record written to {}", key),
            Err(e) => tracing::warn!("Failed to write usage record: {}", e),
        }
    })
}
