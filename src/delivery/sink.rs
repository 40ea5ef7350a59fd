use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The sink refused the message markup. Retrying would fail the same way.
    #[error("message cannot be rendered: {0}")]
    Unrenderable(String),

    #[error("{0}")]
    Transport(String),
}

/// Where formatted articles and run alerts go.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError>;

    /// Out-of-band notice to the administrator.
    async fn alert(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Dry-run sink: logs what would have been sent.
pub struct LogSink;

#[async_trait]
impl DeliverySink for LogSink {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        tracing::info!("Would deliver:\n{}", message);
        Ok(())
    }

    async fn alert(&self, message: &str) -> Result<(), DeliveryError> {
        tracing::warn!("Would alert admin: {}", message);
        Ok(())
    }
}
