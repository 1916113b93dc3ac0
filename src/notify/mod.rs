pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

pub use telegram::TelegramNotifier;

/// Destination for the preformatted digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Dry-run sink: writes the digest to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        info!("Digest (dry run):\n{}", text);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
