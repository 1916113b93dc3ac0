use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::{Event, EventOdds};

/// Anything that can list a sport's events and quote an event's markets.
#[async_trait]
pub trait OddsSource: Send + Sync {
    /// Upcoming (and in-progress) events for a sport key.
    async fn events(&self, sport: &str) -> Result<Vec<Event>>;

    /// Multi-book quotes for one event. `markets` is a comma-separated list.
    async fn event_odds(&self, sport: &str, event_id: &str, markets: &str) -> Result<EventOdds>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
