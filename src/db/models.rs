use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A scheduled game as listed by the odds provider's events endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
}

/// Bookmaker quotes for a single event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOdds {
    pub id: String,
    pub sport_key: String,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    pub commence_time: DateTime<Utc>,
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmaker {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub markets: Vec<BookMarket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMarket {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

/// One quoted outcome. For player props `name` is the side ("Over"/"Under"/"Yes")
/// and `description` is the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// American price. Non-integral prices are dropped during normalization.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default)]
    pub point: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_f64()))
}

impl Outcome {
    /// The price as American odds, if it is a whole number.
    pub fn american_price(&self) -> Option<i32> {
        let p = self.price?;
        if p.is_finite() && p.fract() == 0.0 && p.abs() < i32::MAX as f64 {
            Some(p as i32)
        } else {
            None
        }
    }
}

/// A normalized outcome ready for filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub sport: String,
    pub event_id: String,
    /// "Away @ Home"
    pub event: String,
    pub commence_time: DateTime<Utc>,
    pub market: String,
    /// Player (props) or team (game lines)
    pub participant: String,
    pub side: String,
    pub line: Option<f64>,
    /// Prices at the configured target books, keyed by book
    pub target_odds_by_book: BTreeMap<String, i32>,
    /// Consensus fair probability across every book in the payload
    pub p_model: Option<f64>,
    /// Number of probabilities feeding the consensus
    pub books_count: usize,
    /// NHL starting-goalie confirmation; nothing populates this yet
    pub goalie_confirmed: Option<bool>,
}

impl Candidate {
    pub fn is_over_under(&self) -> bool {
        self.side == "Over" || self.side == "Under"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Sharp,
    Lotto,
}

/// A candidate priced at a specific target book that cleared a tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pick {
    pub candidate: Candidate,
    pub tier: Tier,
    pub book: String,
    pub target_odds: i32,
    pub ev: f64,
    pub edge: f64,
    /// Capped Kelly fraction of bankroll
    pub kelly_frac: f64,
    pub verified: bool,
}

impl Pick {
    pub fn p_model(&self) -> f64 {
        self.candidate.p_model.unwrap_or(0.0)
    }

    /// Key for the recently-sent store.
    pub fn cooldown_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.candidate.event,
            self.candidate.participant,
            self.candidate.market,
            self.candidate.side,
            self.target_odds
        )
    }
}

/// Multi-leg combination of picks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parlay {
    pub legs: Vec<Pick>,
    pub dec_odds: f64,
}

impl Parlay {
    pub fn cooldown_key(&self, prefix: &str) -> String {
        let legs: Vec<String> = self.legs.iter().map(Pick::cooldown_key).collect();
        format!("{}#{}", prefix, legs.join("+"))
    }
}

/// Per-cycle counters of why candidates were dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockedCounts {
    pub gate: u32,
    pub missing: u32,
    pub window: u32,
    pub books: u32,
    pub cap: u32,
    pub tier: u32,
    pub live_skip: u32,
    pub api_fail: u32,
    pub verify: u32,
}

impl BlockedCounts {
    pub fn add(&mut self, other: &BlockedCounts) {
        self.gate += other.gate;
        self.missing += other.missing;
        self.window += other.window;
        self.books += other.books;
        self.cap += other.cap;
        self.tier += other.tier;
        self.live_skip += other.live_skip;
        self.api_fail += other.api_fail;
        self.verify += other.verify;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApiUsage {
    pub event_calls: u32,
    pub odds_calls: u32,
    pub today_used: u32,
}
