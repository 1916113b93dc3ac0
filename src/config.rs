use clap::{ArgAction, Parser};

/// Sports-odds digest bot: no-vig consensus picks posted to Telegram
#[derive(Parser, Debug, Clone)]
#[command(name = "propsharp-bot", version, about)]
pub struct Config {
    /// Log the digest instead of posting it to Telegram
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// SQLite database path (cooldown store)
    #[arg(long, env = "DATABASE_PATH", default_value = "bot.db")]
    pub database_path: String,

    /// Repeat the cycle every N minutes; run once when unset
    #[arg(long, env = "RUN_INTERVAL_MINUTES")]
    pub run_interval_minutes: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "25")]
    pub http_timeout_secs: u64,

    // ── Odds API ──────────────────────────────────────────────────────────────
    /// The Odds API base URL
    #[arg(
        long,
        env = "ODDS_API_URL",
        default_value = "https://api.the-odds-api.com/v4"
    )]
    pub odds_api_url: String,

    /// The Odds API key
    #[arg(long, env = "ODDS_API_KEY", hide_env_values = true)]
    pub odds_api_key: Option<String>,

    /// Bookmaker region(s) to request
    #[arg(long, env = "REGION", default_value = "us")]
    pub region: String,

    /// Books we can actually bet at (comma separated)
    #[arg(
        long,
        env = "TARGET_BOOKS",
        value_delimiter = ',',
        default_value = "draftkings,fanduel,betmgm,fanatics"
    )]
    pub target_books: Vec<String>,

    /// Sport keys to scan (comma separated)
    #[arg(
        long,
        env = "SPORTS",
        value_delimiter = ',',
        default_value = "americanfootball_nfl,basketball_nba,baseball_mlb,icehockey_nhl,soccer_epl,soccer_usa_mls,americanfootball_ncaaf,basketball_ncaab"
    )]
    pub sports: Vec<String>,

    /// Maximum events per sport to pull odds for
    #[arg(long, env = "EVENTS_PER_SPORT", default_value = "6")]
    pub events_per_sport: usize,

    /// Skip games starting within this many minutes
    #[arg(long, env = "PREGAME_BUFFER_MINUTES", default_value = "15")]
    pub pregame_buffer_minutes: i64,

    /// Also evaluate games that already started
    #[arg(long, env = "ALLOW_LIVE", default_value = "false")]
    pub allow_live: bool,

    // ── Telegram ──────────────────────────────────────────────────────────────
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    #[arg(long, env = "TELEGRAM_API_URL", default_value = "https://api.telegram.org")]
    pub telegram_api_url: String,

    // ── Global safety ─────────────────────────────────────────────────────────
    /// Don't resend the same pick within this many minutes
    #[arg(long, env = "COOLDOWN_MINUTES", default_value = "90")]
    pub cooldown_minutes: u64,

    /// Block picks on any quality-gate reason (false: only hard blocks)
    #[arg(long, env = "STRICT_MODE", default_value_t = true, action = ArgAction::Set)]
    pub strict_mode: bool,

    /// Require confirmed starting goalie for NHL picks
    #[arg(long, env = "NHL_REQUIRE_CONFIRMED_GOALIE", default_value = "false")]
    pub nhl_require_confirmed_goalie: bool,

    /// Edges above this are treated as stale lines, not value
    #[arg(long, env = "MAX_EDGE_CAP", default_value = "0.08")]
    pub max_edge_cap: f64,

    #[arg(long, env = "ONE_PICK_PER_GAME", default_value_t = true, action = ArgAction::Set)]
    pub one_pick_per_game: bool,

    /// Target books that must post the exact line/side
    #[arg(long, env = "MIN_TARGET_BOOKS", default_value = "2")]
    pub min_target_books: usize,

    /// Upper bound on the suggested Kelly fraction
    #[arg(long, env = "KELLY_CAP", default_value = "0.02")]
    pub kelly_cap: f64,

    /// Number of near misses listed when there are no picks (0 disables)
    #[arg(long, env = "WATCHLIST_SIZE", default_value = "0")]
    pub watchlist_size: usize,

    // ── Pre-send verification ─────────────────────────────────────────────────
    #[arg(long, env = "VERIFY_BEFORE_SEND", default_value_t = true, action = ArgAction::Set)]
    pub verify_before_send: bool,

    #[arg(long, env = "MAX_VERIFY_EVENTS", default_value = "4")]
    pub max_verify_events: usize,

    /// Drop a pick whose price moved by more than this many American points
    #[arg(long, env = "MAX_ODDS_MOVE_ABS", default_value = "25")]
    pub max_odds_move_abs: i32,

    #[arg(long, env = "LINE_TOLERANCE", default_value = "1.0")]
    pub line_tolerance: f64,

    #[arg(long, env = "NHL_LINE_TOLERANCE", default_value = "0.0")]
    pub nhl_line_tolerance: f64,

    #[arg(long, env = "NHL_SHOTS_UNDER_MIN_BOOKS", default_value = "5")]
    pub nhl_shots_under_min_books: usize,

    // ── Sharp singles ─────────────────────────────────────────────────────────
    #[arg(long, env = "SHARP_MAX_SINGLES", default_value = "2")]
    pub sharp_max_singles: usize,

    #[arg(long, env = "SHARP_MIN_BOOKS", default_value = "4")]
    pub sharp_min_books: usize,

    #[arg(long, env = "SHARP_MIN_P", default_value = "0.53")]
    pub sharp_min_p: f64,

    #[arg(long, env = "SHARP_MIN_EDGE", default_value = "0.014")]
    pub sharp_min_edge: f64,

    #[arg(long, env = "SHARP_MIN_EV", default_value = "0.012")]
    pub sharp_min_ev: f64,

    #[arg(long, env = "SHARP_MIN_ODDS", default_value_t = -220, allow_negative_numbers = true)]
    pub sharp_min_odds: i32,

    #[arg(long, env = "SHARP_MAX_ODDS", default_value_t = 175, allow_negative_numbers = true)]
    pub sharp_max_odds: i32,

    // ── Sharp builder ─────────────────────────────────────────────────────────
    #[arg(long, env = "ENABLE_SHARP_BUILDER", default_value_t = true, action = ArgAction::Set)]
    pub enable_sharp_builder: bool,

    #[arg(long, env = "BUILDER_LEGS", default_value = "3")]
    pub builder_legs: usize,

    #[arg(long, env = "BUILDER_MIN_DEC", default_value = "3.0")]
    pub builder_min_dec: f64,

    #[arg(long, env = "BUILDER_MAX_DEC", default_value = "7.0")]
    pub builder_max_dec: f64,

    // ── Lotto (high variance) ─────────────────────────────────────────────────
    #[arg(long, env = "ENABLE_LOTTO_3LEG", default_value_t = true, action = ArgAction::Set)]
    pub enable_lotto: bool,

    #[arg(long, env = "LOTTO_LEGS", default_value = "3")]
    pub lotto_legs: usize,

    #[arg(long, env = "LOTTO_MIN_ODDS", default_value_t = 110, allow_negative_numbers = true)]
    pub lotto_min_odds: i32,

    #[arg(long, env = "LOTTO_MAX_ODDS", default_value_t = 350, allow_negative_numbers = true)]
    pub lotto_max_odds: i32,

    #[arg(long, env = "LOTTO_MIN_BOOKS", default_value = "4")]
    pub lotto_min_books: usize,

    #[arg(long, env = "LOTTO_MIN_EDGE", default_value = "0.018")]
    pub lotto_min_edge: f64,

    #[arg(long, env = "LOTTO_MIN_EV", default_value = "0.015")]
    pub lotto_min_ev: f64,

    #[arg(long, env = "LOTTO_MAX_TOTAL_DEC", default_value = "18.0")]
    pub lotto_max_total_dec: f64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.odds_api_key.as_deref().map_or(true, str::is_empty) {
            anyhow::bail!("ODDS_API_KEY is required");
        }
        if !self.dry_run {
            if self.telegram_bot_token.is_none() {
                anyhow::bail!("TELEGRAM_BOT_TOKEN is required. Use --dry-run to log the digest instead.");
            }
            if self.telegram_chat_id.is_none() {
                anyhow::bail!("TELEGRAM_CHAT_ID is required. Use --dry-run to log the digest instead.");
            }
        }
        url::Url::parse(&self.odds_api_url)
            .map_err(|e| anyhow::anyhow!("invalid ODDS_API_URL '{}': {}", self.odds_api_url, e))?;
        url::Url::parse(&self.telegram_api_url).map_err(|e| {
            anyhow::anyhow!("invalid TELEGRAM_API_URL '{}': {}", self.telegram_api_url, e)
        })?;
        if self.target_books().is_empty() {
            anyhow::bail!("TARGET_BOOKS must name at least one book");
        }
        if self.sports().is_empty() {
            anyhow::bail!("SPORTS must name at least one sport");
        }
        if self.sharp_min_odds > self.sharp_max_odds {
            anyhow::bail!("sharp_min_odds must not exceed sharp_max_odds");
        }
        if self.lotto_min_odds > self.lotto_max_odds {
            anyhow::bail!("lotto_min_odds must not exceed lotto_max_odds");
        }
        if self.builder_min_dec > self.builder_max_dec {
            anyhow::bail!("builder_min_dec must not exceed builder_max_dec");
        }
        for (name, v) in [
            ("sharp_min_p", self.sharp_min_p),
            ("kelly_cap", self.kelly_cap),
            ("max_edge_cap", self.max_edge_cap),
        ] {
            if !(0.0..=1.0).contains(&v) {
                anyhow::bail!("{} must be between 0.0 and 1.0", name);
            }
        }
        if self.builder_legs < 2 || self.lotto_legs < 2 {
            anyhow::bail!("parlays need at least 2 legs");
        }
        if self.line_tolerance < 0.0 || self.nhl_line_tolerance < 0.0 {
            anyhow::bail!("line tolerances must be non-negative");
        }
        if self.enable_sharp_builder && self.builder_legs > self.sharp_max_singles {
            tracing::warn!(
                "builder_legs={} exceeds sharp_max_singles={}; the builder will never be built",
                self.builder_legs,
                self.sharp_max_singles
            );
        }
        Ok(())
    }

    /// Lower-cased, de-blanked target book keys.
    pub fn target_books(&self) -> Vec<String> {
        self.target_books
            .iter()
            .map(|b| b.trim().to_lowercase())
            .filter(|b| !b.is_empty())
            .collect()
    }

    pub fn sports(&self) -> Vec<String> {
        self.sports
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config::parse_from(["propsharp-bot", "--odds-api-key", "test-key", "--dry-run"])
    }
}
