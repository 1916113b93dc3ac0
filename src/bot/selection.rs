use std::collections::BTreeMap;

use crate::config::Config;
use crate::db::models::{BlockedCounts, Candidate, Pick, Tier};

use super::gates::quality_gates;
use super::probability::{capped_kelly, edge, expected_value};
use super::scorer::select_top;

const NHL_SPORT: &str = "icehockey_nhl";
const NHL_SHOTS_MARKET: &str = "player_shots_on_goal";

/// Thresholds for one pick tier.
#[derive(Debug, Clone, Copy)]
pub struct TierRules {
    pub tier: Tier,
    pub min_odds: i32,
    pub max_odds: i32,
    pub min_books: usize,
    pub min_p: f64,
    pub min_edge: f64,
    pub min_ev: f64,
}

impl TierRules {
    pub fn sharp(config: &Config) -> Self {
        TierRules {
            tier: Tier::Sharp,
            min_odds: config.sharp_min_odds,
            max_odds: config.sharp_max_odds,
            min_books: config.sharp_min_books,
            min_p: config.sharp_min_p,
            min_edge: config.sharp_min_edge,
            min_ev: config.sharp_min_ev,
        }
    }

    pub fn lotto(config: &Config) -> Self {
        TierRules {
            tier: Tier::Lotto,
            min_odds: config.lotto_min_odds,
            max_odds: config.lotto_max_odds,
            min_books: config.lotto_min_books,
            min_p: 0.0,
            min_edge: config.lotto_min_edge,
            min_ev: config.lotto_min_ev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Missing,
    Window,
    Gate,
    Books,
    Cap,
    Tier,
}

impl BlockReason {
    fn count(self, blocked: &mut BlockedCounts) {
        match self {
            BlockReason::Missing => blocked.missing += 1,
            BlockReason::Window => blocked.window += 1,
            BlockReason::Gate => blocked.gate += 1,
            BlockReason::Books => blocked.books += 1,
            BlockReason::Cap => blocked.cap += 1,
            BlockReason::Tier => blocked.tier += 1,
        }
    }
}

/// Result of evaluating one candidate
#[derive(Debug, Clone)]
enum Verdict {
    Accepted(Pick),
    Rejected {
        reason: BlockReason,
        near_miss: Option<Pick>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Ranked by EV, truncated to the singles limit
    pub sharp: Vec<Pick>,
    /// Ranked by volatility score
    pub lotto: Vec<Pick>,
    /// Best positive-EV near misses
    pub watchlist: Vec<Pick>,
    pub blocked: BlockedCounts,
}

/// A target-book price chosen for evaluation
#[derive(Debug, Clone)]
struct Priced {
    book: String,
    odds: i32,
    ev: f64,
}

pub struct Selector<'a> {
    config: &'a Config,
    sharp: TierRules,
    lotto: TierRules,
}

impl<'a> Selector<'a> {
    pub fn new(config: &'a Config) -> Self {
        Selector {
            config,
            sharp: TierRules::sharp(config),
            lotto: TierRules::lotto(config),
        }
    }

    pub fn evaluate(&self, candidates: &[Candidate]) -> Selection {
        let mut blocked = BlockedCounts::default();
        let mut sharp = Vec::new();
        let mut lotto = Vec::new();
        let mut watchlist = Vec::new();

        for c in candidates {
            match self.evaluate_one(c) {
                Verdict::Accepted(pick) => match pick.tier {
                    Tier::Sharp => sharp.push(pick),
                    Tier::Lotto => lotto.push(pick),
                },
                Verdict::Rejected { reason, near_miss } => {
                    reason.count(&mut blocked);
                    if let Some(p) = near_miss {
                        watchlist.push(p);
                    }
                }
            }
        }

        if self.config.one_pick_per_game {
            sharp = best_per_event(sharp);
        }
        sort_by_ev(&mut sharp);
        sharp.truncate(self.config.sharp_max_singles);

        let lotto_len = lotto.len();
        let lotto = select_top(lotto, lotto_len);

        sort_by_ev(&mut watchlist);
        watchlist.truncate(self.config.watchlist_size);

        Selection {
            sharp,
            lotto,
            watchlist,
            blocked,
        }
    }

    fn evaluate_one(&self, c: &Candidate) -> Verdict {
        let rejected = |reason| Verdict::Rejected {
            reason,
            near_miss: None,
        };

        if c.target_odds_by_book.len() < self.config.min_target_books {
            return rejected(BlockReason::Missing);
        }
        let Some(p) = c.p_model.filter(|p| p.is_finite()) else {
            return rejected(BlockReason::Gate);
        };

        let sharp_price = best_price(c, p, &self.sharp);
        let lotto_price = if self.config.enable_lotto {
            best_price(c, p, &self.lotto)
        } else {
            None
        };
        if sharp_price.is_none() && lotto_price.is_none() {
            return rejected(BlockReason::Window);
        }

        let chosen = sharp_price.as_ref().or(lotto_price.as_ref()).map(|x| x.odds);
        let gate = quality_gates(
            c,
            chosen,
            self.config.strict_mode,
            self.config.nhl_require_confirmed_goalie,
        );
        if !gate.ok {
            tracing::debug!(
                "Gate blocked {} {} {}: {}",
                c.participant,
                c.market,
                c.side,
                gate.reasons.join("; ")
            );
            return rejected(BlockReason::Gate);
        }

        let mut first_reason = None;
        let mut near_miss = None;
        for (price, rules) in [(sharp_price, &self.sharp), (lotto_price, &self.lotto)] {
            let Some(price) = price else {
                continue;
            };
            match self.check_tier(c, p, &price, rules) {
                Ok(pick) => return Verdict::Accepted(pick),
                Err(reason) => {
                    first_reason.get_or_insert(reason);
                    if reason == BlockReason::Tier && price.ev > 0.0 && near_miss.is_none() {
                        near_miss = Some(self.make_pick(c, p, &price, rules.tier));
                    }
                }
            }
        }

        Verdict::Rejected {
            reason: first_reason.unwrap_or(BlockReason::Tier),
            near_miss,
        }
    }

    fn check_tier(
        &self,
        c: &Candidate,
        p: f64,
        price: &Priced,
        rules: &TierRules,
    ) -> Result<Pick, BlockReason> {
        let mut min_books = rules.min_books;
        if rules.tier == Tier::Sharp && is_nhl_shots_under(c) {
            min_books = min_books.max(self.config.nhl_shots_under_min_books);
        }
        if c.books_count < min_books {
            return Err(BlockReason::Books);
        }

        let e = edge(p, price.odds);
        if e > self.config.max_edge_cap {
            return Err(BlockReason::Cap);
        }
        if p < rules.min_p || e < rules.min_edge || price.ev < rules.min_ev {
            return Err(BlockReason::Tier);
        }
        Ok(self.make_pick(c, p, price, rules.tier))
    }

    fn make_pick(&self, c: &Candidate, p: f64, price: &Priced, tier: Tier) -> Pick {
        Pick {
            candidate: c.clone(),
            tier,
            book: price.book.clone(),
            target_odds: price.odds,
            ev: price.ev,
            edge: edge(p, price.odds),
            kelly_frac: capped_kelly(p, price.odds, self.config.kelly_cap),
            verified: false,
        }
    }
}

/// Highest-EV target-book price inside the tier's odds window.
fn best_price(c: &Candidate, p: f64, rules: &TierRules) -> Option<Priced> {
    let mut best: Option<Priced> = None;
    for (book, &odds) in &c.target_odds_by_book {
        if odds < rules.min_odds || odds > rules.max_odds {
            continue;
        }
        let ev = expected_value(p, odds);
        if best.as_ref().map_or(true, |b| ev > b.ev) {
            best = Some(Priced {
                book: book.clone(),
                odds,
                ev,
            });
        }
    }
    best
}

fn is_nhl_shots_under(c: &Candidate) -> bool {
    c.sport == NHL_SPORT && c.market == NHL_SHOTS_MARKET && c.side == "Under"
}

fn sort_by_ev(picks: &mut [Pick]) {
    picks.sort_by(|a, b| b.ev.total_cmp(&a.ev));
}

/// Highest-EV pick per event, in event-id order.
fn best_per_event(picks: Vec<Pick>) -> Vec<Pick> {
    let mut best: BTreeMap<String, Pick> = BTreeMap::new();
    for p in picks {
        match best.get(&p.candidate.event_id) {
            Some(existing) if existing.ev >= p.ev => {}
            _ => {
                best.insert(p.candidate.event_id.clone(), p);
            }
        }
    }
    best.into_values().collect()
}
