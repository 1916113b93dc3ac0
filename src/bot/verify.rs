//! Pre-send re-check of selected picks against fresh quotes.

use std::collections::HashMap;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::models::{ApiUsage, BlockedCounts, Candidate, Pick};
use crate::odds_api::{markets_for_sport, OddsSource};

use super::normalize::normalize_to_candidates;
use super::probability::{capped_kelly, edge, expected_value};

const NHL_SPORT: &str = "icehockey_nhl";

/// Distance between two American prices, treating -100 and +100 as the same
/// point so -105 → +105 is a 10-point move.
pub fn american_distance(a: i32, b: i32) -> i32 {
    fn linear(o: i32) -> i32 {
        if o < 0 {
            o + 100
        } else {
            o - 100
        }
    }
    (linear(a) - linear(b)).abs()
}

fn line_tolerance(config: &Config, sport: &str) -> f64 {
    if sport == NHL_SPORT {
        config.nhl_line_tolerance
    } else {
        config.line_tolerance
    }
}

/// Fresh candidate for the same outcome whose line is closest within tolerance.
fn find_fresh<'a>(pick: &Pick, fresh: &'a [Candidate], tolerance: f64) -> Option<&'a Candidate> {
    let c = &pick.candidate;
    fresh
        .iter()
        .filter(|f| f.market == c.market && f.participant == c.participant && f.side == c.side)
        .filter_map(|f| match (c.line, f.line) {
            (None, None) => Some((0.0, f)),
            (Some(a), Some(b)) if (a - b).abs() <= tolerance + 1e-9 => Some(((a - b).abs(), f)),
            _ => None,
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, f)| f)
}

/// Re-price one pick against fresh quotes. `None` means drop it.
fn reprice(pick: Pick, fresh: &[Candidate], config: &Config) -> Option<Pick> {
    let tol = line_tolerance(config, &pick.candidate.sport);
    let f = find_fresh(&pick, fresh, tol)?;
    let new_odds = *f.target_odds_by_book.get(&pick.book)?;
    if american_distance(new_odds, pick.target_odds) > config.max_odds_move_abs {
        return None;
    }
    let p = f.p_model.or(pick.candidate.p_model)?;
    let ev = expected_value(p, new_odds);
    if ev < 0.0 {
        return None;
    }

    let mut pick = pick;
    pick.candidate.line = f.line;
    pick.candidate.p_model = Some(p);
    pick.candidate.books_count = f.books_count;
    pick.target_odds = new_odds;
    pick.ev = ev;
    pick.edge = edge(p, new_odds);
    pick.kelly_frac = capped_kelly(p, new_odds, config.kelly_cap);
    pick.verified = true;
    Some(pick)
}

/// Re-fetch quotes for the picks' events (bounded by `max_verify_events`) and
/// drop picks whose price vanished or moved too far. Picks on events beyond
/// the budget, or whose re-fetch failed, pass through unverified.
pub async fn verify_picks(
    source: &dyn OddsSource,
    config: &Config,
    picks: Vec<Pick>,
    blocked: &mut BlockedCounts,
    usage: &mut ApiUsage,
) -> Vec<Pick> {
    if picks.is_empty() {
        return picks;
    }

    let mut to_check: Vec<(String, String)> = Vec::new();
    for p in &picks {
        let key = (p.candidate.sport.clone(), p.candidate.event_id.clone());
        if !to_check.contains(&key) && to_check.len() < config.max_verify_events {
            to_check.push(key);
        }
    }

    let target_books = config.target_books();
    let fetches = to_check.iter().map(|(sport, event_id)| async move {
        let res = source
            .event_odds(sport, event_id, markets_for_sport(sport))
            .await;
        (event_id.clone(), res)
    });

    let mut fresh: HashMap<String, Vec<Candidate>> = HashMap::new();
    for (event_id, res) in join_all(fetches).await {
        match res {
            Ok(odds) => {
                usage.odds_calls += 1;
                fresh.insert(event_id, normalize_to_candidates(&odds, &target_books));
            }
            Err(e) => {
                warn!("Verification fetch failed for event {}: {}", event_id, e);
                blocked.api_fail += 1;
            }
        }
    }

    let mut out = Vec::with_capacity(picks.len());
    for pick in picks {
        let Some(candidates) = fresh.get(&pick.candidate.event_id) else {
            out.push(pick);
            continue;
        };
        let label = format!(
            "{} {} {} ({:+})",
            pick.candidate.participant, pick.candidate.market, pick.candidate.side, pick.target_odds
        );
        match reprice(pick, candidates, config) {
            Some(p) => out.push(p),
            None => {
                info!("Verification dropped {}", label);
                blocked.verify += 1;
            }
        }
    }
    out
}
