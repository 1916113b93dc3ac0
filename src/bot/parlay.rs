use std::collections::HashSet;

use crate::db::models::{Parlay, Pick};

use super::probability::american_to_decimal;
use super::scorer::select_top;

/// Product of the legs' decimal odds.
pub fn combined_decimal(legs: &[Pick]) -> f64 {
    legs.iter()
        .map(|l| american_to_decimal(l.target_odds))
        .product()
}

/// Build a controlled builder from sharp singles only.
///
/// Exactly `legs` legs chosen greedily by EV, never repeating a
/// (participant, market) pair, with the total payout inside
/// `[min_dec, max_dec]`.
pub fn build_builder(singles: &[Pick], legs: usize, min_dec: f64, max_dec: f64) -> Option<Parlay> {
    if legs == 0 || singles.len() < legs {
        return None;
    }

    let mut ranked: Vec<&Pick> = singles.iter().collect();
    ranked.sort_by(|a, b| b.ev.total_cmp(&a.ev));

    let mut used = HashSet::new();
    let mut chosen = Vec::with_capacity(legs);
    for p in ranked {
        let sig = (p.candidate.participant.as_str(), p.candidate.market.as_str());
        if !used.insert(sig) {
            continue;
        }
        chosen.push(p.clone());
        if chosen.len() == legs {
            break;
        }
    }
    if chosen.len() != legs {
        return None;
    }

    let dec_odds = combined_decimal(&chosen);
    if !(min_dec..=max_dec).contains(&dec_odds) {
        return None;
    }
    Some(Parlay {
        legs: chosen,
        dec_odds,
    })
}

/// Build a high-variance parlay from the lotto pool: legs in score order,
/// one per game, skipping any leg that would push the payout past
/// `max_total_dec`.
pub fn build_lotto(pool: &[Pick], legs: usize, max_total_dec: f64) -> Option<Parlay> {
    if legs == 0 || pool.len() < legs {
        return None;
    }

    let ranked = select_top(pool.to_vec(), pool.len());
    let mut events = HashSet::new();
    let mut chosen: Vec<Pick> = Vec::with_capacity(legs);
    let mut dec = 1.0;
    for p in ranked {
        if events.contains(&p.candidate.event_id) {
            continue;
        }
        let next = dec * american_to_decimal(p.target_odds);
        if next > max_total_dec {
            continue;
        }
        dec = next;
        events.insert(p.candidate.event_id.clone());
        chosen.push(p);
        if chosen.len() == legs {
            return Some(Parlay {
                legs: chosen,
                dec_odds: dec,
            });
        }
    }
    None
}
