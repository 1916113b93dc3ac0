use std::cmp::Ordering;

use crate::db::models::Pick;

/// Heuristic volatility score: favours plus money, the +200..+900 range, and
/// high-variance prop markets.
pub fn score_prop(odds: Option<i32>, market: &str) -> f64 {
    let Some(odds) = odds else {
        return 0.0;
    };
    let market = market.to_lowercase();
    let mut score = 0.0;

    if odds > 0 {
        score += 2.0;
    }
    if (200..=900).contains(&odds) {
        score += 3.0;
    }

    if market.contains("three") || market.contains('3') {
        score += 1.0;
    }
    if market.contains("touchdown") || market.contains("td") {
        score += 1.0;
    }
    if market.contains("points") {
        score += 0.5;
    }
    if market.contains("receiving") {
        score += 0.5;
    }
    score
}

pub fn pick_score(pick: &Pick) -> f64 {
    score_prop(Some(pick.target_odds), &pick.candidate.market)
}

/// Highest score first, EV breaking ties; keeps at most `n`.
pub fn select_top(mut picks: Vec<Pick>, n: usize) -> Vec<Pick> {
    picks.sort_by(|a, b| {
        pick_score(b)
            .total_cmp(&pick_score(a))
            .then_with(|| b.ev.partial_cmp(&a.ev).unwrap_or(Ordering::Equal))
    });
    picks.truncate(n);
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::selection::tests::pick;

    #[test]
    fn test_score_missing_odds() {
        assert_eq!(score_prop(None, "player_threes"), 0.0);
    }

    #[test]
    fn test_score_favorite_plain_market() {
        assert_eq!(score_prop(Some(-150), "batter_hits"), 0.0);
    }

    #[test]
    fn test_score_long_shot_td() {
        // plus money + sweet spot + td
        assert_eq!(score_prop(Some(250), "player_anytime_td"), 6.0);
    }

    #[test]
    fn test_score_market_bonuses_stack() {
        // "player_points" → points bonus; "player_threes" → three bonus
        assert_eq!(score_prop(Some(120), "player_points"), 2.5);
        assert_eq!(score_prop(Some(120), "player_threes"), 3.0);
        assert_eq!(score_prop(Some(-110), "player_reception_yds"), 0.0);
        assert_eq!(score_prop(Some(-110), "player_receiving_yds"), 0.5);
    }

    #[test]
    fn test_select_top_orders_by_score_then_ev() {
        let a = pick("A", "batter_hits", -120, 0.05);
        let b = pick("B", "player_anytime_td", 250, 0.02);
        let c = pick("C", "batter_hits", -110, 0.08);
        let top = select_top(vec![a, b, c], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].candidate.participant, "B");
        assert_eq!(top[1].candidate.participant, "C");
    }
}
