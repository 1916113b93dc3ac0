/// Odds arithmetic: implied / no-vig probabilities, consensus, EV and Kelly.
///
/// All prices are American odds. For a price `o`:
///   o > 0  → profit per $1 staked is o / 100
///   o ≤ 0  → profit per $1 staked is 100 / |o|
///
/// The Kelly formula sizes a bet to maximise the expected logarithm of wealth:
///   f* = (b·p − q) / b
/// where
///   b  = net odds received on the bet (profit per unit staked)
///   p  = estimated probability of winning
///   q  = 1 − p
///
/// Callers apply a hard cap to f* for risk control.

/// Probability encoded by an American price, margin included.
pub fn implied_prob_american(odds: i32) -> f64 {
    let o = odds as f64;
    if odds > 0 {
        100.0 / (o + 100.0)
    } else {
        (-o) / ((-o) + 100.0)
    }
}

/// Total payout per $1 staked, stake included.
pub fn american_to_decimal(odds: i32) -> f64 {
    1.0 + profit_per_unit(odds)
}

/// Profit per $1 staked, stake excluded.
pub fn profit_per_unit(odds: i32) -> f64 {
    if odds > 0 {
        odds as f64 / 100.0
    } else if odds == 0 {
        0.0
    } else {
        100.0 / (-(odds as f64))
    }
}

/// Expected profit per $1 staked at `odds` when the true win probability is `p`.
pub fn expected_value(p: f64, odds: i32) -> f64 {
    p * profit_per_unit(odds) - (1.0 - p)
}

/// Consensus probability minus the implied probability of the offered price.
pub fn edge(p: f64, odds: i32) -> f64 {
    p - implied_prob_american(odds)
}

/// Full Kelly stake fraction. Returns `0.0` when there is no edge.
pub fn kelly_fraction(p: f64, odds: i32) -> f64 {
    let b = profit_per_unit(odds);
    if b <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - p;
    ((b * p - q) / b).max(0.0)
}

pub fn capped_kelly(p: f64, odds: i32, cap: f64) -> f64 {
    kelly_fraction(p, odds).min(cap)
}

/// Rescale one side of a two-outcome market so both sides sum to 1.
pub fn fair_prob_two_way_no_vig(p_a: f64, p_b: f64) -> f64 {
    let total = p_a + p_b;
    if total <= 0.0 || !total.is_finite() {
        return 0.5;
    }
    p_a / total
}

/// Median of the finite values; `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

/// Median implied probability across several books' prices.
pub fn consensus_probability(odds: &[i32]) -> Option<f64> {
    let probs: Vec<f64> = odds.iter().map(|&o| implied_prob_american(o)).collect();
    median(&probs)
}

pub fn consensus_probability_from_probs(probs: &[f64]) -> Option<f64> {
    median(probs)
}
