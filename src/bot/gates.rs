use crate::db::models::Candidate;

const NHL_SPORT: &str = "icehockey_nhl";
const TARGET_ODDS_REASON: &str = "Target book odds missing/invalid";
const MODEL_PROB_REASON: &str = "Model probability invalid";

#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// Process-quality checks applied before a candidate can become a pick.
///
/// Strict mode blocks on any reason. Loose mode only blocks on a missing
/// target price or an implausible model probability.
pub fn quality_gates(
    candidate: &Candidate,
    target_odds: Option<i32>,
    strict_mode: bool,
    nhl_require_goalie: bool,
) -> GateResult {
    let mut reasons = Vec::new();

    let mut missing = Vec::new();
    for (name, value) in [
        ("sport", candidate.sport.as_str()),
        ("event", candidate.event.as_str()),
        ("market", candidate.market.as_str()),
        ("participant", candidate.participant.as_str()),
        ("side", candidate.side.as_str()),
    ] {
        if value.trim().is_empty() {
            missing.push(name);
        }
    }
    if candidate.is_over_under() && candidate.line.is_none() {
        missing.push("line");
    }
    if !missing.is_empty() {
        reasons.push(format!("Missing fields: {}", missing.join(", ")));
    }

    if target_odds.is_none() {
        reasons.push(TARGET_ODDS_REASON.to_string());
    }

    match candidate.p_model {
        Some(p) if (0.01..=0.99).contains(&p) => {}
        _ => reasons.push(MODEL_PROB_REASON.to_string()),
    }

    if nhl_require_goalie
        && candidate.sport == NHL_SPORT
        && candidate.goalie_confirmed != Some(true)
    {
        reasons.push("Goalie not confirmed (gate enabled)".to_string());
    }

    let ok = if strict_mode {
        reasons.is_empty()
    } else {
        !reasons
            .iter()
            .any(|r| r == TARGET_ODDS_REASON || r == MODEL_PROB_REASON)
    };
    GateResult { ok, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn candidate() -> Candidate {
        Candidate {
            sport: "icehockey_nhl".into(),
            event_id: "e1".into(),
            event: "Rangers @ Bruins".into(),
            commence_time: Utc::now(),
            market: "player_shots_on_goal".into(),
            participant: "Artemi Panarin".into(),
            side: "Over".into(),
            line: Some(3.5),
            target_odds_by_book: BTreeMap::new(),
            p_model: Some(0.55),
            books_count: 5,
            goalie_confirmed: None,
        }
    }

    #[test]
    fn test_clean_candidate_passes() {
        let r = quality_gates(&candidate(), Some(-110), true, false);
        assert!(r.ok);
        assert!(r.reasons.is_empty());
    }

    #[test]
    fn test_missing_target_odds_blocks_in_both_modes() {
        assert!(!quality_gates(&candidate(), None, true, false).ok);
        assert!(!quality_gates(&candidate(), None, false, false).ok);
    }

    #[test]
    fn test_probability_bounds() {
        let mut c = candidate();
        c.p_model = Some(0.995);
        assert!(!quality_gates(&c, Some(-110), false, false).ok);
        c.p_model = None;
        let r = quality_gates(&c, Some(-110), false, false);
        assert_eq!(r.reasons, vec![MODEL_PROB_REASON.to_string()]);
    }

    #[test]
    fn test_missing_line_only_soft_in_loose_mode() {
        let mut c = candidate();
        c.line = None;
        let strict = quality_gates(&c, Some(-110), true, false);
        assert!(!strict.ok);
        assert_eq!(strict.reasons, vec!["Missing fields: line".to_string()]);
        assert!(quality_gates(&c, Some(-110), false, false).ok);
    }

    #[test]
    fn test_yes_prop_needs_no_line() {
        let mut c = candidate();
        c.side = "Yes".into();
        c.line = None;
        assert!(quality_gates(&c, Some(200), true, false).ok);
    }

    #[test]
    fn test_nhl_goalie_gate() {
        let mut c = candidate();
        assert!(!quality_gates(&c, Some(-110), true, true).ok);
        c.goalie_confirmed = Some(true);
        assert!(quality_gates(&c, Some(-110), true, true).ok);

        c.sport = "basketball_nba".into();
        c.goalie_confirmed = None;
        assert!(quality_gates(&c, Some(-110), true, true).ok);
    }
}
