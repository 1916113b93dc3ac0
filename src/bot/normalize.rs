//! Turn raw bookmaker quotes into per-outcome candidates.
//!
//! Quotes are grouped by (market, participant, line). Within a group every
//! book that prices both `Over` and `Under` contributes a no-vig fair
//! probability; other markets (anytime scorer, yes/no props) fall back to raw
//! implied probabilities. The consensus is the median across books, so every
//! book in the payload informs the probability while only target books
//! supply the price we evaluate.

use std::collections::{BTreeMap, BTreeSet};

use crate::db::models::{Candidate, EventOdds};

use super::probability::{
    consensus_probability_from_probs, fair_prob_two_way_no_vig, implied_prob_american,
};

/// Grouping key for a line; `f64` has no `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LineKey(Option<i64>);

impl LineKey {
    fn new(line: Option<f64>) -> Self {
        // Scale to hundredths so 5.5 and 5.50 collapse and ordering is numeric
        LineKey(line.map(|l| (l * 100.0).round() as i64))
    }

    fn value(self) -> Option<f64> {
        self.0.map(|v| v as f64 / 100.0)
    }
}

type GroupKey = (String, String, LineKey);
/// book → side → price
type BookSides = BTreeMap<String, BTreeMap<String, i32>>;

pub fn event_name(away: &str, home: &str) -> String {
    format!("{} @ {}", away.trim(), home.trim())
        .trim_matches(|c| c == ' ' || c == '@')
        .to_string()
}

pub fn normalize_to_candidates(odds: &EventOdds, target_books: &[String]) -> Vec<Candidate> {
    let event = event_name(&odds.away_team, &odds.home_team);
    let mut groups: BTreeMap<GroupKey, BookSides> = BTreeMap::new();

    for bm in &odds.bookmakers {
        let book = bm.key.to_lowercase();
        for market in &bm.markets {
            if market.key.is_empty() {
                continue;
            }
            for outcome in &market.outcomes {
                let participant = outcome
                    .description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or(&outcome.name);
                let side = outcome.name.as_str();
                if participant.is_empty() || side.is_empty() {
                    continue;
                }
                let Some(price) = outcome.american_price() else {
                    continue;
                };
                groups
                    .entry((
                        market.key.clone(),
                        participant.to_string(),
                        LineKey::new(outcome.point),
                    ))
                    .or_default()
                    .entry(book.clone())
                    .or_default()
                    .insert(side.to_string(), price);
            }
        }
    }

    let mut out = Vec::new();
    for ((market, participant, line), books) in groups {
        let is_ou = books
            .values()
            .any(|s| s.contains_key("Over") && s.contains_key("Under"));

        let mut fair_over = Vec::new();
        let mut fair_under = Vec::new();
        let mut implied: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

        for sides in books.values() {
            if let (Some(&over), Some(&under)) = (sides.get("Over"), sides.get("Under")) {
                let fo = fair_prob_two_way_no_vig(
                    implied_prob_american(over),
                    implied_prob_american(under),
                );
                fair_over.push(fo);
                fair_under.push(1.0 - fo);
            }
            for (side, &price) in sides {
                implied
                    .entry(side.as_str())
                    .or_default()
                    .push(implied_prob_american(price));
            }
        }

        let sides_to_emit: BTreeSet<&str> = if is_ou {
            ["Over", "Under"].into_iter().collect()
        } else {
            implied.keys().copied().collect()
        };

        for side in sides_to_emit {
            let target_odds_by_book: BTreeMap<String, i32> = target_books
                .iter()
                .filter_map(|b| {
                    books
                        .get(b.as_str())
                        .and_then(|sides| sides.get(side))
                        .map(|&price| (b.clone(), price))
                })
                .collect();

            let probs: &[f64] = if is_ou {
                if side == "Over" {
                    &fair_over
                } else {
                    &fair_under
                }
            } else {
                implied.get(side).map(Vec::as_slice).unwrap_or(&[])
            };

            out.push(Candidate {
                sport: odds.sport_key.clone(),
                event_id: odds.id.clone(),
                event: event.clone(),
                commence_time: odds.commence_time,
                market: market.clone(),
                participant: participant.clone(),
                side: side.to_string(),
                line: line.value(),
                target_odds_by_book,
                p_model: consensus_probability_from_probs(probs),
                books_count: probs.len(),
                goalie_confirmed: None,
            });
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::{BookMarket, Bookmaker, Outcome};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    pub(crate) fn outcome(side: &str, player: &str, point: Option<f64>, price: f64) -> Outcome {
        Outcome {
            name: side.into(),
            description: Some(player.into()),
            price: Some(price),
            point,
        }
    }

    pub(crate) fn book(key: &str, market: &str, outcomes: Vec<Outcome>) -> Bookmaker {
        Bookmaker {
            key: key.into(),
            title: key.into(),
            markets: vec![BookMarket {
                key: market.into(),
                outcomes,
            }],
        }
    }

    pub(crate) fn event_odds(bookmakers: Vec<Bookmaker>) -> EventOdds {
        EventOdds {
            id: "evt1".into(),
            sport_key: "basketball_nba".into(),
            home_team: "Boston Celtics".into(),
            away_team: "New York Knicks".into(),
            commence_time: Utc.with_ymd_and_hms(2026, 10, 19, 23, 30, 0).unwrap(),
            bookmakers,
        }
    }

    fn ou_book(key: &str, over: f64, under: f64) -> Bookmaker {
        book(
            key,
            "player_points",
            vec![
                outcome("Over", "Jalen Brunson", Some(27.5), over),
                outcome("Under", "Jalen Brunson", Some(27.5), under),
            ],
        )
    }

    fn targets() -> Vec<String> {
        vec!["draftkings".into(), "fanduel".into()]
    }

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("Knicks", "Celtics"), "Knicks @ Celtics");
        assert_eq!(event_name("", "Celtics"), "Celtics");
        assert_eq!(event_name("Knicks", ""), "Knicks");
    }

    #[test]
    fn test_over_under_uses_no_vig_median() {
        let odds = event_odds(vec![
            ou_book("DraftKings", -110.0, -110.0),
            ou_book("fanduel", -120.0, 100.0),
            ou_book("betmgm", -115.0, -105.0),
        ]);
        let cands = normalize_to_candidates(&odds, &targets());
        assert_eq!(cands.len(), 2);

        let over = cands.iter().find(|c| c.side == "Over").unwrap();
        let under = cands.iter().find(|c| c.side == "Under").unwrap();
        assert_eq!(over.books_count, 3);
        assert_eq!(over.line, Some(27.5));
        assert_eq!(over.event, "New York Knicks @ Boston Celtics");
        assert_eq!(over.target_odds_by_book.len(), 2);
        assert_eq!(over.target_odds_by_book["draftkings"], -110);

        let mid = fair_prob_two_way_no_vig(
            implied_prob_american(-115),
            implied_prob_american(-105),
        );
        assert_relative_eq!(over.p_model.unwrap(), mid, epsilon = 1e-12);
        assert_relative_eq!(
            over.p_model.unwrap() + under.p_model.unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_one_sided_book_contributes_to_implied_only() {
        let odds = event_odds(vec![
            ou_book("draftkings", -110.0, -110.0),
            book(
                "fanduel",
                "player_points",
                vec![outcome("Over", "Jalen Brunson", Some(27.5), -105.0)],
            ),
        ]);
        let cands = normalize_to_candidates(&odds, &targets());
        let over = cands.iter().find(|c| c.side == "Over").unwrap();
        // Only draftkings has both sides so only one fair probability
        assert_eq!(over.books_count, 1);
        assert_eq!(over.target_odds_by_book.len(), 2);
    }

    #[test]
    fn test_yes_market_uses_implied_consensus() {
        let odds = event_odds(vec![
            book(
                "draftkings",
                "player_anytime_td",
                vec![outcome("Yes", "Travis Kelce", None, 150.0)],
            ),
            book(
                "fanduel",
                "player_anytime_td",
                vec![outcome("Yes", "Travis Kelce", None, 130.0)],
            ),
        ]);
        let cands = normalize_to_candidates(&odds, &targets());
        assert_eq!(cands.len(), 1);
        let c = &cands[0];
        assert_eq!(c.side, "Yes");
        assert_eq!(c.line, None);
        let expected = (implied_prob_american(150) + implied_prob_american(130)) / 2.0;
        assert_relative_eq!(c.p_model.unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_different_lines_are_separate_groups() {
        let odds = event_odds(vec![
            ou_book("draftkings", -110.0, -110.0),
            book(
                "fanduel",
                "player_points",
                vec![
                    outcome("Over", "Jalen Brunson", Some(28.5), 105.0),
                    outcome("Under", "Jalen Brunson", Some(28.5), -125.0),
                ],
            ),
        ]);
        let cands = normalize_to_candidates(&odds, &targets());
        assert_eq!(cands.len(), 4);
        assert!(cands.iter().all(|c| c.books_count == 1));
    }

    #[test]
    fn test_non_integer_prices_skipped() {
        let odds = event_odds(vec![book(
            "draftkings",
            "player_points",
            vec![
                outcome("Over", "Jalen Brunson", Some(27.5), 1.91),
                outcome("Under", "Jalen Brunson", Some(27.5), 1.91),
            ],
        )]);
        assert!(normalize_to_candidates(&odds, &targets()).is_empty());
    }

    #[test]
    fn test_game_line_without_description_uses_name() {
        let odds = event_odds(vec![Bookmaker {
            key: "draftkings".into(),
            title: "DraftKings".into(),
            markets: vec![BookMarket {
                key: "h2h".into(),
                outcomes: vec![
                    Outcome {
                        name: "Boston Celtics".into(),
                        description: None,
                        price: Some(-200.0),
                        point: None,
                    },
                    Outcome {
                        name: "New York Knicks".into(),
                        description: None,
                        price: Some(170.0),
                        point: None,
                    },
                ],
            }],
        }]);
        let cands = normalize_to_candidates(&odds, &targets());
        assert_eq!(cands.len(), 2);
        assert!(cands.iter().any(|c| c.participant == "Boston Celtics"));
    }
}
