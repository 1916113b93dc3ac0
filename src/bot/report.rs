//! Chat-message formatting for the per-cycle digest.

use crate::config::Config;
use crate::db::models::{ApiUsage, BlockedCounts, Parlay, Pick};

use super::probability::implied_prob_american;

const TITLE: &str = "BEST MODE — All Sports";

/// What happened to the sharp builder this cycle
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderSection {
    Disabled,
    NotBuilt,
    Built(Parlay),
}

/// Everything the digest renders
#[derive(Debug, Clone)]
pub struct Digest<'a> {
    pub config: &'a Config,
    pub now_et: String,
    pub singles: &'a [Pick],
    pub builder: BuilderSection,
    pub lotto: Option<&'a Parlay>,
    pub watchlist: &'a [Pick],
    pub usage: ApiUsage,
    pub blocked: BlockedCounts,
}

pub fn format_pick(p: &Pick) -> String {
    let c = &p.candidate;
    let mut s = format!("{} — {} — {}", c.participant, c.market, c.side);
    if let Some(line) = c.line {
        s.push_str(&format!(" {:?}", line));
    }
    s.push_str(&format!(" ({:+})", p.target_odds));
    s
}

pub fn why_line(p: &Pick) -> String {
    let implied = implied_prob_american(p.target_odds);
    format!(
        "WHY: p_fair={:.3} vs implied={:.3} (edge={:+.3}), EV=${:.3}/$1, books={}, Kelly~{:.2}%",
        p.p_model(),
        implied,
        p.edge,
        p.ev,
        p.candidate.books_count,
        p.kelly_frac * 100.0
    )
}

fn scope_label(config: &Config) -> &'static str {
    if config.allow_live {
        "(Pre-game + live)"
    } else {
        "(Pre-game only)"
    }
}

fn usage_line(usage: &ApiUsage) -> String {
    format!(
        "API calls: events={}, event-odds={} (today events used={})",
        usage.event_calls, usage.odds_calls, usage.today_used
    )
}

fn filters_line(config: &Config) -> String {
    format!(
        "Filters: Books≥{}, OddsRange[{},{}], MinP≥{:.2}, MinEdge≥{:.3}, MinEV≥{:.3}",
        config.sharp_min_books,
        config.sharp_min_odds,
        config.sharp_max_odds,
        config.sharp_min_p,
        config.sharp_min_edge,
        config.sharp_min_ev
    )
}

fn blocked_line(b: &BlockedCounts) -> String {
    format!(
        "Blocked: gate={}, missing={}, window={}, books={}, cap={}, tier={}, verify={}, live_skip={}, api_fail={}",
        b.gate, b.missing, b.window, b.books, b.cap, b.tier, b.verify, b.live_skip, b.api_fail
    )
}

impl Digest<'_> {
    pub fn has_picks(&self) -> bool {
        !self.singles.is_empty() || self.lotto.is_some()
    }

    pub fn render(&self) -> String {
        if self.has_picks() {
            self.render_picks()
        } else {
            self.render_no_picks()
        }
    }

    fn render_no_picks(&self) -> String {
        let mut lines = vec![
            format!("ℹ️ {} {}", TITLE, scope_label(self.config)),
            self.now_et.clone(),
            "No A+ picks today. Best move is no bet.".to_string(),
            String::new(),
        ];

        if !self.watchlist.is_empty() {
            lines.push("👀 WATCHLIST (near misses — not bets)".to_string());
            for p in self.watchlist {
                lines.push(format!("• {}", format_pick(p)));
                lines.push(format!("  {}", why_line(p)));
            }
            lines.push(String::new());
        }

        lines.push(usage_line(&self.usage));
        lines.push(filters_line(self.config));
        lines.push(blocked_line(&self.blocked));
        lines.join("\n")
    }

    fn render_picks(&self) -> String {
        let mut lines = vec![
            format!("✅ {} {}", TITLE, scope_label(self.config)),
            self.now_et.clone(),
            String::new(),
        ];

        if !self.singles.is_empty() {
            lines.push("🟢 HIGH-HIT SINGLES (A+ only)".to_string());
            lines.push("Stake guide: ~0.75–1.0% bankroll each".to_string());
            lines.push(String::new());
            for p in self.singles {
                lines.push(format!("• {}", format_pick(p)));
                lines.push(format!("  {}", p.candidate.event));
                lines.push(format!("  Book={}", p.book));
                lines.push(format!("  {}", why_line(p)));
                lines.push(String::new());
            }
        }

        match &self.builder {
            BuilderSection::Disabled => {}
            BuilderSection::Built(b) => {
                lines.push(format!(
                    "💰 BIG-MONEY BUILDER ({} legs) — built ONLY from A+ singles",
                    b.legs.len()
                ));
                lines.push(format!(
                    "Target decimal odds: {:.1}–{:.1} | This one ≈ {:.2}",
                    self.config.builder_min_dec, self.config.builder_max_dec, b.dec_odds
                ));
                for leg in &b.legs {
                    lines.push(format!("- {}", format_pick(leg)));
                }
                lines.push("Stake guide: 0.10–0.25% bankroll (small).".to_string());
                lines.push(String::new());
            }
            BuilderSection::NotBuilt => {
                lines.push(
                    "ℹ️ No builder today (A+ legs not enough or payout out of range).".to_string(),
                );
                lines.push(String::new());
            }
        }

        if let Some(l) = self.lotto {
            lines.push(format!(
                "🎰 LOTTO ({} legs) — high variance, plus-money only",
                l.legs.len()
            ));
            lines.push(format!(
                "Max decimal odds: {:.1} | This one ≈ {:.2}",
                self.config.lotto_max_total_dec, l.dec_odds
            ));
            for leg in &l.legs {
                lines.push(format!("- {}", format_pick(leg)));
                lines.push(format!("  {} | Book={}", leg.candidate.event, leg.book));
            }
            lines.push("Stake guide: 0.05–0.10% bankroll (tiny).".to_string());
            lines.push(String::new());
        }

        lines.push(usage_line(&self.usage));
        lines.push(blocked_line(&self.blocked));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::selection::tests::pick;

    fn digest<'a>(config: &'a Config, singles: &'a [Pick], watchlist: &'a [Pick]) -> Digest<'a> {
        Digest {
            config,
            now_et: "Mon Oct 19 07:05 PM ET".into(),
            singles,
            builder: BuilderSection::Disabled,
            lotto: None,
            watchlist,
            usage: ApiUsage {
                event_calls: 8,
                odds_calls: 12,
                today_used: 12,
            },
            blocked: BlockedCounts {
                tier: 4,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_format_pick_with_line() {
        let p = pick("Jalen Brunson", "player_points", -110, 0.05);
        assert_eq!(format_pick(&p), "Jalen Brunson — player_points — Over 20.5 (-110)");
    }

    #[test]
    fn test_format_pick_whole_number_line_keeps_decimal() {
        let mut p = pick("Auston Matthews", "player_shots_on_goal", 115, 0.03);
        p.candidate.line = Some(5.0);
        assert_eq!(
            format_pick(&p),
            "Auston Matthews — player_shots_on_goal — Over 5.0 (+115)"
        );
    }

    #[test]
    fn test_format_pick_plus_money_no_line() {
        let mut p = pick("Travis Kelce", "player_anytime_td", 150, 0.05);
        p.candidate.side = "Yes".into();
        p.candidate.line = None;
        assert_eq!(format_pick(&p), "Travis Kelce — player_anytime_td — Yes (+150)");
    }

    #[test]
    fn test_why_line() {
        let mut p = pick("A", "player_points", 100, 0.1);
        p.edge = 0.05;
        p.kelly_frac = 0.02;
        assert_eq!(
            why_line(&p),
            "WHY: p_fair=0.550 vs implied=0.500 (edge=+0.050), EV=$0.100/$1, books=5, Kelly~2.00%"
        );
    }

    #[test]
    fn test_no_picks_message() {
        let config = Config::for_tests();
        let msg = digest(&config, &[], &[]).render();
        assert!(msg.starts_with("ℹ️ BEST MODE — All Sports (Pre-game only)"));
        assert!(msg.contains("No A+ picks today. Best move is no bet."));
        assert!(msg.contains("API calls: events=8, event-odds=12 (today events used=12)"));
        assert!(msg.contains("Filters: Books≥4, OddsRange[-220,175], MinP≥0.53"));
        assert!(msg.contains("tier=4"));
        assert!(!msg.contains("WATCHLIST"));
    }

    #[test]
    fn test_no_picks_with_watchlist() {
        let config = Config::for_tests();
        let watch = vec![pick("W", "player_points", -110, 0.005)];
        let msg = digest(&config, &[], &watch).render();
        assert!(msg.contains("WATCHLIST"));
        assert!(msg.contains("• W — player_points — Over 20.5 (-110)"));
    }

    #[test]
    fn test_picks_message_sections() {
        let config = Config::for_tests();
        let singles = vec![
            pick("A", "player_points", -110, 0.05),
            pick("B", "player_points", -105, 0.04),
        ];
        let mut d = digest(&config, &singles, &[]);
        d.builder = BuilderSection::NotBuilt;
        let msg = d.render();
        assert!(msg.starts_with("✅ BEST MODE"));
        assert!(msg.contains("🟢 HIGH-HIT SINGLES (A+ only)"));
        assert!(msg.contains("  Book=draftkings"));
        assert!(msg.contains("No builder today"));
        assert!(!msg.contains("Filters:"));
        assert!(!msg.contains("LOTTO"));
    }

    #[test]
    fn test_builder_and_lotto_sections() {
        let config = Config::for_tests();
        let singles = vec![pick("A", "player_points", -110, 0.05)];
        let lotto = Parlay {
            legs: vec![pick("L1", "player_anytime_td", 200, 0.03)],
            dec_odds: 3.0,
        };
        let mut d = digest(&config, &singles, &[]);
        d.builder = BuilderSection::Built(Parlay {
            legs: singles.clone(),
            dec_odds: 1.909,
        });
        d.lotto = Some(&lotto);
        let msg = d.render();
        assert!(msg.contains("💰 BIG-MONEY BUILDER (1 legs)"));
        assert!(msg.contains("Target decimal odds: 3.0–7.0 | This one ≈ 1.91"));
        assert!(msg.contains("🎰 LOTTO (1 legs)"));
        assert!(msg.contains("- L1 — player_anytime_td — Over 20.5 (+200)"));
    }
}
