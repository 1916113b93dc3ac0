use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::models::{ApiUsage, BlockedCounts, Candidate, Event, Parlay, Pick, Tier};
use crate::db::Database;
use crate::notify::Notifier;
use crate::odds_api::{markets_for_sport, OddsSource};

use super::normalize::normalize_to_candidates;
use super::parlay::{build_builder, build_lotto};
use super::report::{BuilderSection, Digest};
use super::schedule::{format_et_timestamp, is_pregame_ok, is_today_et};
use super::selection::Selector;
use super::verify::verify_picks;

const LOTTO_KEY_PREFIX: &str = "LOTTO";

/// Outcome of one fetch → normalize → filter → rank → format → send pass
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub candidates: usize,
    pub singles_sent: usize,
    pub lotto_sent: bool,
    /// A digest reached the notifier successfully
    pub sent: bool,
    pub blocked: BlockedCounts,
    pub usage: ApiUsage,
}

/// The core bot engine. Each cycle pulls odds for today's games, selects
/// picks, and posts one digest.
pub struct BotEngine {
    config: Config,
    db: Database,
    source: Arc<dyn OddsSource>,
    notifier: Arc<dyn Notifier>,
}

impl BotEngine {
    pub fn new(
        config: Config,
        db: Database,
        source: Arc<dyn OddsSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        BotEngine {
            config,
            db,
            source,
            notifier,
        }
    }

    /// Run cycles on a fixed interval until Ctrl-C.
    pub async fn run_forever(&self, every: Duration) -> Result<()> {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Cycle failed: {:#}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
            }
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let pruned = self
            .db
            .prune_sent(self.config.cooldown_minutes.max(24 * 60), now)?;
        if pruned > 0 {
            debug!("Pruned {} expired cooldown keys", pruned);
        }

        let mut blocked = BlockedCounts::default();
        let mut usage = ApiUsage::default();

        // 1) Pull events + odds
        let candidates = self.collect_candidates(now, &mut blocked, &mut usage).await;

        // 2) Filter and rank
        let selection = Selector::new(&self.config).evaluate(&candidates);
        blocked.add(&selection.blocked);

        let mut picks: Vec<Pick> = selection.sharp;
        picks.extend(selection.lotto);

        // 3) Re-check prices before anything goes out
        if self.config.verify_before_send {
            picks = verify_picks(
                self.source.as_ref(),
                &self.config,
                picks,
                &mut blocked,
                &mut usage,
            )
            .await;
        }
        let (sharp, lotto_pool): (Vec<Pick>, Vec<Pick>) =
            picks.into_iter().partition(|p| p.tier == Tier::Sharp);
        let lotto = if self.config.enable_lotto {
            build_lotto(&lotto_pool, self.config.lotto_legs, self.config.lotto_max_total_dec)
        } else {
            None
        };
        let sendable = !sharp.is_empty() || lotto.is_some();

        // 4) Cooldown
        let mut singles = Vec::with_capacity(sharp.len());
        for p in sharp {
            if self.db.was_sent_recently(&p.cooldown_key(), self.config.cooldown_minutes, now)? {
                debug!("Cooldown suppressed {}", p.cooldown_key());
                continue;
            }
            singles.push(p);
        }
        let lotto = match lotto {
            Some(l) => self.off_cooldown(l, now)?,
            None => None,
        };

        // 5) Builder
        let builder = if self.config.enable_sharp_builder {
            match build_builder(
                &singles,
                self.config.builder_legs,
                self.config.builder_min_dec,
                self.config.builder_max_dec,
            ) {
                Some(b) => BuilderSection::Built(b),
                None => BuilderSection::NotBuilt,
            }
        } else {
            BuilderSection::Disabled
        };

        let mut report = CycleReport {
            candidates: candidates.len(),
            singles_sent: 0,
            lotto_sent: false,
            sent: false,
            blocked,
            usage,
        };

        let digest = Digest {
            config: &self.config,
            now_et: format_et_timestamp(now),
            singles: &singles,
            builder,
            lotto: lotto.as_ref(),
            watchlist: &selection.watchlist,
            usage,
            blocked,
        };

        if !digest.has_picks() && sendable {
            // Everything sendable is still on cooldown, stay quiet
            info!(
                "All picks on cooldown; nothing sent. candidates={}",
                candidates.len()
            );
            return Ok(report);
        }

        let text = digest.render();
        if let Err(e) = self.notifier.send(&text).await {
            error!("Notifier '{}' failed: {:#}", self.notifier.name(), e);
            return Ok(report);
        }
        report.sent = true;

        for p in &singles {
            self.db.mark_sent(&p.cooldown_key(), now)?;
        }
        if let Some(l) = &lotto {
            self.db.mark_sent(&l.cooldown_key(LOTTO_KEY_PREFIX), now)?;
        }
        report.singles_sent = singles.len();
        report.lotto_sent = lotto.is_some();

        info!(
            "Cycle done: candidates={}, singles={}, lotto={}, events={}, odds_calls={}, blocked={:?}",
            report.candidates,
            report.singles_sent,
            report.lotto_sent,
            usage.event_calls,
            usage.odds_calls,
            blocked
        );
        Ok(report)
    }

    fn off_cooldown(&self, parlay: Parlay, now: DateTime<Utc>) -> Result<Option<Parlay>> {
        let key = parlay.cooldown_key(LOTTO_KEY_PREFIX);
        if self.db.was_sent_recently(&key, self.config.cooldown_minutes, now)? {
            debug!("Cooldown suppressed lotto {}", key);
            return Ok(None);
        }
        Ok(Some(parlay))
    }

    /// Today's eligible events per sport, capped, with their odds normalized.
    /// Provider failures are counted, never fatal.
    async fn collect_candidates(
        &self,
        now: DateTime<Utc>,
        blocked: &mut BlockedCounts,
        usage: &mut ApiUsage,
    ) -> Vec<Candidate> {
        let target_books = self.config.target_books();
        let mut all = Vec::new();

        for sport in self.config.sports() {
            let events = match self.source.events(&sport).await {
                Ok(e) => e,
                Err(e) => {
                    warn!("Events fetch failed for sport={}: {:#}", sport, e);
                    blocked.api_fail += 1;
                    continue;
                }
            };
            usage.event_calls += 1;

            let eligible = self.eligible_events(events, now, blocked);
            let chosen: Vec<Event> = eligible
                .into_iter()
                .take(self.config.events_per_sport)
                .collect();
            usage.today_used += chosen.len() as u32;
            debug!("{}: {} event(s) selected", sport, chosen.len());

            let markets = markets_for_sport(&sport);
            let fetches = chosen.iter().map(|ev| {
                let sport = sport.as_str();
                async move { (ev, self.source.event_odds(sport, &ev.id, markets).await) }
            });
            for (ev, res) in join_all(fetches).await {
                match res {
                    Ok(odds) => {
                        usage.odds_calls += 1;
                        all.extend(normalize_to_candidates(&odds, &target_books));
                    }
                    Err(e) => {
                        warn!(
                            "Odds fetch failed: sport={} event_id={} err={:#}",
                            sport, ev.id, e
                        );
                        blocked.api_fail += 1;
                    }
                }
            }
        }
        all
    }

    fn eligible_events(
        &self,
        events: Vec<Event>,
        now: DateTime<Utc>,
        blocked: &mut BlockedCounts,
    ) -> Vec<Event> {
        let mut out: Vec<Event> = Vec::new();
        for e in events {
            if !is_today_et(e.commence_time, now) {
                continue;
            }
            if !self.config.allow_live
                && !is_pregame_ok(e.commence_time, now, self.config.pregame_buffer_minutes)
            {
                blocked.live_skip += 1;
                continue;
            }
            out.push(e);
        }
        out.sort_by_key(|e| e.commence_time);
        out
    }
}
