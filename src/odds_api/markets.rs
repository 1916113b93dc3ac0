/// Player-prop markets requested per sport. Sports without an entry fall back
/// to the moneyline.
const SPORT_MARKETS: &[(&str, &str)] = &[
    (
        "basketball_nba",
        "player_points,player_threes,player_points_rebounds_assists",
    ),
    (
        "americanfootball_nfl",
        "player_receptions,player_reception_yds,player_pass_yds,player_anytime_td",
    ),
    (
        "baseball_mlb",
        "pitcher_strikeouts,batter_hits,batter_total_bases,batter_home_runs",
    ),
    (
        "icehockey_nhl",
        "player_shots_on_goal,player_points,player_goals,player_goal_scorer_anytime",
    ),
    (
        "soccer_epl",
        "player_shots,player_shots_on_target,player_goal_scorer_anytime,player_assists",
    ),
    (
        "soccer_usa_mls",
        "player_shots,player_shots_on_target,player_goal_scorer_anytime,player_assists",
    ),
];

const FALLBACK_MARKETS: &str = "h2h";

pub fn markets_for_sport(sport: &str) -> &'static str {
    SPORT_MARKETS
        .iter()
        .find(|(s, _)| *s == sport)
        .map(|(_, m)| *m)
        .unwrap_or(FALLBACK_MARKETS)
}
