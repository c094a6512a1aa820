use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;

use loterie_db::models::{Draw, Game};
use loterie_db::source::DrawSource;

use crate::calendar::DrawCalendar;
use crate::config::Settings;
use crate::error::{CoreError, CoreResult};
use crate::predictor::{self, Combination};
use crate::prize::{self, PrizeBreakdown, WindowReport};
use crate::rules::{self, RuleId, RuleResult};
use crate::simulator::{self, BatchSummary, SimulationLimits, SimulationOutcome, Simulator, UniformDraws};
use crate::stats::{self, WindowStats};
use crate::ticket::{Ticket, TicketShape};

/// Point d'entrée des analyses : un historique et des réglages figés.
pub struct Analyzer<'a, S: DrawSource> {
    source: &'a S,
    settings: Settings,
}

impl<'a, S: DrawSource> Analyzer<'a, S> {
    pub fn new(source: &'a S, settings: Settings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn require_draw(&self, game: Game, issue: &str) -> CoreResult<Draw> {
        self.source
            .by_issue(game, issue)?
            .ok_or_else(|| CoreError::UnknownIssue { game, issue: issue.to_string() })
    }

    pub fn evaluate_rules(&self, game: Game, issue: &str) -> CoreResult<BTreeMap<RuleId, RuleResult>> {
        self.require_draw(game, issue)?;
        let game_settings = self.settings.game(game);
        let history = self
            .source
            .up_to(game, issue, rules::required_lookback(game_settings) + 1)?;
        Ok(rules::evaluate_draw(game, game_settings, &history))
    }

    pub fn generate_candidates(
        &self,
        game: Game,
        count: usize,
        shape: TicketShape,
        seed: Option<u64>,
    ) -> CoreResult<Vec<Combination>> {
        shape.validate(game)?;
        let history = self
            .source
            .latest(game, predictor::required_history(self.settings.game(game)))?;
        Ok(predictor::generate_candidates(game, &self.settings, &history, count, shape, seed))
    }

    pub fn compute_prizes(&self, ticket: &Ticket, draw: &Draw) -> CoreResult<PrizeBreakdown> {
        prize::compute_prizes(ticket, draw)
    }

    /// Grille jouée sur les `window` derniers tirages (par défaut `prize_check_range`).
    pub fn compute_prizes_over_window(&self, ticket: &Ticket, window: Option<usize>) -> CoreResult<WindowReport> {
        let n = window.unwrap_or(self.settings.prize_check_range);
        let draws = self.source.latest(ticket.game(), n)?;
        prize::compute_prizes_over_window(ticket, &draws, self.settings.bet_price)
    }

    pub fn check_ticket_against(&self, ticket: &Ticket, issue: &str) -> CoreResult<PrizeBreakdown> {
        let draw = self.require_draw(ticket.game(), issue)?;
        prize::compute_prizes(ticket, &draw)
    }

    /// Fenêtre de `window` tirages (par défaut `stats_window`) ; 0 prend tout l'historique.
    pub fn window_stats(&self, game: Game, window: Option<usize>) -> CoreResult<WindowStats> {
        let n = match window.unwrap_or(self.settings.stats_window) {
            0 => usize::MAX,
            n => n,
        };
        let draws = self.source.latest(game, n)?;
        Ok(stats::window_stats(&draws, game, self.settings.game(game)))
    }

    fn limits(&self, max_draws: Option<u64>) -> SimulationLimits {
        SimulationLimits {
            max_draws: max_draws.unwrap_or(self.settings.simulation_max_draws),
            max_duration: match self.settings.simulation_max_seconds {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn calendar(&self, game: Game) -> DrawCalendar {
        DrawCalendar::from_settings(self.settings.game(game), &self.settings)
    }

    pub fn simulate_win_time(
        &self,
        ticket: &Ticket,
        max_draws: Option<u64>,
        seed: Option<u64>,
        start_date: NaiveDate,
        progress: impl FnMut(u64),
    ) -> SimulationOutcome {
        let calendar = self.calendar(ticket.game());
        let simulator = Simulator {
            ticket,
            limits: self.limits(max_draws),
            bet_price: self.settings.bet_price,
            calendar: &calendar,
            start_date,
        };
        let mut generator = UniformDraws::new(ticket.game(), seed);
        simulator.run(&mut generator, progress)
    }

    pub fn simulate_many(
        &self,
        ticket: &Ticket,
        runs: usize,
        max_draws: Option<u64>,
        base_seed: u64,
        start_date: NaiveDate,
    ) -> (Vec<SimulationOutcome>, BatchSummary) {
        let calendar = self.calendar(ticket.game());
        let simulator = Simulator {
            ticket,
            limits: self.limits(max_draws),
            bet_price: self.settings.bet_price,
            calendar: &calendar,
            start_date,
        };
        simulator::simulate_many(&simulator, runs, base_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loterie_db::models::{make_draw, make_test_draws};
    use loterie_db::source::MemoryDraws;

    fn source() -> MemoryDraws {
        let mut draws = make_test_draws(Game::Ssq, 30);
        draws.extend(make_test_draws(Game::Dlt, 30));
        draws.push(make_draw(Game::Ssq, "2024100", &[1, 2, 3, 4, 5, 6], &[7]));
        MemoryDraws::new(draws)
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_unknown_issue() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let err = analyzer.evaluate_rules(Game::Ssq, "1999001").unwrap_err();
        assert!(matches!(err, CoreError::UnknownIssue { game: Game::Ssq, .. }));

        let ticket = Ticket::new(Game::Dlt, &[1, 2, 3, 4, 5], &[1, 2]).unwrap();
        assert!(matches!(
            analyzer.check_ticket_against(&ticket, "2024100"),
            Err(CoreError::UnknownIssue { .. })
        ));
    }

    #[test]
    fn test_evaluate_rules_reports_enabled_rules() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let results = analyzer.evaluate_rules(Game::Ssq, "2024015").unwrap();
        assert_eq!(results.len(), rules::enabled_rules(analyzer.settings().game(Game::Ssq)).len());
        let dlt = analyzer.evaluate_rules(Game::Dlt, "2024015").unwrap();
        assert!(dlt.contains_key(&RuleId::SecondaryRepeatLatest));
    }

    #[test]
    fn test_check_ticket_against_issue() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let ticket = Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[7]).unwrap();
        let breakdown = analyzer.check_ticket_against(&ticket, "2024100").unwrap();
        assert_eq!(breakdown.hits.len(), 1);
        assert_eq!(breakdown.hits[0].tier.level, 1);
    }

    #[test]
    fn test_prizes_over_default_window() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let ticket = Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[7]).unwrap();
        let report = analyzer.compute_prizes_over_window(&ticket, None).unwrap();
        assert_eq!(report.draws.len(), 1);
        assert_eq!(report.draws[0].issue, "2024100");
        assert_eq!(report.stake, 2);

        let wider = analyzer.compute_prizes_over_window(&ticket, Some(10)).unwrap();
        assert_eq!(wider.draws.len(), 10);
        assert_eq!(wider.stake, 20);
    }

    #[test]
    fn test_generate_candidates_validates_shape() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let bad = TicketShape { primary: 4, secondary: 1 };
        assert!(matches!(
            analyzer.generate_candidates(Game::Ssq, 3, bad, Some(1)),
            Err(CoreError::InvalidTicket(_))
        ));
        let combos = analyzer
            .generate_candidates(Game::Ssq, 5, TicketShape::standard(Game::Ssq), Some(1))
            .unwrap();
        assert_eq!(combos.len(), 5);
    }

    #[test]
    fn test_window_stats_uses_default_window() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let stats = analyzer.window_stats(Game::Dlt, None).unwrap();
        assert_eq!(stats.window, 30);
        assert_eq!(stats.primary.len(), 35);
        assert_eq!(stats.secondary.len(), 12);
    }

    #[test]
    fn test_window_zero_takes_full_history() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let stats = analyzer.window_stats(Game::Ssq, Some(0)).unwrap();
        assert_eq!(stats.window, 31);

        let mut settings = Settings::default();
        settings.stats_window = 0;
        let analyzer = Analyzer::new(&source, settings);
        assert_eq!(analyzer.window_stats(Game::Dlt, None).unwrap().window, 30);
    }

    #[test]
    fn test_compute_prizes_rejects_other_game() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let ticket = Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[7]).unwrap();
        let draw = make_draw(Game::Dlt, "24001", &[1, 2, 3, 4, 5], &[7, 8]);
        assert!(matches!(
            analyzer.compute_prizes(&ticket, &draw),
            Err(CoreError::GameMismatch { .. })
        ));
    }

    #[test]
    fn test_simulation_budget() {
        let source = source();
        let analyzer = Analyzer::new(&source, Settings::default());
        let ticket = Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[7]).unwrap();
        let outcome = analyzer.simulate_win_time(&ticket, Some(0), Some(1), start(), |_| {});
        assert!(matches!(outcome, SimulationOutcome::Exhausted { draws: 0, .. }));

        let (outcomes, summary) = analyzer.simulate_many(&ticket, 3, Some(50), 5, start());
        assert_eq!(outcomes.len(), 3);
        assert_eq!(summary.runs, 3);
    }
}
