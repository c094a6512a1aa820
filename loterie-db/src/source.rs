use anyhow::Result;

use crate::models::{Draw, Game};

/// Accès en lecture à l'historique. Les listes sont toujours ordonnées du plus
/// récent au plus ancien ; les numéros de tirage se comparent chronologiquement.
pub trait DrawSource {
    /// Les `n` derniers tirages du jeu.
    fn latest(&self, game: Game, n: usize) -> Result<Vec<Draw>>;

    fn by_issue(&self, game: Game, issue: &str) -> Result<Option<Draw>>;

    /// Le tirage `issue` suivi de ses `n - 1` prédécesseurs.
    fn up_to(&self, game: Game, issue: &str, n: usize) -> Result<Vec<Draw>>;
}

/// Historique tenu en mémoire, utilisé par les tests et les imports ponctuels.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraws {
    draws: Vec<Draw>,
}

impl MemoryDraws {
    pub fn new(mut draws: Vec<Draw>) -> Self {
        draws.sort_by(|a, b| b.issue.cmp(&a.issue).then(a.game.cmp(&b.game)));
        draws.dedup_by(|a, b| a.game == b.game && a.issue == b.issue);
        Self { draws }
    }

    fn of_game(&self, game: Game) -> impl Iterator<Item = &Draw> {
        self.draws.iter().filter(move |d| d.game == game)
    }
}

impl DrawSource for MemoryDraws {
    fn latest(&self, game: Game, n: usize) -> Result<Vec<Draw>> {
        Ok(self.of_game(game).take(n).cloned().collect())
    }

    fn by_issue(&self, game: Game, issue: &str) -> Result<Option<Draw>> {
        Ok(self.of_game(game).find(|d| d.issue == issue).cloned())
    }

    fn up_to(&self, game: Game, issue: &str, n: usize) -> Result<Vec<Draw>> {
        Ok(self
            .of_game(game)
            .filter(|d| d.issue.as_str() <= issue)
            .take(n)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{make_draw, make_test_draws};

    #[test]
    fn test_memory_latest_is_most_recent_first() {
        let mut draws = make_test_draws(Game::Ssq, 10);
        draws.reverse();
        let source = MemoryDraws::new(draws);
        let latest = source.latest(Game::Ssq, 3).unwrap();
        assert_eq!(latest.len(), 3);
        assert_eq!(latest[0].issue, "2024010");
        assert_eq!(latest[2].issue, "2024008");
    }

    #[test]
    fn test_memory_filters_by_game() {
        let mut draws = make_test_draws(Game::Ssq, 5);
        draws.extend(make_test_draws(Game::Dlt, 3));
        let source = MemoryDraws::new(draws);
        assert_eq!(source.latest(Game::Dlt, 100).unwrap().len(), 3);
        assert_eq!(source.latest(Game::Ssq, 100).unwrap().len(), 5);
    }

    #[test]
    fn test_memory_up_to_includes_issue() {
        let source = MemoryDraws::new(make_test_draws(Game::Dlt, 10));
        let window = source.up_to(Game::Dlt, "2024005", 3).unwrap();
        let issues: Vec<&str> = window.iter().map(|d| d.issue.as_str()).collect();
        assert_eq!(issues, vec!["2024005", "2024004", "2024003"]);
    }

    #[test]
    fn test_memory_by_issue_missing() {
        let source = MemoryDraws::new(vec![make_draw(Game::Ssq, "2024001", &[1, 2, 3, 4, 5, 6], &[1])]);
        assert!(source.by_issue(Game::Ssq, "2024001").unwrap().is_some());
        assert!(source.by_issue(Game::Ssq, "2024002").unwrap().is_none());
        assert!(source.by_issue(Game::Dlt, "2024001").unwrap().is_none());
    }
}
