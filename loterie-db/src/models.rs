use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Les deux jeux suivis. Toutes les constantes propres à un jeu passent par ici.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Game {
    /// 6 boules parmi 33 + 1 parmi 16
    Ssq,
    /// 5 boules parmi 35 + 2 parmi 12
    Dlt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    Primary,
    Secondary,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Ssq, Game::Dlt];

    pub fn code(&self) -> &'static str {
        match self {
            Game::Ssq => "ssq",
            Game::Dlt => "dlt",
        }
    }

    pub fn pool_size(&self, pool: Pool) -> usize {
        match (self, pool) {
            (Game::Ssq, Pool::Primary) => 33,
            (Game::Ssq, Pool::Secondary) => 16,
            (Game::Dlt, Pool::Primary) => 35,
            (Game::Dlt, Pool::Secondary) => 12,
        }
    }

    pub fn pick_count(&self, pool: Pool) -> usize {
        match (self, pool) {
            (Game::Ssq, Pool::Primary) => 6,
            (Game::Ssq, Pool::Secondary) => 1,
            (Game::Dlt, Pool::Primary) => 5,
            (Game::Dlt, Pool::Secondary) => 2,
        }
    }

    /// Quatre zones contiguës de la grille principale, bornes incluses.
    pub fn zones(&self) -> [(u8, u8); 4] {
        let last = self.pool_size(Pool::Primary) as u8;
        [(1, 8), (9, 16), (17, 24), (25, last)]
    }
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code().to_uppercase())
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ssq" => Ok(Game::Ssq),
            "dlt" => Ok(Game::Dlt),
            other => bail!("Jeu inconnu : '{}' (attendu ssq ou dlt)", other),
        }
    }
}

impl Pool {
    pub fn numbers_from<'a>(&self, draw: &'a Draw) -> &'a [u8] {
        match self {
            Pool::Primary => &draw.primary,
            Pool::Secondary => &draw.secondary,
        }
    }
}

/// Ligne de palmarès publiée avec le tirage : nombre de gagnants et gain unitaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeRecord {
    pub level: u8,
    pub winners: u64,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub game: Game,
    pub issue: String,
    pub date: NaiveDate,
    pub primary: Vec<u8>,
    pub secondary: Vec<u8>,
    pub sales: u64,
    pub jackpot: u64,
    pub prizes: Vec<PrizeRecord>,
}

impl Draw {
    /// Gain unitaire publié pour un rang, s'il a été enregistré.
    pub fn prize_amount(&self, level: u8) -> Option<u64> {
        self.prizes.iter().find(|p| p.level == level).map(|p| p.amount)
    }
}

pub fn validate_draw(game: Game, primary: &[u8], secondary: &[u8]) -> Result<()> {
    check_pool(game, Pool::Primary, primary, "Boule")?;
    check_pool(game, Pool::Secondary, secondary, "Complémentaire")?;
    Ok(())
}

fn check_pool(game: Game, pool: Pool, numbers: &[u8], label: &str) -> Result<()> {
    let expected = game.pick_count(pool);
    if numbers.len() != expected {
        bail!("{} : {} numéros attendus, {} reçus", label, expected, numbers.len());
    }
    let max = game.pool_size(pool) as u8;
    for &n in numbers {
        if n < 1 || n > max {
            bail!("{} {} hors limites (1-{})", label, n, max);
        }
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("{} en double : {}", label, numbers[i]);
            }
        }
    }
    Ok(())
}

/// Tirage minimal pour les tests et les démonstrations.
pub fn make_draw(game: Game, issue: &str, primary: &[u8], secondary: &[u8]) -> Draw {
    let mut primary = primary.to_vec();
    primary.sort();
    let mut secondary = secondary.to_vec();
    secondary.sort();
    Draw {
        game,
        issue: issue.to_string(),
        date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
        primary,
        secondary,
        sales: 0,
        jackpot: 0,
        prizes: Vec::new(),
    }
}

/// `n` tirages synthétiques, le plus récent en premier, numéros de tirage décroissants.
pub fn make_test_draws(game: Game, n: usize) -> Vec<Draw> {
    let primary_size = game.pool_size(Pool::Primary);
    let secondary_size = game.pool_size(Pool::Secondary);
    let primary_pick = game.pick_count(Pool::Primary);
    let secondary_pick = game.pick_count(Pool::Secondary);

    (0..n)
        .map(|i| {
            let base = i * 3;
            let primary: Vec<u8> = (0..primary_pick)
                .map(|k| ((base + k * 5) % primary_size + 1) as u8)
                .collect();
            let secondary: Vec<u8> = (0..secondary_pick)
                .map(|k| ((i + k * 5) % secondary_size + 1) as u8)
                .collect();
            let issue = format!("2024{:03}", n - i);
            let mut draw = make_draw(game, &issue, &primary, &secondary);
            draw.date = NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.checked_add_days(chrono::Days::new(((n - i) * 2) as u64)))
                .unwrap_or(draw.date);
            draw
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[16]).is_ok());
        assert!(validate_draw(Game::Dlt, &[31, 32, 33, 34, 35], &[11, 12]).is_ok());
    }

    #[test]
    fn test_validate_draw_out_of_range() {
        assert!(validate_draw(Game::Ssq, &[0, 2, 3, 4, 5, 6], &[1]).is_err());
        assert!(validate_draw(Game::Ssq, &[1, 2, 3, 4, 5, 34], &[1]).is_err());
        assert!(validate_draw(Game::Dlt, &[1, 2, 3, 4, 5], &[1, 13]).is_err());
    }

    #[test]
    fn test_validate_draw_wrong_count() {
        assert!(validate_draw(Game::Ssq, &[1, 2, 3, 4, 5], &[1]).is_err());
        assert!(validate_draw(Game::Dlt, &[1, 2, 3, 4, 5], &[1]).is_err());
    }

    #[test]
    fn test_validate_draw_duplicates() {
        assert!(validate_draw(Game::Ssq, &[1, 1, 3, 4, 5, 6], &[1]).is_err());
        assert!(validate_draw(Game::Dlt, &[1, 2, 3, 4, 5], &[3, 3]).is_err());
    }

    #[test]
    fn test_game_constants() {
        assert_eq!(Game::Ssq.pool_size(Pool::Primary), 33);
        assert_eq!(Game::Ssq.pool_size(Pool::Secondary), 16);
        assert_eq!(Game::Dlt.pick_count(Pool::Primary), 5);
        assert_eq!(Game::Dlt.pick_count(Pool::Secondary), 2);
        assert_eq!(Game::Dlt.zones()[3], (25, 35));
    }

    #[test]
    fn test_game_from_str() {
        assert_eq!("SSQ".parse::<Game>().unwrap(), Game::Ssq);
        assert_eq!(" dlt ".parse::<Game>().unwrap(), Game::Dlt);
        assert!("euromillions".parse::<Game>().is_err());
    }

    #[test]
    fn test_test_draws_are_valid() {
        for game in Game::ALL {
            let draws = make_test_draws(game, 40);
            assert_eq!(draws.len(), 40);
            assert!(draws[0].issue > draws[1].issue);
            for d in &draws {
                validate_draw(game, &d.primary, &d.secondary).unwrap();
            }
        }
    }

    #[test]
    fn test_prize_amount_lookup() {
        let mut draw = make_draw(Game::Ssq, "2024001", &[1, 2, 3, 4, 5, 6], &[7]);
        draw.prizes.push(PrizeRecord { level: 1, winners: 3, amount: 5_000_000 });
        assert_eq!(draw.prize_amount(1), Some(5_000_000));
        assert_eq!(draw.prize_amount(2), None);
    }
}
