use loterie_db::models::{Game, Pool};

use crate::error::{CoreError, CoreResult};

/// Nombre de numéros joués dans chaque grille, au moins la taille standard du jeu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketShape {
    pub primary: usize,
    pub secondary: usize,
}

impl TicketShape {
    pub fn standard(game: Game) -> Self {
        Self {
            primary: game.pick_count(Pool::Primary),
            secondary: game.pick_count(Pool::Secondary),
        }
    }

    pub fn validate(&self, game: Game) -> CoreResult<()> {
        check_size(game, Pool::Primary, self.primary)?;
        check_size(game, Pool::Secondary, self.secondary)?;
        Ok(())
    }
}

fn check_size(game: Game, pool: Pool, size: usize) -> CoreResult<()> {
    let min = game.pick_count(pool);
    let max = game.pool_size(pool);
    if size < min || size > max {
        return Err(CoreError::InvalidTicket(format!(
            "{} numéros {} demandés, attendu entre {} et {}",
            size,
            pool_label(pool),
            min,
            max
        )));
    }
    Ok(())
}

fn pool_label(pool: Pool) -> &'static str {
    match pool {
        Pool::Primary => "principaux",
        Pool::Secondary => "complémentaires",
    }
}

/// Grille jouée, simple ou multiple. Les numéros sont stockés triés et sans doublon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    game: Game,
    primary: Vec<u8>,
    secondary: Vec<u8>,
}

impl Ticket {
    pub fn new(game: Game, primary: &[u8], secondary: &[u8]) -> CoreResult<Self> {
        let primary = checked_numbers(game, Pool::Primary, primary)?;
        let secondary = checked_numbers(game, Pool::Secondary, secondary)?;
        Ok(Self { game, primary, secondary })
    }

    pub fn game(&self) -> Game {
        self.game
    }

    pub fn primary(&self) -> &[u8] {
        &self.primary
    }

    pub fn secondary(&self) -> &[u8] {
        &self.secondary
    }

    pub fn numbers(&self, pool: Pool) -> &[u8] {
        match pool {
            Pool::Primary => &self.primary,
            Pool::Secondary => &self.secondary,
        }
    }

    pub fn shape(&self) -> TicketShape {
        TicketShape {
            primary: self.primary.len(),
            secondary: self.secondary.len(),
        }
    }

    pub fn is_simple(&self) -> bool {
        self.shape() == TicketShape::standard(self.game)
    }
}

fn checked_numbers(game: Game, pool: Pool, numbers: &[u8]) -> CoreResult<Vec<u8>> {
    let max = game.pool_size(pool) as u8;
    if let Some(&n) = numbers.iter().find(|&&n| n < 1 || n > max) {
        return Err(CoreError::InvalidTicket(format!(
            "numéro {} {} hors limites (1-{})",
            pool_label(pool),
            n,
            max
        )));
    }
    let mut sorted = numbers.to_vec();
    sorted.sort();
    sorted.dedup();
    if sorted.len() != numbers.len() {
        return Err(CoreError::InvalidTicket(format!(
            "numéros {} en double",
            pool_label(pool)
        )));
    }
    check_size(game, pool, sorted.len())?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_ticket() {
        let ticket = Ticket::new(Game::Ssq, &[6, 5, 4, 3, 2, 1], &[7]).unwrap();
        assert_eq!(ticket.primary(), &[1, 2, 3, 4, 5, 6]);
        assert!(ticket.is_simple());
    }

    #[test]
    fn test_complex_ticket() {
        let ticket = Ticket::new(Game::Dlt, &[1, 2, 3, 4, 5, 6, 7], &[1, 2, 3]).unwrap();
        assert!(!ticket.is_simple());
        assert_eq!(ticket.shape(), TicketShape { primary: 7, secondary: 3 });
    }

    #[test]
    fn test_too_few_numbers_rejected() {
        let err = Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5], &[7]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTicket(_)));
        assert!(Ticket::new(Game::Dlt, &[1, 2, 3, 4, 5], &[7]).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 34], &[7]).is_err());
        assert!(Ticket::new(Game::Ssq, &[1, 2, 3, 4, 5, 6], &[17]).is_err());
        assert!(Ticket::new(Game::Ssq, &[0, 2, 3, 4, 5, 6], &[1]).is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(Ticket::new(Game::Ssq, &[1, 1, 2, 3, 4, 5, 6], &[7]).is_err());
    }

    #[test]
    fn test_shape_bounds() {
        assert!(TicketShape::standard(Game::Ssq).validate(Game::Ssq).is_ok());
        assert!(TicketShape { primary: 33, secondary: 16 }.validate(Game::Ssq).is_ok());
        assert!(TicketShape { primary: 34, secondary: 1 }.validate(Game::Ssq).is_err());
        assert!(TicketShape { primary: 5, secondary: 1 }.validate(Game::Dlt).is_err());
    }
}
