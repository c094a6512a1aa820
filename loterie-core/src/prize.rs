use loterie_db::models::{Draw, Game, Pool};

use crate::error::{CoreError, CoreResult};
use crate::ticket::{Ticket, TicketShape};

/// C(n, k), nul hors de 0 <= k <= n.
pub fn binomial(n: i64, k: i64) -> u64 {
    if n < 0 || k < 0 || k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
    }
    u64::try_from(acc).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payout {
    Fixed(u64),
    /// Montant publié avec chaque tirage.
    Floating,
}

/// Un rang et une combinaison de bons numéros (principaux, complémentaires) qui y donne droit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrizeTier {
    pub level: u8,
    pub primary: usize,
    pub secondary: usize,
    pub payout: Payout,
}

impl PrizeTier {
    pub fn label(&self) -> String {
        format!("{}+{}", self.primary, self.secondary)
    }
}

const fn tier(level: u8, primary: usize, secondary: usize, payout: Payout) -> PrizeTier {
    PrizeTier { level, primary, secondary, payout }
}

const SSQ_TIERS: [PrizeTier; 10] = [
    tier(1, 6, 1, Payout::Floating),
    tier(2, 6, 0, Payout::Floating),
    tier(3, 5, 1, Payout::Fixed(3000)),
    tier(4, 5, 0, Payout::Fixed(200)),
    tier(4, 4, 1, Payout::Fixed(200)),
    tier(5, 4, 0, Payout::Fixed(10)),
    tier(5, 3, 1, Payout::Fixed(10)),
    tier(6, 2, 1, Payout::Fixed(5)),
    tier(6, 1, 1, Payout::Fixed(5)),
    tier(6, 0, 1, Payout::Fixed(5)),
];

const DLT_TIERS: [PrizeTier; 13] = [
    tier(1, 5, 2, Payout::Floating),
    tier(2, 5, 1, Payout::Floating),
    tier(3, 5, 0, Payout::Fixed(10000)),
    tier(4, 4, 2, Payout::Fixed(3000)),
    tier(5, 4, 1, Payout::Fixed(300)),
    tier(6, 3, 2, Payout::Fixed(200)),
    tier(7, 4, 0, Payout::Fixed(100)),
    tier(8, 3, 1, Payout::Fixed(15)),
    tier(8, 2, 2, Payout::Fixed(15)),
    tier(9, 3, 0, Payout::Fixed(5)),
    tier(9, 2, 1, Payout::Fixed(5)),
    tier(9, 1, 2, Payout::Fixed(5)),
    tier(9, 0, 2, Payout::Fixed(5)),
];

/// Table des gains, du rang le plus élevé au plus faible.
pub fn prize_table(game: Game) -> &'static [PrizeTier] {
    match game {
        Game::Ssq => &SSQ_TIERS,
        Game::Dlt => &DLT_TIERS,
    }
}

/// Nombre de mises simples contenues dans une grille de cette forme.
pub fn combination_count(game: Game, shape: TicketShape) -> u64 {
    let std_p = game.pick_count(Pool::Primary) as i64;
    let std_s = game.pick_count(Pool::Secondary) as i64;
    binomial(shape.primary as i64, std_p).saturating_mul(binomial(shape.secondary as i64, std_s))
}

pub fn ticket_cost(game: Game, shape: TicketShape, bet_price: u64) -> u64 {
    combination_count(game, shape).saturating_mul(bet_price)
}

/// Mises gagnantes par entrée de la table, pour `matched_primary` et
/// `matched_secondary` bons numéros dans une grille de forme `shape`.
pub fn tier_counts_for_matches(
    game: Game,
    shape: TicketShape,
    matched_primary: usize,
    matched_secondary: usize,
) -> Vec<u64> {
    let std_p = game.pick_count(Pool::Primary) as i64;
    let std_s = game.pick_count(Pool::Secondary) as i64;
    let (tp, ts) = (shape.primary as i64, shape.secondary as i64);
    let (mp, ms) = (matched_primary as i64, matched_secondary as i64);

    prize_table(game)
        .iter()
        .map(|t| {
            let (r, s) = (t.primary as i64, t.secondary as i64);
            binomial(mp, r)
                .saturating_mul(binomial(tp - mp, std_p - r))
                .saturating_mul(binomial(ms, s))
                .saturating_mul(binomial(ts - ms, std_s - s))
        })
        .collect()
}

pub fn count_matches(ticket: &[u8], drawn: &[u8]) -> usize {
    ticket.iter().filter(|n| drawn.contains(n)).count()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierHit {
    pub tier: PrizeTier,
    pub count: u64,
    /// Gain unitaire ; `None` pour un rang à montant variable non publié.
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrizeBreakdown {
    pub issue: String,
    pub matched_primary: usize,
    pub matched_secondary: usize,
    pub hits: Vec<TierHit>,
}

impl PrizeBreakdown {
    pub fn winning_bets(&self) -> u64 {
        self.hits.iter().map(|h| h.count).sum()
    }

    /// Somme des gains dont le montant est connu.
    pub fn known_winnings(&self) -> u64 {
        self.hits
            .iter()
            .filter_map(|h| h.amount.map(|a| a.saturating_mul(h.count)))
            .sum()
    }

    /// Mises gagnantes dont le montant n'a pas été publié.
    pub fn unknown_bets(&self) -> u64 {
        self.hits.iter().filter(|h| h.amount.is_none()).map(|h| h.count).sum()
    }
}

fn unit_amount(tier: &PrizeTier, draw: &Draw) -> Option<u64> {
    match tier.payout {
        Payout::Fixed(amount) => Some(amount),
        Payout::Floating => draw.prize_amount(tier.level),
    }
}

/// Décompte des gains d'une grille sur un tirage. Seuls les rangs touchés sont listés.
/// Le tirage doit appartenir au jeu de la grille.
pub fn compute_prizes(ticket: &Ticket, draw: &Draw) -> CoreResult<PrizeBreakdown> {
    let game = ticket.game();
    if draw.game != game {
        return Err(CoreError::GameMismatch {
            ticket: game,
            draw: draw.game,
            issue: draw.issue.clone(),
        });
    }
    let matched_primary = count_matches(ticket.primary(), &draw.primary);
    let matched_secondary = count_matches(ticket.secondary(), &draw.secondary);
    let counts = tier_counts_for_matches(game, ticket.shape(), matched_primary, matched_secondary);

    let hits = prize_table(game)
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(tier, count)| TierHit {
            tier: *tier,
            count,
            amount: unit_amount(tier, draw),
        })
        .collect();

    Ok(PrizeBreakdown {
        issue: draw.issue.clone(),
        matched_primary,
        matched_secondary,
        hits,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub draws: Vec<PrizeBreakdown>,
    /// Mises gagnantes cumulées, une entrée par ligne de la table.
    pub tier_counts: Vec<(PrizeTier, u64)>,
    pub stake: u64,
    pub winnings: u64,
    pub unknown_bets: u64,
    pub return_ratio: f64,
}

/// Joue la même grille sur chaque tirage de la fenêtre.
pub fn compute_prizes_over_window(ticket: &Ticket, window: &[Draw], bet_price: u64) -> CoreResult<WindowReport> {
    let table = prize_table(ticket.game());
    let mut totals = vec![0u64; table.len()];
    let mut draws = Vec::with_capacity(window.len());

    for draw in window {
        let breakdown = compute_prizes(ticket, draw)?;
        for hit in &breakdown.hits {
            if let Some(idx) = table.iter().position(|t| *t == hit.tier) {
                totals[idx] += hit.count;
            }
        }
        draws.push(breakdown);
    }
    let tier_counts = table.iter().copied().zip(totals).collect();

    let stake = ticket_cost(ticket.game(), ticket.shape(), bet_price).saturating_mul(window.len() as u64);
    let winnings: u64 = draws.iter().map(|d| d.known_winnings()).sum();
    let unknown_bets: u64 = draws.iter().map(|d| d.unknown_bets()).sum();
    let return_ratio = if stake > 0 { winnings as f64 / stake as f64 } else { 0.0 };

    Ok(WindowReport {
        draws,
        tier_counts,
        stake,
        winnings,
        unknown_bets,
        return_ratio,
    })
}
