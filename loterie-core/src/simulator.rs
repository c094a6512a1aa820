use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use loterie_db::models::{Game, Pool};

use crate::calendar::DrawCalendar;
use crate::prize::{prize_table, ticket_cost, tier_counts_for_matches, PrizeTier};
use crate::ticket::Ticket;

const PROGRESS_EVERY: u64 = 100_000;
const DEADLINE_CHECK_EVERY: u64 = 4_096;

/// Source de tirages synthétiques. Les numéros sont écrits dans les tampons fournis.
pub trait DrawGenerator {
    fn next_draw(&mut self, primary: &mut Vec<u8>, secondary: &mut Vec<u8>);
}

/// Tirages uniformes sans remise dans chaque pool.
pub struct UniformDraws {
    game: Game,
    rng: StdRng,
    primary_pool: Vec<u8>,
    secondary_pool: Vec<u8>,
}

impl UniformDraws {
    pub fn new(game: Game, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            game,
            rng,
            primary_pool: (1..=game.pool_size(Pool::Primary) as u8).collect(),
            secondary_pool: (1..=game.pool_size(Pool::Secondary) as u8).collect(),
        }
    }
}

impl DrawGenerator for UniformDraws {
    fn next_draw(&mut self, primary: &mut Vec<u8>, secondary: &mut Vec<u8>) {
        let (picked, _) = self
            .primary_pool
            .partial_shuffle(&mut self.rng, self.game.pick_count(Pool::Primary));
        primary.clear();
        primary.extend_from_slice(picked);

        let (picked, _) = self
            .secondary_pool
            .partial_shuffle(&mut self.rng, self.game.pick_count(Pool::Secondary));
        secondary.clear();
        secondary.extend_from_slice(picked);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationLimits {
    pub max_draws: u64,
    pub max_duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    Budget,
    Deadline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationOutcome {
    Won {
        draws: u64,
        tier_counts: Vec<(PrizeTier, u64)>,
        projected_date: Option<NaiveDate>,
        projected_stake: u64,
    },
    Exhausted {
        draws: u64,
        tier_counts: Vec<(PrizeTier, u64)>,
        reason: ExhaustReason,
    },
}

impl SimulationOutcome {
    pub fn draws(&self) -> u64 {
        match self {
            SimulationOutcome::Won { draws, .. } | SimulationOutcome::Exhausted { draws, .. } => *draws,
        }
    }

    pub fn tier_counts(&self) -> &[(PrizeTier, u64)] {
        match self {
            SimulationOutcome::Won { tier_counts, .. } | SimulationOutcome::Exhausted { tier_counts, .. } => tier_counts,
        }
    }

    pub fn is_won(&self) -> bool {
        matches!(self, SimulationOutcome::Won { .. })
    }
}

/// Rejoue une grille fixe contre des tirages synthétiques jusqu'au premier rang.
pub struct Simulator<'a> {
    pub ticket: &'a Ticket,
    pub limits: SimulationLimits,
    pub bet_price: u64,
    pub calendar: &'a DrawCalendar,
    /// Point de départ de la projection calendaire.
    pub start_date: NaiveDate,
}

fn membership(numbers: &[u8]) -> [bool; 64] {
    let mut mask = [false; 64];
    for &n in numbers {
        if let Some(slot) = mask.get_mut(n as usize) {
            *slot = true;
        }
    }
    mask
}

impl Simulator<'_> {
    pub fn run<G: DrawGenerator>(&self, generator: &mut G, mut progress: impl FnMut(u64)) -> SimulationOutcome {
        let game = self.ticket.game();
        let shape = self.ticket.shape();
        let table = prize_table(game);
        let std_p = game.pick_count(Pool::Primary);
        let std_s = game.pick_count(Pool::Secondary);

        // Mises gagnantes par (bons principaux, bons complémentaires), calculées une fois
        let lookup: Vec<Vec<Vec<u64>>> = (0..=std_p)
            .map(|mp| (0..=std_s).map(|ms| tier_counts_for_matches(game, shape, mp, ms)).collect())
            .collect();

        let primary_mask = membership(self.ticket.primary());
        let secondary_mask = membership(self.ticket.secondary());
        let mut totals = vec![0u64; table.len()];
        let mut primary = Vec::with_capacity(std_p);
        let mut secondary = Vec::with_capacity(std_s);
        let started = Instant::now();
        let mut draws = 0u64;

        let summarize = |totals: Vec<u64>| table.iter().copied().zip(totals).collect::<Vec<_>>();

        loop {
            if draws >= self.limits.max_draws {
                log::info!("Simulation arrêtée après {draws} tirages (budget atteint)");
                return SimulationOutcome::Exhausted {
                    draws,
                    tier_counts: summarize(totals),
                    reason: ExhaustReason::Budget,
                };
            }
            if draws % DEADLINE_CHECK_EVERY == 0 {
                if let Some(limit) = self.limits.max_duration {
                    if started.elapsed() >= limit {
                        log::info!("Simulation arrêtée après {draws} tirages (délai dépassé)");
                        return SimulationOutcome::Exhausted {
                            draws,
                            tier_counts: summarize(totals),
                            reason: ExhaustReason::Deadline,
                        };
                    }
                }
            }

            generator.next_draw(&mut primary, &mut secondary);
            draws += 1;

            let mp = primary.iter().filter(|&&n| primary_mask[n as usize % 64]).count();
            let ms = secondary.iter().filter(|&&n| secondary_mask[n as usize % 64]).count();
            if let Some(counts) = lookup.get(mp.min(std_p)).and_then(|row| row.get(ms.min(std_s))) {
                for (total, count) in totals.iter_mut().zip(counts) {
                    *total += count;
                }
            }

            if draws % PROGRESS_EVERY == 0 {
                progress(draws);
            }

            if totals.first().is_some_and(|&top| top > 0) {
                let cost = ticket_cost(game, shape, self.bet_price);
                log::info!("Premier rang atteint au tirage {draws}");
                return SimulationOutcome::Won {
                    draws,
                    tier_counts: summarize(totals),
                    projected_date: self.calendar.project(self.start_date, draws),
                    projected_stake: cost.saturating_mul(draws),
                };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub runs: usize,
    pub wins: usize,
    pub mean_draws_to_win: Option<f64>,
    pub min_draws_to_win: Option<u64>,
    pub max_draws_to_win: Option<u64>,
}

/// Lance `runs` simulations indépendantes en parallèle, graines `base_seed + i`.
pub fn simulate_many(simulator: &Simulator<'_>, runs: usize, base_seed: u64) -> (Vec<SimulationOutcome>, BatchSummary) {
    let game = simulator.ticket.game();
    let outcomes: Vec<SimulationOutcome> = (0..runs)
        .into_par_iter()
        .map(|i| {
            let mut generator = UniformDraws::new(game, Some(base_seed.wrapping_add(i as u64)));
            simulator.run(&mut generator, |_| {})
        })
        .collect();

    let won: Vec<u64> = outcomes.iter().filter(|o| o.is_won()).map(|o| o.draws()).collect();
    let summary = BatchSummary {
        runs,
        wins: won.len(),
        mean_draws_to_win: if won.is_empty() {
            None
        } else {
            Some(won.iter().map(|&d| d as f64).sum::<f64>() / won.len() as f64)
        },
        min_draws_to_win: won.iter().copied().min(),
        max_draws_to_win: won.iter().copied().max(),
    };
    (outcomes, summary)
}
