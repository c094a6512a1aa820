use std::collections::BTreeSet;

use chrono::Datelike;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;

use loterie_db::models::{Draw, Game, Pool};

use crate::config::{GameSettings, Settings};
use crate::rules::{all_passed, check_combination, RuleId};
use crate::stats::compute_ball_stats;
use crate::ticket::TicketShape;

/// Graine du jour (AAAAMMJJ) : mêmes suggestions pour toute la journée.
pub fn date_seed() -> u64 {
    let today = chrono::Local::now().date_naive();
    today.year() as u64 * 10_000 + today.month() as u64 * 100 + today.day() as u64
}

/// Poids d'un pool, indexés par numéro - 1.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPool {
    weights: Vec<f64>,
}

impl WeightedPool {
    pub fn uniform(size: usize) -> Self {
        Self { weights: vec![1.0 / size as f64; size] }
    }

    pub fn from_weights(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, number: u8) -> f64 {
        self.weights.get((number as usize).wrapping_sub(1)).copied().unwrap_or(0.0)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Poids positifs et finis, de somme 1.
    pub fn is_valid(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite() && *w >= 0.0) && (self.total() - 1.0).abs() < 1e-9
    }

    /// Somme ramenée à 1 ; total nul ou non fini : uniforme.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if !total.is_finite() || total <= 0.0 || self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            log::warn!("Poids dégénérés (total {total}), retour à l'uniforme");
            return Self::uniform(self.len());
        }
        Self { weights: self.weights.iter().map(|w| w / total).collect() }
    }

    /// Numéros de poids non nul.
    pub fn support(&self) -> usize {
        self.weights.iter().filter(|w| **w > 0.0).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolWeights {
    pub primary: WeightedPool,
    pub secondary: WeightedPool,
}

impl PoolWeights {
    pub fn uniform(game: Game) -> Self {
        Self {
            primary: WeightedPool::uniform(game.pool_size(Pool::Primary)),
            secondary: WeightedPool::uniform(game.pool_size(Pool::Secondary)),
        }
    }

    pub fn pool(&self, pool: Pool) -> &WeightedPool {
        match pool {
            Pool::Primary => &self.primary,
            Pool::Secondary => &self.secondary,
        }
    }
}

/// Contexte commun aux étapes : jeu, réglages et derniers tirages (plus récent en tête).
pub struct StageContext<'a> {
    pub game: Game,
    pub settings: &'a GameSettings,
    pub history: &'a [Draw],
}

/// Transformation pure des poids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uniform,
    OmissionRank,
    RecentBoost,
    ExcludeLatest,
    Normalize,
}

impl Stage {
    /// Ordre d'application ; une étape peut écraser les ajustements des précédentes.
    pub const PIPELINE: [Stage; 5] = [
        Stage::Uniform,
        Stage::OmissionRank,
        Stage::RecentBoost,
        Stage::ExcludeLatest,
        Stage::Normalize,
    ];

    pub fn apply(&self, weights: &PoolWeights, ctx: &StageContext<'_>) -> PoolWeights {
        match self {
            Stage::Uniform => PoolWeights::uniform(ctx.game),
            Stage::OmissionRank => PoolWeights {
                primary: omission_rank(&weights.primary, ctx),
                secondary: weights.secondary.clone(),
            },
            Stage::RecentBoost => PoolWeights {
                primary: weights.primary.clone(),
                secondary: recent_boost(&weights.secondary, ctx),
            },
            Stage::ExcludeLatest => PoolWeights {
                primary: weights.primary.clone(),
                secondary: exclude_latest(&weights.secondary, ctx),
            },
            Stage::Normalize => PoolWeights {
                primary: weights.primary.normalized(),
                secondary: weights.secondary.normalized(),
            },
        }
    }
}

pub fn run_pipeline(ctx: &StageContext<'_>) -> PoolWeights {
    Stage::PIPELINE
        .iter()
        .fold(PoolWeights::uniform(ctx.game), |weights, stage| stage.apply(&weights, ctx))
}

/// Tirages à charger pour alimenter les étapes et le filtre.
pub fn required_history(settings: &GameSettings) -> usize {
    settings
        .omission_window
        .max(settings.recent_draws)
        .max(settings.exclude_latest_secondary)
        .max(2)
}

fn omission_rank(pool: &WeightedPool, ctx: &StageContext<'_>) -> WeightedPool {
    let configured = &ctx.settings.omission_weights;
    if configured.is_empty() {
        return pool.clone();
    }
    let size = pool.len();
    let top_sum: f64 = configured.iter().take(size).sum();
    if configured.iter().any(|w| !w.is_finite() || *w < 0.0) || top_sum >= 1.0 {
        log::warn!(
            "Poids de retard invalides {:?} (somme {top_sum:.3}), tirage uniforme",
            configured
        );
        return WeightedPool::uniform(size);
    }

    let window = &ctx.history[..ctx.history.len().min(ctx.settings.omission_window)];
    let mut stats = compute_ball_stats(window, ctx.game, Pool::Primary);
    stats.sort_by(|a, b| b.current_omission.cmp(&a.current_omission).then(a.number.cmp(&b.number)));

    let ranked = configured.len().min(size);
    let rest = size - ranked;
    let spread = if rest > 0 { (1.0 - top_sum) / rest as f64 } else { 0.0 };
    let mut weights = vec![spread; size];
    for (stat, &w) in stats.iter().zip(configured.iter()) {
        weights[stat.number as usize - 1] = w;
    }
    WeightedPool::from_weights(weights)
}

fn recent_boost(pool: &WeightedPool, ctx: &StageContext<'_>) -> WeightedPool {
    let Some(latest) = ctx.history.first() else {
        return pool.clone();
    };
    let settings = ctx.settings;
    let boost = settings.recent_weight;
    if !boost.is_finite() || boost < 0.0 {
        log::warn!("Poids de renforcement invalide ({boost}), étape ignorée");
        return pool.clone();
    }

    let recent = &ctx.history[..ctx.history.len().min(settings.recent_draws)];
    let boosted: Vec<u8> = latest
        .secondary
        .iter()
        .copied()
        .filter(|n| {
            let hits = recent.iter().filter(|d| d.secondary.contains(n)).count();
            hits >= settings.recent_threshold
        })
        .collect();
    if boosted.is_empty() {
        return pool.clone();
    }

    let size = pool.len();
    let total = boost * boosted.len() as f64;
    if total >= 1.0 || boosted.len() >= size {
        log::info!("Renforcement {:?} abandonné (poids cumulé {total:.2} >= 1)", boosted);
        return WeightedPool::uniform(size);
    }

    let spread = (1.0 - total) / (size - boosted.len()) as f64;
    let mut weights = vec![spread; size];
    for &n in &boosted {
        if let Some(w) = weights.get_mut((n as usize).wrapping_sub(1)) {
            *w = boost;
        }
    }
    log::info!("Complémentaires {:?} renforcés à {:.0} %", boosted, boost * 100.0);
    WeightedPool::from_weights(weights)
}

fn exclude_latest(pool: &WeightedPool, ctx: &StageContext<'_>) -> WeightedPool {
    let depth = ctx.settings.exclude_latest_secondary;
    if depth == 0 {
        return pool.clone();
    }
    let mut weights = pool.weights().to_vec();
    for draw in ctx.history.iter().take(depth) {
        for &n in &draw.secondary {
            if let Some(w) = weights.get_mut((n as usize).wrapping_sub(1)) {
                *w = 0.0;
            }
        }
    }
    WeightedPool::from_weights(weights)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    pub primary: Vec<u8>,
    pub secondary: Vec<u8>,
    /// Produit des rapports poids / uniforme des numéros retenus.
    pub score: f64,
}

/// Tirage pondéré avec remise jusqu'à `count` numéros distincts.
fn sample_distinct(
    dist: &WeightedIndex<f64>,
    pool: &WeightedPool,
    count: usize,
    rng: &mut StdRng,
) -> Option<(Vec<u8>, f64)> {
    let uniform = 1.0 / pool.len() as f64;
    let mut chosen = BTreeSet::new();
    let mut picks = 0;
    while chosen.len() < count {
        if picks >= count * 50 {
            return None;
        }
        chosen.insert((dist.sample(rng) + 1) as u8);
        picks += 1;
    }
    let score = chosen.iter().map(|&n| pool.weight(n) / uniform).product();
    Some((chosen.into_iter().collect(), score))
}

/// Génère jusqu'à `count` combinaisons. `history[0]` est le dernier tirage connu.
/// Le budget de tentatives épuisé, moins de combinaisons sont retournées.
pub fn generate_candidates(
    game: Game,
    settings: &Settings,
    history: &[Draw],
    count: usize,
    shape: TicketShape,
    seed: Option<u64>,
) -> Vec<Combination> {
    let game_settings = settings.game(game);
    let ctx = StageContext { game, settings: game_settings, history };
    let weights = run_pipeline(&ctx);

    if weights.primary.support() < shape.primary || weights.secondary.support() < shape.secondary {
        log::warn!("Pas assez de numéros pondérés pour une grille {}+{}", shape.primary, shape.secondary);
        return Vec::new();
    }
    let (Ok(primary_dist), Ok(secondary_dist)) = (
        WeightedIndex::new(weights.primary.weights()),
        WeightedIndex::new(weights.secondary.weights()),
    ) else {
        log::warn!("Distribution de poids inutilisable");
        return Vec::new();
    };

    let mut rng: StdRng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let filter = settings.filter_candidates && shape == TicketShape::standard(game);
    let budget = count.saturating_mul(1000);
    let mut combinations = Vec::with_capacity(count);
    let mut attempts = 0;

    while combinations.len() < count && attempts < budget {
        attempts += 1;
        let Some((primary, primary_score)) = sample_distinct(&primary_dist, &weights.primary, shape.primary, &mut rng) else {
            continue;
        };
        let Some((secondary, secondary_score)) =
            sample_distinct(&secondary_dist, &weights.secondary, shape.secondary, &mut rng)
        else {
            continue;
        };

        if filter {
            let results = check_combination(game, game_settings, &primary, &secondary, history, &RuleId::CANDIDATE_FILTER);
            if !all_passed(&results) {
                continue;
            }
        }

        combinations.push(Combination {
            primary,
            secondary,
            score: primary_score * secondary_score,
        });
    }

    if combinations.len() < count {
        log::warn!(
            "{} combinaisons générées sur {} demandées ({} tentatives)",
            combinations.len(),
            count,
            attempts
        );
    }
    combinations
}
