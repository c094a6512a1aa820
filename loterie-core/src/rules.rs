use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use loterie_db::models::{Draw, Game};

use crate::config::GameSettings;
use crate::stats::consecutive_groups;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleId {
    SecondaryStreakSoft,
    SecondaryStreakHard,
    SecondaryRepeatLatest,
    PrimaryStreak,
    ZoneCoverage,
    OverlapPreviousTwo,
    ConsecutiveRun,
}

impl RuleId {
    pub const ALL: [RuleId; 7] = [
        RuleId::SecondaryStreakSoft,
        RuleId::SecondaryStreakHard,
        RuleId::SecondaryRepeatLatest,
        RuleId::PrimaryStreak,
        RuleId::ZoneCoverage,
        RuleId::OverlapPreviousTwo,
        RuleId::ConsecutiveRun,
    ];

    /// Règles appliquées par le filtre de candidats du générateur.
    pub const CANDIDATE_FILTER: [RuleId; 3] = [
        RuleId::ZoneCoverage,
        RuleId::ConsecutiveRun,
        RuleId::OverlapPreviousTwo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RuleId::SecondaryStreakSoft => "secondary_streak_soft",
            RuleId::SecondaryStreakHard => "secondary_streak_hard",
            RuleId::SecondaryRepeatLatest => "secondary_repeat_latest",
            RuleId::PrimaryStreak => "primary_streak",
            RuleId::ZoneCoverage => "zone_coverage",
            RuleId::OverlapPreviousTwo => "overlap_previous_two",
            RuleId::ConsecutiveRun => "consecutive_run",
        }
    }

    pub fn is_enabled(&self, settings: &GameSettings) -> bool {
        match self {
            RuleId::SecondaryStreakSoft => settings.secondary_streak_soft.is_some(),
            RuleId::SecondaryStreakHard => settings.secondary_streak_hard.is_some(),
            RuleId::SecondaryRepeatLatest => settings.secondary_repeat_latest,
            RuleId::PrimaryStreak => settings.primary_streak > 0,
            RuleId::ZoneCoverage | RuleId::OverlapPreviousTwo | RuleId::ConsecutiveRun => true,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleResult {
    pub passed: bool,
    pub message: String,
}

impl RuleResult {
    fn pass(message: impl Into<String>) -> Self {
        Self { passed: true, message: message.into() }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self { passed: false, message: message.into() }
    }
}

pub fn enabled_rules(settings: &GameSettings) -> Vec<RuleId> {
    RuleId::ALL.into_iter().filter(|r| r.is_enabled(settings)).collect()
}

/// Nombre de tirages antérieurs nécessaires aux règles actives.
pub fn required_lookback(settings: &GameSettings) -> usize {
    let streak = |n: Option<usize>| n.map_or(0, |n| n.saturating_sub(1));
    [
        streak(settings.secondary_streak_soft),
        streak(settings.secondary_streak_hard),
        usize::from(settings.secondary_repeat_latest),
        settings.primary_streak.saturating_sub(1),
        2,
    ]
    .into_iter()
    .max()
    .unwrap_or(2)
}

/// Évalue les règles actives sur un tirage historique.
/// `history[0]` est le tirage évalué, suivi de ses prédécesseurs.
pub fn evaluate_draw(
    game: Game,
    settings: &GameSettings,
    history: &[Draw],
) -> BTreeMap<RuleId, RuleResult> {
    let Some((current, previous)) = history.split_first() else {
        return BTreeMap::new();
    };
    log::debug!(
        "Règles {} {} : {} tirages antérieurs disponibles",
        game,
        current.issue,
        previous.len()
    );
    check_combination(
        game,
        settings,
        &current.primary,
        &current.secondary,
        previous,
        &enabled_rules(settings),
    )
}

/// Applique `rules` à une combinaison nue. `previous[0]` est le tirage immédiatement antérieur.
pub fn check_combination(
    game: Game,
    settings: &GameSettings,
    primary: &[u8],
    secondary: &[u8],
    previous: &[Draw],
    rules: &[RuleId],
) -> BTreeMap<RuleId, RuleResult> {
    rules
        .iter()
        .filter(|r| r.is_enabled(settings))
        .map(|&rule| {
            let result = match rule {
                RuleId::SecondaryStreakSoft => secondary_streak_soft(settings, secondary, previous),
                RuleId::SecondaryStreakHard => secondary_streak_hard(settings, secondary, previous),
                RuleId::SecondaryRepeatLatest => secondary_repeat_latest(secondary, previous),
                RuleId::PrimaryStreak => primary_streak(settings, primary, previous),
                RuleId::ZoneCoverage => zone_coverage(game, settings, primary),
                RuleId::OverlapPreviousTwo => overlap_previous_two(settings, primary, previous),
                RuleId::ConsecutiveRun => consecutive_run(settings, primary),
            };
            log::debug!("  {} : {} ({})", rule, if result.passed { "ok" } else { "échec" }, result.message);
            (rule, result)
        })
        .collect()
}

pub fn all_passed(results: &BTreeMap<RuleId, RuleResult>) -> bool {
    results.values().all(|r| r.passed)
}

/// Plus longue série de tirages consécutifs (tirage courant inclus) contenant
/// l'un des complémentaires, avec le numéro concerné.
fn longest_secondary_streak(secondary: &[u8], previous: &[Draw]) -> Option<(u8, usize)> {
    secondary
        .iter()
        .map(|&n| {
            let run = previous.iter().take_while(|d| d.secondary.contains(&n)).count();
            (n, run + 1)
        })
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
}

fn secondary_streak_soft(settings: &GameSettings, secondary: &[u8], previous: &[Draw]) -> RuleResult {
    let Some(soft) = settings.secondary_streak_soft else {
        return RuleResult::pass("règle désactivée");
    };
    if previous.len() + 1 < soft {
        return RuleResult::pass(format!("historique insuffisant ({} tirages, {} requis)", previous.len() + 1, soft));
    }
    let hard = settings.secondary_streak_hard.unwrap_or(usize::MAX);
    match longest_secondary_streak(secondary, previous) {
        // Au-delà du seuil dur, seule la variante dure échoue
        Some((n, streak)) if streak >= soft && streak < hard => RuleResult::fail(format!(
            "complémentaire {n} sorti {streak} tirages de suite (>= {soft})"
        )),
        _ => RuleResult::pass(format!("aucun complémentaire sorti entre {soft} et {} tirages de suite", hard.saturating_sub(1))),
    }
}

fn secondary_streak_hard(settings: &GameSettings, secondary: &[u8], previous: &[Draw]) -> RuleResult {
    let Some(hard) = settings.secondary_streak_hard else {
        return RuleResult::pass("règle désactivée");
    };
    if previous.len() + 1 < hard {
        return RuleResult::pass(format!("historique insuffisant ({} tirages, {} requis)", previous.len() + 1, hard));
    }
    match longest_secondary_streak(secondary, previous) {
        Some((n, streak)) if streak >= hard => RuleResult::fail(format!(
            "complémentaire {n} sorti {streak} tirages de suite (>= {hard})"
        )),
        _ => RuleResult::pass(format!("aucun complémentaire sorti {hard} tirages de suite")),
    }
}

fn secondary_repeat_latest(secondary: &[u8], previous: &[Draw]) -> RuleResult {
    let Some(latest) = previous.first() else {
        return RuleResult::pass("historique insuffisant (aucun tirage précédent)");
    };
    let repeated: Vec<u8> = secondary.iter().copied().filter(|n| latest.secondary.contains(n)).collect();
    if repeated.is_empty() {
        RuleResult::pass(format!("aucun complémentaire commun avec le tirage {}", latest.issue))
    } else {
        RuleResult::fail(format!("complémentaires {:?} déjà sortis au tirage {}", repeated, latest.issue))
    }
}

fn primary_streak(settings: &GameSettings, primary: &[u8], previous: &[Draw]) -> RuleResult {
    let span = settings.primary_streak;
    let needed = span.saturating_sub(1);
    if previous.len() < needed {
        return RuleResult::pass(format!("historique insuffisant ({} tirages, {} requis)", previous.len() + 1, span));
    }
    let window = &previous[..needed];
    match primary.iter().find(|n| window.iter().all(|d| d.primary.contains(n))) {
        Some(n) => RuleResult::fail(format!("numéro {n} sorti {span} tirages de suite")),
        None => RuleResult::pass(format!("aucun numéro sorti {span} tirages de suite")),
    }
}

fn zone_coverage(game: Game, settings: &GameSettings, primary: &[u8]) -> RuleResult {
    let zones: BTreeSet<usize> = primary
        .iter()
        .filter_map(|&n| game.zones().iter().position(|&(lo, hi)| (lo..=hi).contains(&n)))
        .collect();
    let min = settings.zone_min_count;
    if zones.len() >= min {
        RuleResult::pass(format!("numéros répartis sur {} zones (>= {min})", zones.len()))
    } else {
        RuleResult::fail(format!("numéros répartis sur {} zones seulement (< {min})", zones.len()))
    }
}

fn overlap_previous_two(settings: &GameSettings, primary: &[u8], previous: &[Draw]) -> RuleResult {
    if previous.len() < 2 {
        return RuleResult::pass("historique insuffisant (2 tirages précédents requis)");
    }
    let union: BTreeSet<u8> = previous[..2].iter().flat_map(|d| d.primary.iter().copied()).collect();
    let shared = primary.iter().filter(|n| union.contains(n)).count();
    let max = settings.previous_two_max_repeat;
    if shared <= max {
        RuleResult::pass(format!("{shared} numéros communs avec les 2 tirages précédents (<= {max})"))
    } else {
        RuleResult::fail(format!("{shared} numéros communs avec les 2 tirages précédents (> {max})"))
    }
}

fn consecutive_run(settings: &GameSettings, primary: &[u8]) -> RuleResult {
    let max = settings.max_consecutive;
    match consecutive_groups(primary).into_iter().find(|g| g.len() > max) {
        Some(group) => RuleResult::fail(format!("suite de {} numéros consécutifs {:?} (> {max})", group.len(), group)),
        None => RuleResult::pass(format!("aucune suite de plus de {max} numéros consécutifs")),
    }
}
