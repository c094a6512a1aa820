use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use loterie_db::models::Game;

/// Réglages propres à un jeu. Chaque champ a une valeur par défaut : une clé
/// absente du fichier ne fait jamais échouer le chargement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Poids attribués aux K numéros principaux les plus en retard, rang 1 en premier.
    pub omission_weights: Vec<f64>,
    /// Fenêtre (tirages) sur laquelle le retard est mesuré.
    pub omission_window: usize,
    pub recent_draws: usize,
    pub recent_threshold: usize,
    pub recent_weight: f64,
    /// Exclut les complémentaires des N derniers tirages (0 = désactivé).
    pub exclude_latest_secondary: usize,
    pub secondary_streak_soft: Option<usize>,
    pub secondary_streak_hard: Option<usize>,
    pub secondary_repeat_latest: bool,
    pub primary_streak: usize,
    pub zone_min_count: usize,
    pub previous_two_max_repeat: usize,
    pub max_consecutive: usize,
    pub primary_size_midpoint: u8,
    pub secondary_size_midpoint: u8,
    /// Jours de tirage, 1 = lundi … 7 = dimanche.
    pub draw_weekdays: Vec<u32>,
}

impl GameSettings {
    pub fn defaults_for(game: Game) -> Self {
        match game {
            Game::Ssq => Self {
                omission_weights: vec![0.01, 0.015, 0.02, 0.03, 0.03, 0.03],
                omission_window: 100,
                recent_draws: 10,
                recent_threshold: 5,
                recent_weight: 0.40,
                exclude_latest_secondary: 1,
                secondary_streak_soft: Some(3),
                secondary_streak_hard: Some(5),
                secondary_repeat_latest: false,
                primary_streak: 3,
                zone_min_count: 2,
                previous_two_max_repeat: 2,
                max_consecutive: 3,
                primary_size_midpoint: 17,
                secondary_size_midpoint: 9,
                draw_weekdays: vec![2, 4, 7],
            },
            Game::Dlt => Self {
                omission_weights: vec![0.01, 0.015, 0.02, 0.03, 0.03],
                omission_window: 100,
                recent_draws: 10,
                recent_threshold: 8,
                recent_weight: 0.40,
                exclude_latest_secondary: 0,
                secondary_streak_soft: None,
                secondary_streak_hard: Some(5),
                secondary_repeat_latest: true,
                primary_streak: 3,
                zone_min_count: 2,
                previous_two_max_repeat: 2,
                max_consecutive: 3,
                primary_size_midpoint: 18,
                secondary_size_midpoint: 7,
                draw_weekdays: vec![1, 3, 6],
            },
        }
    }

    pub fn weekdays(&self) -> Vec<Weekday> {
        self.draw_weekdays
            .iter()
            .filter_map(|&d| match d {
                1 => Some(Weekday::Mon),
                2 => Some(Weekday::Tue),
                3 => Some(Weekday::Wed),
                4 => Some(Weekday::Thu),
                5 => Some(Weekday::Fri),
                6 => Some(Weekday::Sat),
                7 => Some(Weekday::Sun),
                other => {
                    log::warn!("Jour de tirage ignoré : {other} (attendu 1-7)");
                    None
                }
            })
            .collect()
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::defaults_for(Game::Ssq)
    }
}

/// Période de relâche annuelle : début « MM-JJ » et durée en semaines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub start: String,
    pub duration_weeks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "ssq_settings")]
    pub ssq: GameSettings,
    #[serde(deserialize_with = "dlt_settings")]
    pub dlt: GameSettings,
    /// Prix d'une mise simple.
    pub bet_price: u64,
    pub prediction_count: usize,
    /// Rejette les grilles générées qui échouent aux règles de zone, de suite et de répétition.
    pub filter_candidates: bool,
    pub prize_check_range: usize,
    /// Tirages analysés par `stats` (0 = tout l'historique).
    pub stats_window: usize,
    pub simulation_max_draws: u64,
    /// Limite de temps d'une simulation, en secondes (0 = aucune).
    pub simulation_max_seconds: u64,
    pub annual_holidays: Vec<Holiday>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ssq: GameSettings::defaults_for(Game::Ssq),
            dlt: GameSettings::defaults_for(Game::Dlt),
            bet_price: 2,
            prediction_count: 10,
            filter_candidates: true,
            prize_check_range: 1,
            stats_window: 100,
            simulation_max_draws: 50_000_000,
            simulation_max_seconds: 0,
            annual_holidays: vec![
                Holiday { start: "01-28".to_string(), duration_weeks: 1 },
                Holiday { start: "10-01".to_string(), duration_weeks: 1 },
            ],
        }
    }
}

impl Settings {
    pub fn game(&self, game: Game) -> &GameSettings {
        match game {
            Game::Ssq => &self.ssq,
            Game::Dlt => &self.dlt,
        }
    }
}

/// Superpose les clés présentes sur les défauts du jeu, pour qu'une clé absente
/// reprenne la valeur de ce jeu et non celle d'un autre.
fn overlay_game<'de, D>(game: Game, deserializer: D) -> std::result::Result<GameSettings, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let partial = serde_json::Value::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(GameSettings::defaults_for(game))
        .map_err(serde::de::Error::custom)?;
    if let (Some(target), serde_json::Value::Object(keys)) = (merged.as_object_mut(), partial) {
        for (key, value) in keys {
            target.insert(key, value);
        }
    }
    serde_json::from_value(merged).map_err(serde::de::Error::custom)
}

fn ssq_settings<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<GameSettings, D::Error> {
    overlay_game(Game::Ssq, d)
}

fn dlt_settings<'de, D: serde::Deserializer<'de>>(d: D) -> std::result::Result<GameSettings, D::Error> {
    overlay_game(Game::Dlt, d)
}

pub fn settings_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("settings.json");
    path
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
        .with_context(|| format!("Impossible d'écrire {:?}", path))?;
    Ok(())
}

/// Charge les réglages. Fichier absent : les valeurs par défaut sont écrites puis
/// retournées. Fichier illisible : valeurs par défaut, avec un avertissement.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        let settings = Settings::default();
        if let Err(e) = save_settings(&settings, path) {
            log::warn!("Réglages par défaut non sauvegardés : {e:#}");
        }
        return settings;
    }

    let parsed = std::fs::read_to_string(path)
        .context("Lecture impossible")
        .and_then(|json| serde_json::from_str::<Settings>(&json).context("JSON invalide"));

    match parsed {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Réglages {:?} ignorés ({e:#}), valeurs par défaut utilisées", path);
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_game() {
        let settings = Settings::default();
        assert_eq!(settings.game(Game::Ssq).omission_weights.len(), 6);
        assert_eq!(settings.game(Game::Dlt).recent_threshold, 8);
        assert_eq!(settings.game(Game::Dlt).secondary_streak_soft, None);
        assert_eq!(settings.bet_price, 2);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let json = r#"{ "bet_price": 3, "dlt": { "recent_weight": 0.5 } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.bet_price, 3);
        assert!((settings.dlt.recent_weight - 0.5).abs() < 1e-12);
        // Les clés absentes reprennent les défauts du jeu concerné
        assert_eq!(settings.dlt.recent_threshold, 8);
        assert!(settings.dlt.secondary_repeat_latest);
        assert_eq!(settings.ssq, GameSettings::defaults_for(Game::Ssq));
    }

    #[test]
    fn test_weekdays_mapping() {
        let settings = Settings::default();
        assert_eq!(settings.ssq.weekdays(), vec![Weekday::Tue, Weekday::Thu, Weekday::Sun]);
        let mut odd = GameSettings::default();
        odd.draw_weekdays = vec![0, 1, 9];
        assert_eq!(odd.weekdays(), vec![Weekday::Mon]);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");
        let settings = load_settings(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_load_malformed_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.prediction_count = 3;
        settings.ssq.recent_weight = 0.25;
        save_settings(&settings, &path).unwrap();
        assert_eq!(load_settings(&path), settings);
    }
}
