mod display;
mod import;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use loterie_core::config::{load_settings, settings_path};
use loterie_core::predictor::date_seed;
use loterie_core::ticket::{Ticket, TicketShape};
use loterie_core::Analyzer;
use loterie_db::db::{count_draws, db_path, fetch_last_draws, migrate, open_db, SqliteDraws};
use loterie_db::models::Game;
use loterie_db::rusqlite::Connection;
use crate::display::{
    display_batch, display_breakdown, display_combinations, display_draws, display_import_summary,
    display_outcome, display_rules, display_stats, display_window_report,
};

#[derive(Parser)]
#[command(name = "loterie", about = "Analyse des tirages SSQ et DLT")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer les tirages depuis un fichier CSV
    Import {
        /// Jeu (ssq ou dlt)
        #[arg(short, long)]
        game: Game,

        /// Chemin vers le fichier CSV (séparateur ';')
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        #[arg(short, long)]
        game: Game,

        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Statistiques par numéro et profil des tirages
    Stats {
        #[arg(short, long)]
        game: Game,

        /// Fenêtre d'analyse (défaut : réglages, 0 = tout l'historique)
        #[arg(short, long)]
        window: Option<usize>,

        /// Taille des listes chaud / froid
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Vérifier les règles sur un tirage historique
    Rules {
        #[arg(short, long)]
        game: Game,

        /// Numéro de tirage (défaut : le dernier)
        #[arg(short, long)]
        issue: Option<String>,
    },

    /// Générer des grilles pondérées
    Predict {
        #[arg(short, long)]
        game: Game,

        /// Nombre de grilles (défaut : réglages)
        #[arg(short, long)]
        count: Option<usize>,

        /// Numéros principaux par grille (grille multiple au-delà du standard)
        #[arg(long)]
        primary: Option<usize>,

        /// Complémentaires par grille
        #[arg(long)]
        secondary: Option<usize>,

        /// Seed pour la reproductibilité (défaut : date du jour)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Calculer les gains d'une grille
    Check {
        #[arg(short, long)]
        game: Game,

        /// Numéros principaux, séparés par des virgules
        #[arg(short, long, value_delimiter = ',', required = true)]
        primary: Vec<u8>,

        /// Complémentaires, séparés par des virgules
        #[arg(short, long, value_delimiter = ',', required = true)]
        secondary: Vec<u8>,

        /// Tirage précis ; sinon les derniers tirages
        #[arg(short, long)]
        issue: Option<String>,

        /// Nombre de tirages joués (défaut : réglages)
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Simuler le nombre de tirages avant un premier rang
    Simulate {
        #[arg(short, long)]
        game: Game,

        #[arg(short, long, value_delimiter = ',', required = true)]
        primary: Vec<u8>,

        #[arg(short, long, value_delimiter = ',', required = true)]
        secondary: Vec<u8>,

        /// Nombre maximal de tirages simulés (défaut : réglages)
        #[arg(short, long)]
        max_draws: Option<u64>,

        /// Simulations indépendantes lancées en parallèle
        #[arg(short, long, default_value = "1")]
        runs: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Afficher les réglages et leur emplacement
    Settings,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { game, file } => cmd_import(&conn, game, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { game, last } => cmd_list(&conn, game, last),
        Command::Stats { game, window, top } => cmd_stats(&conn, game, window, top),
        Command::Rules { game, issue } => cmd_rules(&conn, game, issue),
        Command::Predict { game, count, primary, secondary, seed } => {
            cmd_predict(&conn, game, count, primary, secondary, seed)
        }
        Command::Check { game, primary, secondary, issue, window } => {
            cmd_check(&conn, game, &primary, &secondary, issue, window)
        }
        Command::Simulate { game, primary, secondary, max_draws, runs, seed } => {
            cmd_simulate(&conn, game, &primary, &secondary, max_draws, runs, seed)
        }
        Command::Settings => cmd_settings(),
    }
}

/// Vrai si la base contient des tirages du jeu, sinon affiche un rappel.
fn ensure_draws(conn: &Connection, game: Game) -> Result<bool> {
    if count_draws(conn, game)? == 0 {
        println!("Aucun tirage {game}. Lancez d'abord : loterie import --game {}", game.code());
        return Ok(false);
    }
    Ok(true)
}

fn cmd_import(conn: &Connection, game: Game, file: &PathBuf) -> Result<()> {
    let result = import::import_csv(conn, game, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, game: Game, last: u32) -> Result<()> {
    if !ensure_draws(conn, game)? {
        return Ok(());
    }
    let draws = fetch_last_draws(conn, game, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, game: Game, window: Option<usize>, top: usize) -> Result<()> {
    if !ensure_draws(conn, game)? {
        return Ok(());
    }
    let source = SqliteDraws::new(conn);
    let analyzer = Analyzer::new(&source, load_settings(&settings_path()));
    let stats = analyzer.window_stats(game, window)?;
    display_stats(&stats, top);
    Ok(())
}

fn cmd_rules(conn: &Connection, game: Game, issue: Option<String>) -> Result<()> {
    if !ensure_draws(conn, game)? {
        return Ok(());
    }
    let issue = match issue {
        Some(issue) => issue,
        None => fetch_last_draws(conn, game, 1)?
            .into_iter()
            .next()
            .map(|d| d.issue)
            .context("Aucun tirage disponible")?,
    };
    let source = SqliteDraws::new(conn);
    let analyzer = Analyzer::new(&source, load_settings(&settings_path()));
    let results = analyzer.evaluate_rules(game, &issue)?;
    display_rules(game, &issue, &results);
    Ok(())
}

fn cmd_predict(
    conn: &Connection,
    game: Game,
    count: Option<usize>,
    primary: Option<usize>,
    secondary: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let settings = load_settings(&settings_path());
    let count = count.unwrap_or(settings.prediction_count);
    let standard = TicketShape::standard(game);
    let shape = TicketShape {
        primary: primary.unwrap_or(standard.primary),
        secondary: secondary.unwrap_or(standard.secondary),
    };
    if count_draws(conn, game)? == 0 {
        log::warn!("Aucun tirage {game} en base : poids uniformes");
    }

    let source = SqliteDraws::new(conn);
    let analyzer = Analyzer::new(&source, settings);
    let combinations = analyzer.generate_candidates(game, count, shape, Some(seed.unwrap_or_else(date_seed)))?;
    display_combinations(&combinations, count);
    Ok(())
}

fn cmd_check(
    conn: &Connection,
    game: Game,
    primary: &[u8],
    secondary: &[u8],
    issue: Option<String>,
    window: Option<usize>,
) -> Result<()> {
    let ticket = Ticket::new(game, primary, secondary)?;
    if !ensure_draws(conn, game)? {
        return Ok(());
    }
    let source = SqliteDraws::new(conn);
    let analyzer = Analyzer::new(&source, load_settings(&settings_path()));

    match issue {
        Some(issue) => {
            let breakdown = analyzer.check_ticket_against(&ticket, &issue)?;
            display_breakdown(&breakdown);
        }
        None => {
            let report = analyzer.compute_prizes_over_window(&ticket, window)?;
            display_window_report(&report);
        }
    }
    Ok(())
}

fn cmd_simulate(
    conn: &Connection,
    game: Game,
    primary: &[u8],
    secondary: &[u8],
    max_draws: Option<u64>,
    runs: usize,
    seed: Option<u64>,
) -> Result<()> {
    let ticket = Ticket::new(game, primary, secondary)?;
    let source = SqliteDraws::new(conn);
    let analyzer = Analyzer::new(&source, load_settings(&settings_path()));
    let today = chrono::Local::now().date_naive();
    let budget = max_draws.unwrap_or(analyzer.settings().simulation_max_draws);

    if runs > 1 {
        let (_, summary) = analyzer.simulate_many(&ticket, runs, Some(budget), seed.unwrap_or_else(date_seed), today);
        display_batch(&summary);
        return Ok(());
    }

    let pb = ProgressBar::new(budget);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?
        .progress_chars("=> "),
    );
    let outcome = analyzer.simulate_win_time(&ticket, Some(budget), seed, today, |draws| pb.set_position(draws));
    pb.finish_and_clear();
    display_outcome(&outcome);
    Ok(())
}

fn cmd_settings() -> Result<()> {
    let path = settings_path();
    let settings = load_settings(&path);
    println!("Réglages : {}\n", path.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
