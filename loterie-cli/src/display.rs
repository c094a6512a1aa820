use std::collections::BTreeMap;

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use loterie_core::predictor::Combination;
use loterie_core::prize::{Payout, PrizeBreakdown, PrizeTier, WindowReport};
use loterie_core::rules::{RuleId, RuleResult};
use loterie_core::simulator::{BatchSummary, ExhaustReason, SimulationOutcome};
use loterie_core::stats::{self, BallStat, Tally, WindowStats};
use loterie_db::models::{Draw, Game};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:02}", n))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_amount(amount: Option<u64>) -> String {
    match amount {
        Some(a) => a.to_string(),
        None => "—".to_string(),
    }
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Tirage", "Date", "Principaux", "Complémentaires", "Ventes", "Cagnotte", "Gain R1"]);
    for draw in draws {
        table.add_row(vec![
            draw.issue.clone(),
            draw.date.format("%Y-%m-%d").to_string(),
            join_numbers(&draw.primary),
            join_numbers(&draw.secondary),
            draw.sales.to_string(),
            draw.jackpot.to_string(),
            format_amount(draw.prize_amount(1)),
        ]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}

fn ball_table(ball_stats: &[BallStat]) -> Table {
    let mut table = new_table(vec!["Numéro", "Sorties", "Fréquence", "Retard", "Retard max"]);
    for stat in ball_stats {
        table.add_row(vec![
            format!("{:02}", stat.number),
            stat.count.to_string(),
            format!("{:.2} %", stat.frequency),
            stat.current_omission.to_string(),
            stat.max_omission.to_string(),
        ]);
    }
    table
}

fn tally_line(label: &str, tally: &Tally) {
    let parts = tally
        .iter()
        .map(|(k, v)| format!("{k} ({v})"))
        .collect::<Vec<_>>()
        .join(", ");
    println!("  {:<22}: {}", label, if parts.is_empty() { "—".to_string() } else { parts });
}

pub fn display_stats(stats: &WindowStats, top: usize) {
    println!("\n📊 {} : statistiques sur les {} derniers tirages\n", stats.game, stats.window);

    println!("── Numéros principaux ──");
    println!("{}", ball_table(&stats.primary));
    println!("\n── Complémentaires ──");
    println!("{}", ball_table(&stats.secondary));

    let numbers = |list: Vec<BallStat>| list.iter().map(|s| format!("{:02}", s.number)).collect::<Vec<_>>().join(" ");
    println!("\n🔥 Plus fréquents : {}", numbers(stats::hottest(&stats.primary, top)));
    println!("❄️  Plus en retard : {}", numbers(stats::coldest(&stats.primary, top)));

    let profile = &stats.profile;
    println!("\n── Profil des tirages ──");
    tally_line("Grands:petits", &profile.size_ratio);
    tally_line("Impairs:pairs", &profile.odd_even);
    tally_line("Premiers:composés", &profile.prime_ratio);
    tally_line("Modulo 3", &profile.mod3);
    tally_line("Suites", &profile.run_count);
    tally_line("Suite la plus longue", &profile.max_run);
    tally_line("Répétitions", &profile.repeats);
    tally_line("Valeur AC", &profile.ac);
    tally_line("Compl. grands:petits", &profile.secondary_size_ratio);
    println!(
        "  {:<22}: min {} / moy {:.1} / max {}",
        "Somme", profile.sum.min, profile.sum.mean, profile.sum.max
    );
    println!(
        "  {:<22}: min {} / moy {:.1} / max {}",
        "Étendue", profile.span.min, profile.span.mean, profile.span.max
    );
}

pub fn display_rules(game: Game, issue: &str, results: &BTreeMap<RuleId, RuleResult>) {
    println!("\n📏 Règles {game}, tirage {issue}\n");
    let mut table = new_table(vec!["Règle", "Résultat", "Détail"]);
    for (rule, result) in results {
        let (label, color) = if result.passed {
            ("ok", Color::Green)
        } else {
            ("échec", Color::Red)
        };
        table.add_row(vec![
            Cell::new(rule.name()),
            Cell::new(label).fg(color),
            Cell::new(&result.message),
        ]);
    }
    println!("{table}");
}

pub fn display_combinations(combinations: &[Combination], requested: usize) {
    println!("\n🎲 Suggestions de grilles\n");
    let mut table = new_table(vec!["#", "Principaux", "Complémentaires", "Score"]);
    for (i, combo) in combinations.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            join_numbers(&combo.primary),
            join_numbers(&combo.secondary),
            format!("{:.4}", combo.score),
        ]);
    }
    println!("{table}");
    if combinations.len() < requested {
        println!("Seulement {} grilles sur {} demandées.", combinations.len(), requested);
    }
}

fn payout_label(tier: &PrizeTier) -> String {
    match tier.payout {
        Payout::Fixed(amount) => amount.to_string(),
        Payout::Floating => "variable".to_string(),
    }
}

pub fn display_breakdown(breakdown: &PrizeBreakdown) {
    println!(
        "Tirage {} : {} bons principaux, {} bons complémentaires",
        breakdown.issue, breakdown.matched_primary, breakdown.matched_secondary
    );
    if breakdown.hits.is_empty() {
        println!("  Aucun gain.");
        return;
    }
    let mut table = new_table(vec!["Rang", "Combinaison", "Mises", "Gain unitaire"]);
    for hit in &breakdown.hits {
        table.add_row(vec![
            hit.tier.level.to_string(),
            hit.tier.label(),
            hit.count.to_string(),
            format_amount(hit.amount),
        ]);
    }
    println!("{table}");
}

pub fn display_window_report(report: &WindowReport) {
    for breakdown in &report.draws {
        display_breakdown(breakdown);
    }

    println!("\n── Bilan sur {} tirages ──", report.draws.len());
    let mut table = new_table(vec!["Rang", "Combinaison", "Barème", "Mises gagnantes"]);
    for (tier, count) in report.tier_counts.iter().filter(|(_, c)| *c > 0) {
        table.add_row(vec![
            tier.level.to_string(),
            tier.label(),
            payout_label(tier),
            count.to_string(),
        ]);
    }
    println!("{table}");
    println!("  Mise totale      : {}", report.stake);
    println!("  Gains connus     : {}", report.winnings);
    if report.unknown_bets > 0 {
        println!("  Gains non publiés: {} mises", report.unknown_bets);
    }
    println!("  Rendement        : {:.2} %", report.return_ratio * 100.0);
}

fn tier_table(tier_counts: &[(PrizeTier, u64)]) -> Table {
    let mut table = new_table(vec!["Rang", "Combinaison", "Mises gagnantes"]);
    for (tier, count) in tier_counts {
        table.add_row(vec![tier.level.to_string(), tier.label(), count.to_string()]);
    }
    table
}

pub fn display_outcome(outcome: &SimulationOutcome) {
    match outcome {
        SimulationOutcome::Won { draws, tier_counts, projected_date, projected_stake } => {
            println!("\n🏆 Premier rang atteint après {} tirages", draws);
            match projected_date {
                Some(date) => println!("  Date projetée   : {}", date.format("%Y-%m-%d")),
                None => println!("  Date projetée   : hors calendrier"),
            }
            println!("  Mise cumulée    : {}", projected_stake);
            println!("{}", tier_table(tier_counts));
        }
        SimulationOutcome::Exhausted { draws, tier_counts, reason } => {
            let why = match reason {
                ExhaustReason::Budget => "budget de tirages épuisé",
                ExhaustReason::Deadline => "délai dépassé",
            };
            println!("\n⏹  Aucun premier rang après {} tirages ({})", draws, why);
            println!("{}", tier_table(tier_counts));
        }
    }
}

pub fn display_batch(summary: &BatchSummary) {
    println!("\n── {} simulations ──", summary.runs);
    println!("  Premiers rangs  : {}", summary.wins);
    if let (Some(mean), Some(min), Some(max)) =
        (summary.mean_draws_to_win, summary.min_draws_to_win, summary.max_draws_to_win)
    {
        println!("  Tirages (moy.)  : {:.0}", mean);
        println!("  Tirages (min)   : {}", min);
        println!("  Tirages (max)   : {}", max);
    }
}
