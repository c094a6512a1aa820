use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use loterie_db::rusqlite::Connection;
use std::path::Path;

use loterie_db::db::insert_draw;
use loterie_db::models::{Draw, Game, PrizeRecord, validate_draw};

/// Numéros séparés par des espaces (ou des virgules).
pub fn parse_numbers(raw: &str) -> Result<Vec<u8>> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>()
                .with_context(|| format!("Numéro invalide : '{}'", s))
        })
        .collect()
}

/// Palmarès au format `rang:gagnants:montant|rang:gagnants:montant`.
pub fn parse_prizes(raw: &str) -> Result<Vec<PrizeRecord>> {
    raw.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            if parts.len() != 3 {
                bail!("Palmarès invalide : '{}' (attendu rang:gagnants:montant)", entry);
            }
            Ok(PrizeRecord {
                level: parts[0].parse().with_context(|| format!("Rang invalide : '{}'", parts[0]))?,
                winners: parts[1].parse().with_context(|| format!("Gagnants invalides : '{}'", parts[1]))?,
                amount: parts[2].parse().with_context(|| format!("Montant invalide : '{}'", parts[2]))?,
            })
        })
        .collect()
}

fn parse_amount(raw: &str) -> Result<u64> {
    let s = raw.trim().replace([' ', '\u{a0}'], "");
    if s.is_empty() {
        return Ok(0);
    }
    s.parse::<u64>()
        .with_context(|| format!("Impossible de parser le montant : '{}'", raw))
}

/// AAAA-MM-JJ, ou JJ/MM/AAAA.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .with_context(|| format!("Format de date invalide : '{}'", raw))
}

fn parse_record(game: Game, record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .with_context(|| format!("Champ manquant à l'index {}", idx))
    };
    let optional = |idx: usize| record.get(idx).map(str::trim).unwrap_or_default();

    let issue = get(0)?.to_string();
    if issue.is_empty() {
        bail!("Numéro de tirage vide");
    }
    let date = parse_date(get(1)?)?;
    let mut primary = parse_numbers(get(2)?)?;
    let mut secondary = parse_numbers(get(3)?)?;
    validate_draw(game, &primary, &secondary)
        .with_context(|| format!("Tirage {} invalide", issue))?;
    primary.sort();
    secondary.sort();

    Ok(Draw {
        game,
        issue,
        date,
        primary,
        secondary,
        sales: parse_amount(optional(4))?,
        jackpot: parse_amount(optional(5))?,
        prizes: parse_prizes(optional(6))?,
    })
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, game: Game, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        let draw = record_result
            .context("Ligne illisible")
            .and_then(|record| parse_record(game, &record));
        match draw {
            Ok(draw) => match insert_draw(&tx, &draw) {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    log::error!("Erreur insertion ligne {} : {:#}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                log::error!("Erreur ligne {} : {:#}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Échec du commit")?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loterie_db::db::{count_draws, fetch_draw, migrate};

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_numbers("01 07 12  33").unwrap(), vec![1, 7, 12, 33]);
        assert_eq!(parse_numbers("3,4").unwrap(), vec![3, 4]);
        assert!(parse_numbers("1 x").is_err());
    }

    #[test]
    fn test_parse_prizes() {
        let prizes = parse_prizes("1:4:6000000|2:120:150000").unwrap();
        assert_eq!(prizes.len(), 2);
        assert_eq!(prizes[1], PrizeRecord { level: 2, winners: 120, amount: 150_000 });
        assert!(parse_prizes("").unwrap().is_empty());
        assert!(parse_prizes("1:4").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-05").unwrap(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(parse_date("17/02/2026").unwrap(), NaiveDate::from_ymd_opt(2026, 2, 17).unwrap());
        assert!(parse_date("2024/13/01").is_err());
    }

    #[test]
    fn test_import_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ssq.csv");
        std::fs::write(
            &path,
            "issue;date;primary;secondary;sales;pool;prizes\n\
             2024001;2024-01-02;1 2 3 4 5 6;7;350000000;1200000000;1:2:8000000|2:90:200000\n\
             2024002;2024-01-04;3 9 14 20 27 33;16;;;\n\
             2024002;2024-01-04;3 9 14 20 27 33;16;;;\n\
             2024003;2024-01-07;1 2 3 4 5;7;;;\n",
        )
        .unwrap();

        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = import_csv(&conn, Game::Ssq, &path).unwrap();
        assert_eq!(result.total_records, 4);
        assert_eq!(result.inserted, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(count_draws(&conn, Game::Ssq).unwrap(), 2);

        let draw = fetch_draw(&conn, Game::Ssq, "2024001").unwrap().unwrap();
        assert_eq!(draw.prize_amount(1), Some(8_000_000));
        assert_eq!(draw.jackpot, 1_200_000_000);
    }
}
