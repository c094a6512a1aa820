use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::models::{Draw, Game, PrizeRecord};
use crate::source::DrawSource;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    game          TEXT NOT NULL,
    issue         TEXT NOT NULL,
    date          TEXT NOT NULL,
    primary_nums  TEXT NOT NULL,
    second_nums   TEXT NOT NULL,
    sales         INTEGER NOT NULL DEFAULT 0,
    jackpot       INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (game, issue)
);
CREATE TABLE IF NOT EXISTS prizes (
    game          TEXT NOT NULL,
    issue         TEXT NOT NULL,
    level         INTEGER NOT NULL,
    winners       INTEGER NOT NULL DEFAULT 0,
    amount        INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (game, issue, level)
);
";

const DRAW_COLUMNS: &str = "issue, date, primary_nums, second_nums, sales, jackpot";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("loterie.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(",")
}

fn split_numbers(raw: &str) -> Result<Vec<u8>> {
    let mut numbers = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Numéros illisibles : '{}'", raw))?;
    numbers.sort();
    Ok(numbers)
}

/// Insère un tirage et son palmarès. Un tirage déjà présent est ignoré (retourne false).
pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (game, issue, date, primary_nums, second_nums, sales, jackpot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            draw.game.code(),
            draw.issue,
            draw.date.format("%Y-%m-%d").to_string(),
            join_numbers(&draw.primary),
            join_numbers(&draw.secondary),
            draw.sales as i64,
            draw.jackpot as i64,
        ],
    ).context("Échec de l'insertion")?;

    if changed == 0 {
        return Ok(false);
    }

    for prize in &draw.prizes {
        conn.execute(
            "INSERT OR REPLACE INTO prizes (game, issue, level, winners, amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draw.game.code(),
                draw.issue,
                prize.level,
                prize.winners as i64,
                prize.amount as i64,
            ],
        ).context("Échec de l'insertion du palmarès")?;
    }
    Ok(true)
}

struct DrawRow {
    issue: String,
    date: String,
    primary: String,
    secondary: String,
    sales: i64,
    jackpot: i64,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawRow> {
    Ok(DrawRow {
        issue: row.get(0)?,
        date: row.get(1)?,
        primary: row.get(2)?,
        secondary: row.get(3)?,
        sales: row.get(4)?,
        jackpot: row.get(5)?,
    })
}

fn load_prizes(conn: &Connection, game: Game, issue: &str) -> Result<Vec<PrizeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT level, winners, amount FROM prizes WHERE game = ?1 AND issue = ?2 ORDER BY level"
    )?;
    let prizes = stmt.query_map(params![game.code(), issue], |row| {
        Ok(PrizeRecord {
            level: row.get(0)?,
            winners: row.get::<_, i64>(1)?.max(0) as u64,
            amount: row.get::<_, i64>(2)?.max(0) as u64,
        })
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(prizes)
}

fn into_draw(conn: &Connection, game: Game, row: DrawRow) -> Result<Draw> {
    let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
        .with_context(|| format!("Date invalide pour le tirage {} : '{}'", row.issue, row.date))?;
    let prizes = load_prizes(conn, game, &row.issue)?;
    Ok(Draw {
        game,
        primary: split_numbers(&row.primary)?,
        secondary: split_numbers(&row.secondary)?,
        date,
        sales: row.sales.max(0) as u64,
        jackpot: row.jackpot.max(0) as u64,
        prizes,
        issue: row.issue,
    })
}

pub fn fetch_last_draws(conn: &Connection, game: Game, limit: u32) -> Result<Vec<Draw>> {
    let sql = format!(
        "SELECT {DRAW_COLUMNS} FROM draws WHERE game = ?1 ORDER BY issue DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![game.code(), limit], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| into_draw(conn, game, row)).collect()
}

pub fn fetch_draw(conn: &Connection, game: Game, issue: &str) -> Result<Option<Draw>> {
    let sql = format!("SELECT {DRAW_COLUMNS} FROM draws WHERE game = ?1 AND issue = ?2");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![game.code(), issue], read_row)?;
    match rows.next() {
        Some(row) => Ok(Some(into_draw(conn, game, row?)?)),
        None => Ok(None),
    }
}

/// Le tirage `issue` et ses prédécesseurs, du plus récent au plus ancien.
pub fn fetch_draws_up_to(conn: &Connection, game: Game, issue: &str, limit: u32) -> Result<Vec<Draw>> {
    let sql = format!(
        "SELECT {DRAW_COLUMNS} FROM draws WHERE game = ?1 AND issue <= ?2 ORDER BY issue DESC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![game.code(), issue, limit], read_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| into_draw(conn, game, row)).collect()
}

pub fn count_draws(conn: &Connection, game: Game) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM draws WHERE game = ?1",
        [game.code()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Historique adossé à SQLite.
pub struct SqliteDraws<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDraws<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn clamp_limit(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl DrawSource for SqliteDraws<'_> {
    fn latest(&self, game: Game, n: usize) -> Result<Vec<Draw>> {
        fetch_last_draws(self.conn, game, clamp_limit(n))
    }

    fn by_issue(&self, game: Game, issue: &str) -> Result<Option<Draw>> {
        fetch_draw(self.conn, game, issue)
    }

    fn up_to(&self, game: Game, issue: &str, n: usize) -> Result<Vec<Draw>> {
        fetch_draws_up_to(self.conn, game, issue, clamp_limit(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::make_draw;

    fn test_draw(issue: &str) -> Draw {
        make_draw(Game::Ssq, issue, &[3, 1, 2, 4, 5, 6], &[7])
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = test_conn();
        assert_eq!(count_draws(&conn, Game::Ssq).unwrap(), 0);

        insert_draw(&conn, &test_draw("2024001")).unwrap();
        assert_eq!(count_draws(&conn, Game::Ssq).unwrap(), 1);
        assert_eq!(count_draws(&conn, Game::Dlt).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = test_conn();

        let inserted = insert_draw(&conn, &test_draw("2024001")).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw("2024001")).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn, Game::Ssq).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order() {
        let conn = test_conn();

        insert_draw(&conn, &test_draw("2024001")).unwrap();
        insert_draw(&conn, &test_draw("2024003")).unwrap();
        insert_draw(&conn, &test_draw("2024002")).unwrap();

        let draws = fetch_last_draws(&conn, Game::Ssq, 10).unwrap();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].issue, "2024003");
        assert_eq!(draws[1].issue, "2024002");
        assert_eq!(draws[2].issue, "2024001");
    }

    #[test]
    fn test_roundtrip_keeps_numbers_and_prizes() {
        let conn = test_conn();
        let mut draw = test_draw("2024010");
        draw.prizes = vec![
            PrizeRecord { level: 1, winners: 4, amount: 6_000_000 },
            PrizeRecord { level: 2, winners: 120, amount: 150_000 },
        ];
        insert_draw(&conn, &draw).unwrap();

        let loaded = fetch_draw(&conn, Game::Ssq, "2024010").unwrap().unwrap();
        assert_eq!(loaded.primary, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(loaded.secondary, vec![7]);
        assert_eq!(loaded.prize_amount(2), Some(150_000));
        assert!(fetch_draw(&conn, Game::Ssq, "2024011").unwrap().is_none());
    }

    #[test]
    fn test_source_up_to() {
        let conn = test_conn();
        for issue in ["2024001", "2024002", "2024003", "2024004"] {
            insert_draw(&conn, &test_draw(issue)).unwrap();
        }
        let source = SqliteDraws::new(&conn);
        let window = source.up_to(Game::Ssq, "2024003", 2).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].issue, "2024003");
        assert_eq!(window[1].issue, "2024002");
    }
}
