use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::config::{GameSettings, Holiday, Settings};

/// Au-delà, les relâches couvrent tous les jours de tirage.
const MAX_IDLE_DAYS: u32 = 366;

/// Fenêtre annuelle sans tirage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Closure {
    month: u32,
    day: u32,
    days: i64,
}

impl Closure {
    fn parse(holiday: &Holiday) -> Option<Self> {
        let (month, day) = holiday.start.trim().split_once('-')?;
        let closure = Closure {
            month: month.parse().ok()?,
            day: day.parse().ok()?,
            days: i64::from(holiday.duration_weeks) * 7,
        };
        // Année bissextile pour accepter le 29 février
        NaiveDate::from_ymd_opt(2024, closure.month, closure.day).map(|_| closure)
    }

    fn start_in(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| NaiveDate::from_ymd_opt(year, self.month, self.day - 1))
    }

    /// Couvre aussi une fenêtre commencée l'année précédente. Une fin hors
    /// calendrier ferme jusqu'à la dernière date représentable.
    fn contains(&self, date: NaiveDate) -> bool {
        [date.year(), date.year() - 1].into_iter().any(|year| {
            self.start_in(year).is_some_and(|start| {
                let end = start
                    .checked_add_signed(Duration::days(self.days))
                    .unwrap_or(NaiveDate::MAX);
                date >= start && (date < end || end == NaiveDate::MAX)
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCalendar {
    weekdays: Vec<Weekday>,
    closures: Vec<Closure>,
}

impl DrawCalendar {
    pub fn new(weekdays: Vec<Weekday>, holidays: &[Holiday]) -> Self {
        let closures = holidays
            .iter()
            .filter_map(|h| {
                let parsed = Closure::parse(h);
                if parsed.is_none() {
                    log::warn!("Période de relâche ignorée : '{}'", h.start);
                }
                parsed
            })
            .collect();
        Self { weekdays, closures }
    }

    pub fn from_settings(game: &GameSettings, settings: &Settings) -> Self {
        Self::new(game.weekdays(), &settings.annual_holidays)
    }

    pub fn is_draw_day(&self, date: NaiveDate) -> bool {
        self.weekdays.contains(&date.weekday()) && !self.closures.iter().any(|c| c.contains(date))
    }

    /// Date du `draws`-ième tirage après `from` (exclu). `None` si aucun jour de
    /// tirage n'est configuré, si une année entière passe sans tirage, ou si la
    /// date sort du calendrier.
    pub fn project(&self, from: NaiveDate, draws: u64) -> Option<NaiveDate> {
        if draws == 0 {
            return Some(from);
        }
        if self.weekdays.is_empty() {
            return None;
        }
        let mut date = from;
        let mut remaining = draws;
        let mut idle = 0;
        while remaining > 0 {
            date = date.succ_opt()?;
            if self.is_draw_day(date) {
                remaining -= 1;
                idle = 0;
            } else {
                idle += 1;
                if idle > MAX_IDLE_DAYS {
                    log::warn!("Aucun jour de tirage pendant un an à partir de {}", from);
                    return None;
                }
            }
        }
        Some(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ssq_calendar() -> DrawCalendar {
        let settings = Settings::default();
        DrawCalendar::from_settings(settings.game(loterie_db::models::Game::Ssq), &settings)
    }

    #[test]
    fn test_project_counts_draw_days() {
        let calendar = ssq_calendar();
        // Lundi 2024-03-04 : mardi, jeudi, dimanche
        let from = ymd(2024, 3, 4);
        assert_eq!(calendar.project(from, 1), Some(ymd(2024, 3, 5)));
        assert_eq!(calendar.project(from, 2), Some(ymd(2024, 3, 7)));
        assert_eq!(calendar.project(from, 3), Some(ymd(2024, 3, 10)));
        assert_eq!(calendar.project(from, 0), Some(from));
    }

    #[test]
    fn test_holiday_is_skipped() {
        let calendar = ssq_calendar();
        assert!(!calendar.is_draw_day(ymd(2024, 10, 1)));
        assert!(!calendar.is_draw_day(ymd(2024, 10, 3)));
        assert!(calendar.is_draw_day(ymd(2024, 10, 8)));
        // Lundi 2024-09-30 : la semaine de relâche est sautée
        assert_eq!(calendar.project(ymd(2024, 9, 30), 1), Some(ymd(2024, 10, 8)));
    }

    #[test]
    fn test_closure_across_new_year() {
        let holidays = vec![Holiday { start: "12-28".to_string(), duration_weeks: 1 }];
        let calendar = DrawCalendar::new(vec![Weekday::Tue], &holidays);
        assert!(!calendar.is_draw_day(ymd(2024, 12, 31)));
        assert!(calendar.is_draw_day(ymd(2025, 1, 7)));
    }

    #[test]
    fn test_no_weekdays_gives_none() {
        let calendar = DrawCalendar::new(Vec::new(), &[]);
        assert_eq!(calendar.project(ymd(2024, 1, 1), 3), None);
    }

    #[test]
    fn test_overflow_gives_none() {
        let calendar = DrawCalendar::new(vec![Weekday::Mon], &[]);
        assert_eq!(calendar.project(NaiveDate::MAX - Duration::days(3), 5), None);
    }

    #[test]
    fn test_closure_covering_every_day_gives_none() {
        let holidays = vec![Holiday { start: "01-01".to_string(), duration_weeks: 60 }];
        let all_days = vec![
            Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu,
            Weekday::Fri, Weekday::Sat, Weekday::Sun,
        ];
        let calendar = DrawCalendar::new(all_days, &holidays);
        assert_eq!(calendar.project(ymd(2024, 3, 4), 1), None);
        // La fin de la relâche dépasse le calendrier : elle reste fermée
        assert!(!calendar.is_draw_day(NaiveDate::MAX - Duration::days(10)));
        assert_eq!(calendar.project(NaiveDate::MAX - Duration::days(400), 1), None);
    }

    #[test]
    fn test_invalid_holiday_ignored() {
        let holidays = vec![Holiday { start: "13-45".to_string(), duration_weeks: 1 }];
        let calendar = DrawCalendar::new(vec![Weekday::Tue], &holidays);
        assert!(calendar.is_draw_day(ymd(2024, 3, 5)));
    }
}
