use std::collections::{BTreeMap, BTreeSet};

use loterie_db::models::{Draw, Game, Pool};

use crate::config::GameSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct BallStat {
    pub number: u8,
    pub count: u32,
    /// Pourcentage des tirages de la fenêtre contenant le numéro.
    pub frequency: f64,
    /// Tirages écoulés depuis la dernière sortie (0 = sorti au dernier tirage).
    pub current_omission: u32,
    pub max_omission: u32,
}

/// Statistiques par numéro sur une fenêtre, draws[0] = tirage le plus récent.
pub fn compute_ball_stats(draws: &[Draw], game: Game, pool: Pool) -> Vec<BallStat> {
    let size = game.pool_size(pool);
    let window = draws.len();

    let mut counts = vec![0u32; size];
    let mut last_seen: Vec<Option<usize>> = vec![None; size];
    let mut current = vec![window as u32; size];
    let mut max_gap = vec![0u32; size];

    for (t, draw) in draws.iter().enumerate() {
        for &n in pool.numbers_from(draw) {
            let idx = (n as usize).wrapping_sub(1);
            if idx >= size {
                continue;
            }
            // Tirages sans le numéro entre cette sortie et la précédente (ou le début)
            let gap = match last_seen[idx] {
                Some(prev) => t - prev - 1,
                None => {
                    current[idx] = t as u32;
                    t
                }
            } as u32;
            max_gap[idx] = max_gap[idx].max(gap);
            counts[idx] += 1;
            last_seen[idx] = Some(t);
        }
    }

    (0..size)
        .map(|idx| {
            // Série d'absences en queue de fenêtre
            let trailing = match last_seen[idx] {
                Some(last) => (window - last - 1) as u32,
                None => window as u32,
            };
            let frequency = if window > 0 {
                counts[idx] as f64 / window as f64 * 100.0
            } else {
                0.0
            };
            BallStat {
                number: (idx + 1) as u8,
                count: counts[idx],
                frequency,
                current_omission: current[idx],
                max_omission: max_gap[idx].max(trailing).max(current[idx]),
            }
        })
        .collect()
}

/// Les `n` numéros les plus fréquents, puis par numéro croissant.
pub fn hottest(stats: &[BallStat], n: usize) -> Vec<BallStat> {
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then(a.number.cmp(&b.number)));
    sorted.truncate(n);
    sorted
}

/// Les `n` numéros au plus fort retard courant.
pub fn coldest(stats: &[BallStat], n: usize) -> Vec<BallStat> {
    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.current_omission.cmp(&a.current_omission).then(a.number.cmp(&b.number)));
    sorted.truncate(n);
    sorted
}

pub fn is_prime(n: u8) -> bool {
    if n < 2 {
        return false;
    }
    (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0)
}

/// Groupes de numéros consécutifs, ex. [1, 2, 3, 5, 6] → [[1, 2, 3], [5, 6]].
pub fn consecutive_groups(numbers: &[u8]) -> Vec<Vec<u8>> {
    let sorted: BTreeSet<u8> = numbers.iter().copied().collect();
    let mut groups: Vec<Vec<u8>> = Vec::new();
    for n in sorted {
        match groups.last_mut() {
            Some(group) if group.last().map(|&l| l + 1) == Some(n) => group.push(n),
            _ => groups.push(vec![n]),
        }
    }
    groups
}

/// Valeur AC : nombre d'écarts absolus distincts entre paires, moins (taille - 1).
pub fn ac_value(numbers: &[u8]) -> usize {
    let mut diffs = BTreeSet::new();
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            diffs.insert(numbers[i].abs_diff(numbers[j]));
        }
    }
    diffs.len().saturating_sub(numbers.len().saturating_sub(1))
}

/// Descripteurs d'un ensemble de numéros.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberProfile {
    pub small: usize,
    pub large: usize,
    pub odd: usize,
    pub even: usize,
    pub sum: u32,
    pub prime: usize,
    /// 1 n'est ni premier ni composé.
    pub composite: usize,
    pub mod3: [usize; 3],
    /// Suites d'au moins deux numéros consécutifs.
    pub runs: usize,
    pub max_run: usize,
    /// Numéros communs avec le tirage précédent, s'il est connu.
    pub repeats: Option<usize>,
    pub min: u8,
    pub max: u8,
    pub span: u8,
    pub ac: usize,
}

impl NumberProfile {
    pub fn size_ratio(&self) -> String {
        format!("{}:{}", self.large, self.small)
    }

    pub fn odd_even(&self) -> String {
        format!("{}:{}", self.odd, self.even)
    }

    pub fn prime_ratio(&self) -> String {
        format!("{}:{}", self.prime, self.composite)
    }

    pub fn mod3_ratio(&self) -> String {
        format!("{}:{}:{}", self.mod3[0], self.mod3[1], self.mod3[2])
    }
}

/// `midpoint` : premier numéro compté comme « grand ».
pub fn profile_numbers(numbers: &[u8], previous: Option<&[u8]>, midpoint: u8) -> NumberProfile {
    let large = numbers.iter().filter(|&&n| n >= midpoint).count();
    let odd = numbers.iter().filter(|&&n| n % 2 == 1).count();
    let prime = numbers.iter().filter(|&&n| is_prime(n)).count();
    let composite = numbers.iter().filter(|&&n| n > 1 && !is_prime(n)).count();

    let mut mod3 = [0usize; 3];
    for &n in numbers {
        mod3[(n % 3) as usize] += 1;
    }

    let groups = consecutive_groups(numbers);
    let runs = groups.iter().filter(|g| g.len() >= 2).count();
    let max_run = groups.iter().map(|g| g.len()).max().unwrap_or(0);

    let min = numbers.iter().copied().min().unwrap_or(0);
    let max = numbers.iter().copied().max().unwrap_or(0);

    NumberProfile {
        small: numbers.len() - large,
        large,
        odd,
        even: numbers.len() - odd,
        sum: numbers.iter().map(|&n| n as u32).sum(),
        prime,
        composite,
        mod3,
        runs,
        max_run,
        repeats: previous.map(|prev| numbers.iter().filter(|n| prev.contains(n)).count()),
        min,
        max,
        span: max - min,
        ac: ac_value(numbers),
    }
}

pub type Tally = BTreeMap<String, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
}

fn summarize(values: &[u32]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }
    Summary {
        min: values.iter().copied().min().unwrap_or(0),
        max: values.iter().copied().max().unwrap_or(0),
        mean: values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64,
    }
}

/// Répartition des descripteurs sur les tirages d'une fenêtre.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowProfile {
    pub size_ratio: Tally,
    pub odd_even: Tally,
    pub prime_ratio: Tally,
    pub mod3: Tally,
    pub run_count: Tally,
    pub max_run: Tally,
    pub repeats: Tally,
    pub ac: Tally,
    pub secondary_size_ratio: Tally,
    pub span: Summary,
    pub sum: Summary,
}

pub fn profile_window(draws: &[Draw], settings: &GameSettings) -> WindowProfile {
    let mut profile = WindowProfile::default();
    let mut spans = Vec::with_capacity(draws.len());
    let mut sums = Vec::with_capacity(draws.len());

    for (t, draw) in draws.iter().enumerate() {
        // Le tirage précédent est le suivant dans la liste (ordre décroissant)
        let previous = draws.get(t + 1).map(|d| d.primary.as_slice());
        let p = profile_numbers(&draw.primary, previous, settings.primary_size_midpoint);

        *profile.size_ratio.entry(p.size_ratio()).or_insert(0) += 1;
        *profile.odd_even.entry(p.odd_even()).or_insert(0) += 1;
        *profile.prime_ratio.entry(p.prime_ratio()).or_insert(0) += 1;
        *profile.mod3.entry(p.mod3_ratio()).or_insert(0) += 1;
        *profile.run_count.entry(p.runs.to_string()).or_insert(0) += 1;
        *profile.max_run.entry(p.max_run.to_string()).or_insert(0) += 1;
        if let Some(r) = p.repeats {
            *profile.repeats.entry(r.to_string()).or_insert(0) += 1;
        }
        *profile.ac.entry(p.ac.to_string()).or_insert(0) += 1;
        spans.push(p.span as u32);
        sums.push(p.sum);

        let s = profile_numbers(&draw.secondary, None, settings.secondary_size_midpoint);
        *profile.secondary_size_ratio.entry(s.size_ratio()).or_insert(0) += 1;
    }

    profile.span = summarize(&spans);
    profile.sum = summarize(&sums);
    profile
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowStats {
    pub game: Game,
    pub window: usize,
    pub primary: Vec<BallStat>,
    pub secondary: Vec<BallStat>,
    pub profile: WindowProfile,
}

pub fn window_stats(draws: &[Draw], game: Game, settings: &GameSettings) -> WindowStats {
    WindowStats {
        game,
        window: draws.len(),
        primary: compute_ball_stats(draws, game, Pool::Primary),
        secondary: compute_ball_stats(draws, game, Pool::Secondary),
        profile: profile_window(draws, settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loterie_db::models::{make_draw, make_test_draws};

    fn ssq(issue: &str, primary: &[u8], secondary: u8) -> Draw {
        make_draw(Game::Ssq, issue, primary, &[secondary])
    }

    #[test]
    fn test_empty_window_is_zero() {
        let stats = compute_ball_stats(&[], Game::Ssq, Pool::Primary);
        assert_eq!(stats.len(), 33);
        for s in &stats {
            assert_eq!(s.count, 0);
            assert_eq!(s.frequency, 0.0);
            assert_eq!(s.current_omission, 0);
            assert_eq!(s.max_omission, 0);
        }
    }

    #[test]
    fn test_omissions_and_counts() {
        // Du plus récent au plus ancien
        let draws = vec![
            ssq("005", &[1, 2, 3, 4, 5, 6], 1),
            ssq("004", &[7, 8, 9, 10, 11, 12], 1),
            ssq("003", &[7, 8, 9, 10, 11, 13], 2),
            ssq("002", &[1, 8, 9, 10, 11, 13], 2),
            ssq("001", &[20, 21, 22, 23, 24, 25], 3),
        ];
        let stats = compute_ball_stats(&draws, Game::Ssq, Pool::Primary);

        let one = &stats[0];
        assert_eq!(one.count, 2);
        assert_eq!(one.current_omission, 0);
        // Absent des tirages 004 et 003, puis 001 en queue
        assert_eq!(one.max_omission, 2);

        let seven = &stats[6];
        assert_eq!(seven.current_omission, 1);
        assert_eq!(seven.max_omission, 2);

        let twenty = &stats[19];
        assert_eq!(twenty.current_omission, 4);
        assert_eq!(twenty.max_omission, 4);

        let secondary = compute_ball_stats(&draws, Game::Ssq, Pool::Secondary);
        assert_eq!(secondary[1].count, 2);
        assert_eq!(secondary[1].current_omission, 2);
    }

    #[test]
    fn test_absent_numbers_omission_equals_window() {
        let draws = make_test_draws(Game::Dlt, 7);
        let stats = compute_ball_stats(&draws, Game::Dlt, Pool::Primary);
        for s in stats.iter().filter(|s| s.count == 0) {
            assert_eq!(s.current_omission, 7);
            assert!(s.max_omission >= s.current_omission);
        }
    }

    #[test]
    fn test_frequency_reconstructs_count() {
        for n in [1, 3, 7, 30, 101] {
            let draws = make_test_draws(Game::Ssq, n);
            for pool in [Pool::Primary, Pool::Secondary] {
                for s in compute_ball_stats(&draws, Game::Ssq, pool) {
                    let rebuilt = (s.frequency * n as f64 / 100.0).round() as u32;
                    assert_eq!(rebuilt, s.count, "n={n}, numéro {}", s.number);
                    assert!(s.max_omission >= s.current_omission);
                }
            }
        }
    }

    #[test]
    fn test_primes() {
        let primes: Vec<u8> = (1..=20).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19]);
    }

    #[test]
    fn test_consecutive_groups() {
        assert_eq!(consecutive_groups(&[6, 5, 1, 2, 3]), vec![vec![1, 2, 3], vec![5, 6]]);
        assert!(consecutive_groups(&[]).is_empty());
    }

    #[test]
    fn test_ac_value() {
        // Écarts {1, 2, 3, 4, 5} : 5 distincts - (6 - 1) = 0
        assert_eq!(ac_value(&[1, 2, 3, 4, 5, 6]), 0);
        // Écarts {1, 3, 4} : 3 distincts - 2 = 1
        assert_eq!(ac_value(&[1, 2, 5]), 1);
        assert_eq!(ac_value(&[7]), 0);
    }

    #[test]
    fn test_profile_numbers() {
        let p = profile_numbers(&[1, 2, 3, 17, 22, 33], Some(&[3, 4, 22]), 17);
        assert_eq!((p.large, p.small), (3, 3));
        assert_eq!((p.odd, p.even), (4, 2));
        // Premiers : 2, 3, 17 ; composés : 22, 33 ; 1 exclu
        assert_eq!((p.prime, p.composite), (3, 2));
        assert_eq!(p.mod3, [2, 2, 2]);
        assert_eq!(p.runs, 1);
        assert_eq!(p.max_run, 3);
        assert_eq!(p.repeats, Some(2));
        assert_eq!((p.min, p.max, p.span), (1, 33, 32));
        assert_eq!(p.sum, 78);
    }

    #[test]
    fn test_profile_window_tallies_every_draw() {
        let draws = make_test_draws(Game::Ssq, 12);
        let settings = GameSettings::defaults_for(Game::Ssq);
        let profile = profile_window(&draws, &settings);
        assert_eq!(profile.size_ratio.values().sum::<usize>(), 12);
        assert_eq!(profile.ac.values().sum::<usize>(), 12);
        // Le plus ancien tirage n'a pas de précédent
        assert_eq!(profile.repeats.values().sum::<usize>(), 11);
        assert!(profile.span.min <= profile.span.max);
    }

    #[test]
    fn test_hottest_and_coldest() {
        let draws = vec![
            ssq("002", &[1, 2, 3, 4, 5, 6], 1),
            ssq("001", &[1, 2, 3, 4, 5, 7], 1),
        ];
        let stats = compute_ball_stats(&draws, Game::Ssq, Pool::Primary);
        let hot = hottest(&stats, 3);
        assert_eq!(hot.iter().map(|s| s.number).collect::<Vec<_>>(), vec![1, 2, 3]);
        let cold = coldest(&stats, 2);
        assert_eq!(cold[0].current_omission, 2);
        assert_eq!(cold[0].number, 8);
    }
}
