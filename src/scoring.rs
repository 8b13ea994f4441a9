use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Pause at which a level scores exactly its face value
pub const BASELINE_PAUSE_MS: u64 = 800;
/// Maximum number of entries kept per leaderboard
pub const LEADERBOARD_SIZE: usize = 15;

const ADJUSTMENT_PER_100MS: f64 = 0.03;

/// Level adjusted by +/-3% per 100ms faster/slower than the baseline pause,
/// rounded to two decimal places.
pub fn weighted_score(level: u8, pause_ms: u64) -> f64 {
    let pause_diff = pause_ms as f64 - BASELINE_PAUSE_MS as f64;
    let adjustment = -(pause_diff / 100.0) * ADJUSTMENT_PER_100MS;
    let weighted = level as f64 * (1.0 + adjustment);
    (weighted * 100.0).round() / 100.0
}

/// Which leaderboard an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListKey {
    Normal,
    Reverse,
}

impl ListKey {
    pub fn for_mode(reverse: bool) -> Self {
        if reverse {
            ListKey::Reverse
        } else {
            ListKey::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub score: f64,
    pub level: u8,
    pub pause_ms: u64,
    pub timestamp: DateTime<Local>,
}

impl ScoreEntry {
    pub fn new(level: u8, pause_ms: u64) -> Self {
        Self {
            score: weighted_score(level, pause_ms),
            level,
            pause_ms,
            timestamp: Local::now(),
        }
    }
}

/// A ranked, capped list of score entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    entries: Vec<ScoreEntry>,
}

impl Leaderboard {
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a leaderboard from persisted entries, re-establishing order and cap
    pub fn from_entries(entries: Vec<ScoreEntry>) -> Self {
        Self {
            entries: rank(entries),
        }
    }

    pub fn insert(&mut self, entry: ScoreEntry) {
        let mut entries = std::mem::take(&mut self.entries);
        entries.push(entry);
        self.entries = rank(entries);
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    pub fn best(&self) -> Option<&ScoreEntry> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn rank(entries: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    // stable sort keeps earlier entries ahead on ties
    entries
        .into_iter()
        .sorted_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .take(LEADERBOARD_SIZE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score: f64) -> ScoreEntry {
        ScoreEntry {
            score,
            level: 3,
            pause_ms: 800,
            timestamp: Local::now(),
        }
    }

    #[test]
    fn baseline_pause_has_no_adjustment() {
        assert_eq!(weighted_score(5, 800), 5.00);
        assert_eq!(weighted_score(10, 800), 10.00);
    }

    #[test]
    fn slower_pause_is_penalised() {
        assert_eq!(weighted_score(5, 1300), 4.25);
        assert_eq!(weighted_score(10, 2000), 6.4);
    }

    #[test]
    fn faster_pause_is_rewarded() {
        assert_eq!(weighted_score(5, 300), 5.75);
        assert_eq!(weighted_score(4, 200), 4.72);
    }

    #[test]
    fn score_decreases_with_pause() {
        for level in 1..=10u8 {
            let scores: Vec<f64> = (200..=2000)
                .step_by(100)
                .map(|p| weighted_score(level, p))
                .collect();
            assert!(scores.windows(2).all(|w| w[0] > w[1]), "level {level}");
        }
    }

    #[test]
    fn score_increases_with_level() {
        for pause in (200..=2000).step_by(100) {
            let scores: Vec<f64> = (1..=10u8).map(|l| weighted_score(l, pause)).collect();
            assert!(scores.windows(2).all(|w| w[0] < w[1]), "pause {pause}");
        }
    }

    #[test]
    fn score_entry_uses_weighted_score() {
        let e = ScoreEntry::new(6, 1000);
        assert_eq!(e.score, 5.64);
        assert_eq!(e.level, 6);
        assert_eq!(e.pause_ms, 1000);
    }

    #[test]
    fn leaderboard_stays_sorted_and_capped() {
        let mut board = Leaderboard::default();
        let scores = [
            3.0, 7.5, 1.2, 9.9, 4.4, 4.4, 8.1, 2.0, 6.3, 5.5, 10.3, 0.9, 7.7, 3.3, 6.6, 8.8, 2.2,
            9.1, 1.1, 5.0,
        ];
        for (i, s) in scores.iter().enumerate() {
            board.insert(entry(*s));
            assert!(board.len() <= LEADERBOARD_SIZE);
            assert_eq!(board.len(), (i + 1).min(LEADERBOARD_SIZE));
            assert!(board
                .entries()
                .windows(2)
                .all(|w| w[0].score >= w[1].score));
        }
        assert_eq!(board.best().unwrap().score, 10.3);
        // the five lowest fell off
        assert!(board.entries().iter().all(|e| e.score > 2.2));
    }

    #[test]
    fn from_entries_reorders_and_truncates() {
        let entries = (0..20).map(|i| entry(i as f64)).collect();
        let board = Leaderboard::from_entries(entries);
        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board.best().unwrap().score, 19.0);
        assert_eq!(board.entries().last().unwrap().score, 5.0);
    }

    #[test]
    fn list_key_for_mode() {
        assert_eq!(ListKey::for_mode(true), ListKey::Reverse);
        assert_eq!(ListKey::for_mode(false), ListKey::Normal);
        assert_eq!(ListKey::Reverse.to_string(), "reverse");
    }
}
