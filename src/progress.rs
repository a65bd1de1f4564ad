//! Quiz performance ledger.
//!
//! Records every quiz result, counts repeated failures per topic, and keeps earned badges. The
//! ledger is a small JSON document; each mutation is written to disk before the call returns.
//! A result below 70% marks the topic weak, and a perfect result awards
//! [`PERFECT_SCORE_ACHIEVEMENT`].

use crate::index::payload::current_timestamp_rfc3339;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Fraction of correct answers below which a topic counts as weak.
pub const WEAK_SCORE_THRESHOLD: f64 = 0.7;
/// Badge awarded for answering every question correctly.
pub const PERFECT_SCORE_ACHIEVEMENT: &str = "Perfect Score Master";
const WEAK_TOPIC_LIMIT: usize = 10;

/// Errors raised while reading or updating the ledger.
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Ledger file could not be read or written.
    #[error("progress ledger I/O failed for {path}: {source}")]
    Io {
        /// Ledger path.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Ledger file contents were not valid JSON.
    #[error("progress ledger is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    /// More correct answers than questions.
    #[error("score {score} exceeds total {total}")]
    InvalidScore {
        /// Correct answers reported.
        score: u32,
        /// Questions asked.
        total: u32,
    },
}

/// One recorded quiz result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Quiz topic.
    pub topic: String,
    /// Correct answers.
    pub score: u32,
    /// Questions asked.
    pub total: u32,
    /// Difficulty level the quiz was generated for.
    pub level: String,
    /// RFC 3339 time the result was recorded.
    pub timestamp: String,
}

/// Topic the learner has repeatedly struggled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakTopic {
    /// Topic name.
    pub topic: String,
    /// Number of results below the weak threshold.
    pub frequency: u32,
    /// RFC 3339 time of the latest weak result.
    pub last_failed_at: String,
}

/// Earned badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    /// Badge name.
    pub name: String,
    /// RFC 3339 time the badge was awarded.
    pub timestamp: String,
}

/// Side effects of recording a quiz result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScoreOutcome {
    /// Whether the topic's weak counter was incremented.
    pub marked_weak: bool,
    /// Badges awarded by this result.
    pub achievements_awarded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WeakTopicEntry {
    #[serde(flatten)]
    topic: WeakTopic,
    last_failed_seq: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    sequence: u64,
    #[serde(default)]
    history: Vec<PerformanceRecord>,
    #[serde(default)]
    weak_topics: Vec<WeakTopicEntry>,
    #[serde(default)]
    achievements: Vec<Achievement>,
}

impl Ledger {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Mutex-guarded ledger, optionally persisted to a JSON file.
pub struct ProgressStore {
    path: Option<PathBuf>,
    ledger: Mutex<Ledger>,
}

impl ProgressStore {
    /// Open the ledger at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProgressError> {
        let path = path.as_ref().to_path_buf();
        let ledger = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ledger::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ledger::default(),
            Err(source) => {
                return Err(ProgressError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        tracing::debug!(
            path = %path.display(),
            results = ledger.history.len(),
            "Opened progress ledger"
        );
        Ok(Self {
            path: Some(path),
            ledger: Mutex::new(ledger),
        })
    }

    /// Create a ledger that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Record a quiz result, updating weak topics and achievements.
    pub fn record_score(
        &self,
        topic: &str,
        score: u32,
        total: u32,
        level: &str,
    ) -> Result<ScoreOutcome, ProgressError> {
        if score > total {
            return Err(ProgressError::InvalidScore { score, total });
        }

        let now = current_timestamp_rfc3339();
        let mut outcome = ScoreOutcome::default();
        self.update(|ledger| {
            ledger.next_sequence();
            ledger.history.push(PerformanceRecord {
                topic: topic.to_string(),
                score,
                total,
                level: level.to_string(),
                timestamp: now.clone(),
            });

            if total > 0 && f64::from(score) / f64::from(total) < WEAK_SCORE_THRESHOLD {
                let seq = ledger.next_sequence();
                match ledger
                    .weak_topics
                    .iter_mut()
                    .find(|entry| entry.topic.topic == topic)
                {
                    Some(entry) => {
                        entry.topic.frequency += 1;
                        entry.topic.last_failed_at = now.clone();
                        entry.last_failed_seq = seq;
                    }
                    None => ledger.weak_topics.push(WeakTopicEntry {
                        topic: WeakTopic {
                            topic: topic.to_string(),
                            frequency: 1,
                            last_failed_at: now.clone(),
                        },
                        last_failed_seq: seq,
                    }),
                }
                outcome.marked_weak = true;
            }

            if total > 0 && score == total {
                ledger.achievements.push(Achievement {
                    name: PERFECT_SCORE_ACHIEVEMENT.to_string(),
                    timestamp: now.clone(),
                });
                outcome.achievements_awarded.push(PERFECT_SCORE_ACHIEVEMENT.to_string());
            }
        })?;

        tracing::info!(
            topic,
            score,
            total,
            level,
            marked_weak = outcome.marked_weak,
            "Recorded quiz result"
        );
        Ok(outcome)
    }

    /// Award a badge.
    pub fn award_achievement(&self, name: &str) -> Result<(), ProgressError> {
        let now = current_timestamp_rfc3339();
        self.update(|ledger| {
            ledger.achievements.push(Achievement {
                name: name.to_string(),
                timestamp: now,
            });
        })
    }

    /// Up to ten weak topics, most frequent first; ties favor the most recent failure.
    pub fn weak_topics(&self) -> Vec<WeakTopic> {
        let ledger = self.lock();
        let mut entries: Vec<&WeakTopicEntry> = ledger.weak_topics.iter().collect();
        entries.sort_by(|left, right| {
            right
                .topic
                .frequency
                .cmp(&left.topic.frequency)
                .then(right.last_failed_seq.cmp(&left.last_failed_seq))
        });
        entries
            .into_iter()
            .take(WEAK_TOPIC_LIMIT)
            .map(|entry| entry.topic.clone())
            .collect()
    }

    /// Every recorded result, newest first.
    pub fn history(&self) -> Vec<PerformanceRecord> {
        self.lock().history.iter().rev().cloned().collect()
    }

    /// Every earned badge, newest first.
    pub fn achievements(&self) -> Vec<Achievement> {
        self.lock().achievements.iter().rev().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `mutate` to a copy, persist it, then publish it. A failed write changes nothing.
    fn update<F>(&self, mutate: F) -> Result<(), ProgressError>
    where
        F: FnOnce(&mut Ledger),
    {
        let mut ledger = self.lock();
        let mut next = ledger.clone();
        mutate(&mut next);
        self.persist(&next)?;
        *ledger = next;
        Ok(())
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), ProgressError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(ledger)?;
        std::fs::write(path, bytes).map_err(|source| ProgressError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn low_scores_mark_topics_weak_and_count_repeats() {
        let store = ProgressStore::in_memory();
        let outcome = store.record_score("Decorators", 1, 3, "beginner").unwrap();
        assert!(outcome.marked_weak);
        assert!(outcome.achievements_awarded.is_empty());
        store.record_score("Decorators", 2, 5, "beginner").unwrap();
        store.record_score("Closures", 0, 3, "beginner").unwrap();

        let weak = store.weak_topics();
        assert_eq!(weak.len(), 2);
        assert_eq!(weak[0].topic, "Decorators");
        assert_eq!(weak[0].frequency, 2);
        assert_eq!(weak[1].topic, "Closures");
    }

    #[test]
    fn records_carry_rfc3339_timestamps() {
        let store = ProgressStore::in_memory();
        store.record_score("Cells", 1, 2, "beginner").unwrap();
        let record = &store.history()[0];
        let parsed = time::OffsetDateTime::parse(
            &record.timestamp,
            &time::format_description::well_known::Rfc3339,
        );
        assert!(parsed.is_ok(), "{}", record.timestamp);
        assert_eq!(store.weak_topics()[0].last_failed_at, record.timestamp);
    }

    #[test]
    fn threshold_is_exclusive() {
        let store = ProgressStore::in_memory();
        let outcome = store.record_score("Blockchain", 7, 10, "advanced").unwrap();
        assert!(!outcome.marked_weak);
        assert!(store.weak_topics().is_empty());
    }

    #[test]
    fn zero_question_quiz_is_recorded_without_side_effects() {
        let store = ProgressStore::in_memory();
        let outcome = store.record_score("Empty", 0, 0, "beginner").unwrap();
        assert_eq!(outcome, ScoreOutcome::default());
        assert_eq!(store.history().len(), 1);
    }

    #[test]
    fn perfect_score_awards_badge() {
        let store = ProgressStore::in_memory();
        let outcome = store.record_score("Photosynthesis", 3, 3, "intermediate").unwrap();
        assert_eq!(outcome.achievements_awarded, vec![PERFECT_SCORE_ACHIEVEMENT]);
        let badges = store.achievements();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].name, PERFECT_SCORE_ACHIEVEMENT);
    }

    #[test]
    fn score_above_total_is_rejected() {
        let store = ProgressStore::in_memory();
        let error = store.record_score("Math", 4, 3, "beginner").unwrap_err();
        assert!(matches!(error, ProgressError::InvalidScore { score: 4, total: 3 }));
        assert!(store.history().is_empty());
    }

    #[test]
    fn history_and_achievements_are_newest_first() {
        let store = ProgressStore::in_memory();
        store.record_score("first", 1, 1, "beginner").unwrap();
        store.record_score("second", 0, 1, "beginner").unwrap();
        store.award_achievement("Streak").unwrap();

        let topics: Vec<String> = store.history().into_iter().map(|r| r.topic).collect();
        assert_eq!(topics, vec!["second", "first"]);
        let badges: Vec<String> = store.achievements().into_iter().map(|a| a.name).collect();
        assert_eq!(badges, vec!["Streak", PERFECT_SCORE_ACHIEVEMENT]);
    }

    #[test]
    fn weak_topics_are_capped_and_ties_prefer_recent_failures() {
        let store = ProgressStore::in_memory();
        for n in 0..12 {
            store
                .record_score(&format!("topic-{n}"), 0, 1, "beginner")
                .unwrap();
        }
        let weak = store.weak_topics();
        assert_eq!(weak.len(), 10);
        assert_eq!(weak[0].topic, "topic-11");
        assert_eq!(weak[9].topic, "topic-2");
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        {
            let store = ProgressStore::open(&path).unwrap();
            store.record_score("Genetics", 1, 4, "advanced").unwrap();
            store.award_achievement("First Upload").unwrap();
        }

        let reopened = ProgressStore::open(&path).unwrap();
        assert_eq!(reopened.history().len(), 1);
        assert_eq!(reopened.weak_topics()[0].topic, "Genetics");
        assert_eq!(reopened.achievements()[0].name, "First Upload");
    }

    #[test]
    fn malformed_ledger_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ProgressStore::open(&path),
            Err(ProgressError::Malformed(_))
        ));
    }

    #[test]
    fn failed_write_leaves_ledger_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("progress.json");
        let store = ProgressStore::open(&path).unwrap();
        let error = store.record_score("Optics", 1, 1, "beginner").unwrap_err();
        assert!(matches!(error, ProgressError::Io { .. }));
        assert!(store.history().is_empty());
        assert!(store.achievements().is_empty());
    }
}
