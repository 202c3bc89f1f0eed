use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{keys, Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Practice,
    Simulation,
    Diagnostic,
    Trap,
    Smart,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunAnswer {
    pub item_id: String,
    #[serde(default)]
    pub domain: Option<String>,
    pub is_correct: bool,
}

/// A completed quiz session. `answers` may be empty when only the totals were
/// kept, in which case `domain` (if any) tags the whole run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizRun {
    pub id: String,
    pub user_id: String,
    pub exam_id: String,
    pub mode: QuizMode,
    #[serde(default)]
    pub domain: Option<String>,
    pub correct: u32,
    pub total: u32,
    #[serde(default)]
    pub answers: Vec<RunAnswer>,
    pub completed_at: DateTime<Utc>,
}

impl QuizRun {
    /// Rebuilds `correct`/`total` from the per-answer detail when present.
    pub fn normalized(mut self) -> Result<Self, StoreError> {
        if !self.answers.is_empty() {
            self.total = self.answers.len() as u32;
            self.correct = self.answers.iter().filter(|a| a.is_correct).count() as u32;
        }
        if self.correct > self.total {
            return Err(StoreError::Validation(format!(
                "correct ({}) exceeds total ({})",
                self.correct, self.total
            )));
        }
        Ok(self)
    }
}

impl Store {
    pub fn create_quiz_run(&self, run: &QuizRun) -> Result<(), StoreError> {
        let key = keys::quiz_run_key(
            &run.user_id,
            &run.exam_id,
            run.completed_at.timestamp_millis(),
            &run.id,
        )?;
        self.quiz_runs.insert(key.as_bytes(), Self::serialize(run)?)?;
        Ok(())
    }

    /// Most recent runs for a user on one exam, newest first.
    pub fn list_recent_runs(
        &self,
        user_id: &str,
        exam_id: &str,
        limit: usize,
    ) -> Result<Vec<QuizRun>, StoreError> {
        let prefix = keys::quiz_run_prefix(user_id, exam_id)?;
        let mut runs = Vec::new();
        if limit == 0 {
            return Ok(runs);
        }
        for entry in self.quiz_runs.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            runs.push(Self::deserialize::<QuizRun>(&value)?);
            if runs.len() >= limit {
                break;
            }
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;

    fn run(id: &str, exam_id: &str, completed_at: DateTime<Utc>) -> QuizRun {
        QuizRun {
            id: id.to_string(),
            user_id: "u1".to_string(),
            exam_id: exam_id.to_string(),
            mode: QuizMode::Practice,
            domain: None,
            correct: 3,
            total: 5,
            answers: vec![],
            completed_at,
        }
    }

    #[test]
    fn runs_are_listed_newest_first_per_exam() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("runs-db").to_str().unwrap()).unwrap();

        let now = Utc::now();
        store.create_quiz_run(&run("r1", "pmp", now - Duration::hours(2))).unwrap();
        store.create_quiz_run(&run("r2", "pmp", now)).unwrap();
        store.create_quiz_run(&run("r3", "capm", now)).unwrap();

        let runs = store.list_recent_runs("u1", "pmp", 50).unwrap();
        assert_eq!(runs.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["r2", "r1"]);
        assert_eq!(store.list_recent_runs("u1", "pmp", 1).unwrap().len(), 1);
    }

    #[test]
    fn normalization_derives_totals_from_answers() {
        let mut r = run("r1", "pmp", Utc::now());
        r.correct = 0;
        r.total = 0;
        r.answers = vec![
            RunAnswer { item_id: "q1".to_string(), domain: None, is_correct: true },
            RunAnswer { item_id: "q2".to_string(), domain: None, is_correct: false },
        ];
        let r = r.normalized().unwrap();
        assert_eq!((r.correct, r.total), (1, 2));

        let mut bad = run("r2", "pmp", Utc::now());
        bad.correct = 6;
        assert!(bad.normalized().is_err());
    }
}
