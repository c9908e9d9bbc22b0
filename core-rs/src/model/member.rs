//! Per-class membership state (`Class.users[userId]`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ValidationError;
use crate::schema::{Issues, Schema};

pub const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Currencies {
    pub galleons: u64,
    pub gems: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub currencies: Currencies,
}

/// Attempt record for one quiz
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStat {
    pub attempts: u32,
    pub best_score: u32,
    #[serde(default = "Utc::now")]
    pub completed_at: DateTime<Utc>,
}

impl Schema for QuizStat {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        issues.ensure(self.attempts >= 1, || "attempts: must be at least 1".to_string());
        issues.ensure(self.best_score <= MAX_SCORE, || {
            format!("bestScore: {} exceeds {}", self.best_score, MAX_SCORE)
        });
        issues.finish()
    }
}

/// Progress toward one mission
///
/// `InProgress` can become `Completed`, never the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MissionProgress {
    Completed {
        #[serde(rename = "completedAt", default, skip_serializing_if = "Option::is_none")]
        completed_at: Option<DateTime<Utc>>,
    },
    InProgress {
        #[serde(rename = "currentValue", default, skip_serializing_if = "Option::is_none")]
        current_value: Option<u32>,
    },
}

impl MissionProgress {
    pub fn is_completed(&self) -> bool {
        matches!(self, MissionProgress::Completed { .. })
    }

    /// Counter toward the objective; 0 when completed or unset
    pub fn current_value(&self) -> u32 {
        match self {
            MissionProgress::InProgress { current_value } => current_value.unwrap_or(0),
            MissionProgress::Completed { .. } => 0,
        }
    }
}

/// A user's state inside one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassUser {
    pub progress: Progress,
    #[serde(default)]
    pub completed_quizzes: BTreeMap<String, QuizStat>,
    #[serde(default)]
    pub mission_progress: BTreeMap<String, MissionProgress>,
    #[serde(default)]
    pub unlocked_achievements: Vec<String>,
    #[serde(default)]
    pub inventory: Vec<String>,
}

impl ClassUser {
    /// Fresh member: level 1, no xp, no currencies
    pub fn new_member() -> Self {
        Self {
            progress: Progress {
                xp: 0,
                level: 1,
                streak: 0,
                currencies: Currencies::default(),
            },
            completed_quizzes: BTreeMap::new(),
            mission_progress: BTreeMap::new(),
            unlocked_achievements: Vec::new(),
            inventory: Vec::new(),
        }
    }
}

impl Schema for ClassUser {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        for (quiz_id, stat) in &self.completed_quizzes {
            issues.nested(&format!("completedQuizzes.{}", quiz_id), stat.check());
        }
        issues.finish()
    }
}
