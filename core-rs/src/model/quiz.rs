//! Quizzes and their questions

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::schema::{Entity, Issues, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_answer)
    }
}

impl Schema for QuizQuestion {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        issues.ensure(!self.options.is_empty(), || {
            "options: must contain at least one option".to_string()
        });
        issues.ensure(self.correct_answer < self.options.len(), || {
            format!(
                "correctAnswer: {} is not a valid index into {} options",
                self.correct_answer,
                self.options.len()
            )
        });
        issues.finish()
    }
}

impl Entity for QuizQuestion {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub xp_reward: u64,
    pub galleon_reward: u64,
    #[serde(default)]
    pub unlocks_achievement_id: Option<String>,
    pub questions: Vec<QuizQuestion>,
    /// Seconds
    pub time_limit: u32,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&QuizQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

impl Schema for Quiz {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        issues.ensure(!self.questions.is_empty(), || {
            "questions: must contain at least one question".to_string()
        });
        issues.ensure(self.time_limit > 0, || "timeLimit: must be positive".to_string());
        for (index, question) in self.questions.iter().enumerate() {
            issues.nested(&format!("questions[{}]", index), question.check());
        }
        issues.finish()
    }
}

impl Entity for Quiz {
    fn id(&self) -> &str {
        &self.id
    }
}
