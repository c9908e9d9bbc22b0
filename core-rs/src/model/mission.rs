//! Class missions

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::schema::{Entity, Schema};

/// Objective type advanced by rewarded quiz completions
pub const COMPLETE_QUIZ: &str = "complete_quiz";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionObjective {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl MissionObjective {
    /// Completions needed; defaults to 1
    pub fn target(&self) -> u32 {
        self.count.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub xp_reward: u64,
    pub galleon_reward: u64,
    pub objective: MissionObjective,
    #[serde(default)]
    pub unlocks_achievement_id: Option<String>,
}

impl Mission {
    pub fn counts_quiz_completions(&self) -> bool {
        self.objective.kind == COMPLETE_QUIZ
    }
}

impl Schema for Mission {
    fn check(&self) -> Result<(), ValidationError> {
        match self.objective.count {
            Some(0) => Err(ValidationError::new("objective.count: must be positive")),
            _ => Ok(()),
        }
    }
}

impl Entity for Mission {
    fn id(&self) -> &str {
        &self.id
    }
}
