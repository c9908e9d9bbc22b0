/**
 * class.rs
 * Class aggregate, stored one document per class (`classes/<id>.json`)
 *
 * Format:
 * ```json
 * [{
 *   "id": "potions-101", "name": "...", "professorId": "...", ...,
 *   "users": { "<userId>": { "progress": {...}, ... } },
 *   "quizzes": [...], "missions": [...], "shop": [...],
 *   "achievements": [...], "socialFeed": [...], "forumPosts": [...],
 *   "announcements": [...]
 * }]
 * ```
 *
 * Social feed, forum and announcement records are carried through untouched.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::achievement::Achievement;
use super::member::ClassUser;
use super::mission::Mission;
use super::quiz::Quiz;
use super::shop::ShopItem;
use crate::errors::ValidationError;
use crate::schema::{Entity, Issues, Schema};

/// Descriptive part of a class, without members or catalogs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub professor_id: String,
    pub is_private: bool,
    pub password: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Schema for ClassDetails {}

impl Entity for ClassDetails {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntity {
    #[serde(flatten)]
    pub details: ClassDetails,
    #[serde(default)]
    pub users: BTreeMap<String, ClassUser>,
    pub achievements: Vec<Achievement>,
    pub missions: Vec<Mission>,
    pub quizzes: Vec<Quiz>,
    pub shop: Vec<ShopItem>,
    pub social_feed: Vec<JsonValue>,
    pub forum_posts: Vec<JsonValue>,
    pub announcements: Vec<JsonValue>,
}

impl ClassEntity {
    pub fn quiz(&self, quiz_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|quiz| quiz.id == quiz_id)
    }

    pub fn member(&self, user_id: &str) -> Option<&ClassUser> {
        self.users.get(user_id)
    }
}

impl Schema for ClassEntity {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        for (user_id, member) in &self.users {
            issues.nested(&format!("users.{}", user_id), member.check());
        }
        for (index, quiz) in self.quizzes.iter().enumerate() {
            issues.nested(&format!("quizzes[{}]", index), quiz.check());
        }
        for (index, mission) in self.missions.iter().enumerate() {
            issues.nested(&format!("missions[{}]", index), mission.check());
        }
        issues.ensure(!self.details.name.is_empty(), || "name: must not be empty".to_string());
        issues.finish()
    }
}

impl Entity for ClassEntity {
    fn id(&self) -> &str {
        &self.details.id
    }
}
