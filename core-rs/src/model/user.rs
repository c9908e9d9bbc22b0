/**
 * user.rs
 * Global user accounts (document `core/users`)
 *
 * Two shapes over the same records:
 * - ServerUser: full record, including credentials
 * - ClientUser: everything except `auth`
 *
 * ServerUser flattens ClientUser, so projecting a ServerUser to the client
 * shape is a serialize + validate round trip that drops `auth`.
 */

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::schema::{Entity, Issues, Schema};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("invalid email pattern: {}", e))
});

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum House {
    Gryffindor,
    Hufflepuff,
    Ravenclaw,
    Slytherin,
}

impl House {
    pub fn as_str(&self) -> &'static str {
        match self {
            House::Gryffindor => "gryffindor",
            House::Hufflepuff => "hufflepuff",
            House::Ravenclaw => "ravenclaw",
            House::Slytherin => "slytherin",
        }
    }
}

impl std::fmt::Display for House {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub last_seen: DateTime<Utc>,
}

impl Default for UserActivity {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            is_active: false,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_notifications")]
    pub notifications: bool,
    #[serde(default)]
    pub theme: Theme,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: Language::default(),
            notifications: true,
            theme: Theme::default(),
        }
    }
}

fn default_notifications() -> bool {
    true
}

/// User account as exposed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientUser {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub house: House,
    pub profile: UserProfile,
    pub activity: UserActivity,
    pub preferences: UserPreferences,
    #[serde(default)]
    pub enrollments: Vec<String>,
}

impl ClientUser {
    pub fn is_enrolled(&self, class_id: &str) -> bool {
        self.enrollments.iter().any(|id| id == class_id)
    }
}

impl Schema for ClientUser {
    fn check(&self) -> Result<(), ValidationError> {
        let mut issues = Issues::new();
        issues.ensure(EMAIL.is_match(&self.email), || {
            format!("email: '{}' is not a valid address", self.email)
        });
        issues.ensure(!self.profile.name.is_empty(), || {
            "profile.name: must not be empty".to_string()
        });
        issues.ensure(!self.profile.avatar.is_empty(), || {
            "profile.avatar: must not be empty".to_string()
        });
        issues.finish()
    }
}

impl Entity for ClientUser {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub password: String,
}

/// Full stored user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerUser {
    #[serde(flatten)]
    pub account: ClientUser,
    pub auth: Credentials,
}

impl Schema for ServerUser {
    fn check(&self) -> Result<(), ValidationError> {
        self.account.check()?;
        if self.auth.password.len() < MIN_PASSWORD_LEN {
            return Err(ValidationError::new(format!(
                "auth.password: must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

impl Entity for ServerUser {
    fn id(&self) -> &str {
        &self.account.id
    }
}
