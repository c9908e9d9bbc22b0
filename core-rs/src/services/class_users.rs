//! Class member progress: reads, merges and idempotent unlocks

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{load_class, member_mut, replace_field, require_class};
use crate::errors::{Result, StoreError};
use crate::model::{ClassEntity, ClassUser, MissionProgress, QuizStat};
use crate::repository::{CollectionRepository, Patch};
use crate::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrenciesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub galleons: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gems: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<CurrenciesPatch>,
}

/// Partial member update
///
/// Progress and currencies merge field by field, quiz stats and mission
/// progress merge key by key, achievement and inventory lists are replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassUserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_quizzes: Option<BTreeMap<String, QuizStat>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_progress: Option<BTreeMap<String, MissionProgress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_achievements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<String>>,
}

impl ClassUserPatch {
    /// Apply onto `member` in place
    pub fn apply(self, member: &mut ClassUser) {
        if let Some(progress) = self.progress {
            let target = &mut member.progress;
            if let Some(xp) = progress.xp {
                target.xp = xp;
            }
            if let Some(level) = progress.level {
                target.level = level;
            }
            if let Some(streak) = progress.streak {
                target.streak = streak;
            }
            if let Some(currencies) = progress.currencies {
                if let Some(galleons) = currencies.galleons {
                    target.currencies.galleons = galleons;
                }
                if let Some(gems) = currencies.gems {
                    target.currencies.gems = gems;
                }
            }
        }
        if let Some(quizzes) = self.completed_quizzes {
            member.completed_quizzes.extend(quizzes);
        }
        if let Some(missions) = self.mission_progress {
            member.mission_progress.extend(missions);
        }
        if let Some(achievements) = self.unlocked_achievements {
            member.unlocked_achievements = achievements;
        }
        if let Some(inventory) = self.inventory {
            member.inventory = inventory;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassUsersService {
    classes: CollectionRepository<ClassEntity>,
}

impl ClassUsersService {
    pub fn new(classes: CollectionRepository<ClassEntity>) -> Self {
        Self { classes }
    }

    pub async fn get_all(&self, class_id: &str) -> Result<BTreeMap<String, ClassUser>> {
        Ok(load_class(&self.classes, class_id).await?.users)
    }

    pub async fn get_one(&self, class_id: &str, user_id: &str) -> Result<Option<ClassUser>> {
        Ok(load_class(&self.classes, class_id).await?.users.remove(user_id))
    }

    /// Insert or replace a member wholesale
    ///
    /// Replacing an existing member is subject to the same forward-only
    /// rules as the incremental updates.
    pub async fn set_one(&self, class_id: &str, user_id: &str, data: ClassUser) -> Result<ClassUser> {
        data.check()?;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut users = class.users.clone();
            if let Some(existing) = users.get(user_id) {
                ensure_forward(existing, &data)?;
            }
            users.insert(user_id.to_string(), data.clone());
            replace_field("users", &users)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        debug!(class_id, user_id, "class member replaced");
        Ok(data)
    }

    pub async fn patch_one(
        &self,
        class_id: &str,
        user_id: &str,
        patch: ClassUserPatch,
    ) -> Result<ClassUser> {
        self.modify(class_id, user_id, move |member| {
            patch.apply(member);
            Ok(())
        })
        .await
    }

    pub async fn upsert_completed_quiz(
        &self,
        class_id: &str,
        user_id: &str,
        quiz_id: &str,
        stat: QuizStat,
    ) -> Result<ClassUser> {
        self.modify(class_id, user_id, move |member| {
            member.completed_quizzes.insert(quiz_id.to_string(), stat);
            Ok(())
        })
        .await
    }

    pub async fn upsert_mission_progress(
        &self,
        class_id: &str,
        user_id: &str,
        mission_id: &str,
        entry: MissionProgress,
    ) -> Result<ClassUser> {
        self.modify(class_id, user_id, move |member| {
            member.mission_progress.insert(mission_id.to_string(), entry);
            Ok(())
        })
        .await
    }

    /// Unlock an achievement; a second unlock is a no-op
    pub async fn add_achievement(
        &self,
        class_id: &str,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<ClassUser> {
        self.modify(class_id, user_id, move |member| {
            push_unique(&mut member.unlocked_achievements, achievement_id);
            Ok(())
        })
        .await
    }

    /// Add an item to the inventory unless already held
    pub async fn add_inventory_item(
        &self,
        class_id: &str,
        user_id: &str,
        item_id: &str,
    ) -> Result<ClassUser> {
        self.modify(class_id, user_id, move |member| {
            push_unique(&mut member.inventory, item_id);
            Ok(())
        })
        .await
    }

    /// Run `change` on one existing member inside a single class update
    async fn modify<F>(&self, class_id: &str, user_id: &str, change: F) -> Result<ClassUser>
    where
        F: FnOnce(&mut ClassUser) -> Result<()> + Send,
    {
        let mut updated = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut users = class.users.clone();
            let member = member_mut(&mut users, user_id)?;
            let before = member.clone();
            change(member)?;
            ensure_forward(&before, member)?;
            member.check()?;
            updated = Some(member.clone());
            replace_field("users", &users)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        updated.ok_or_else(|| StoreError::not_found("class member", user_id))
    }
}

/// Reject a member change that moves recorded progress backwards
///
/// Quiz attempts and best scores never drop, mission counters never drop,
/// and a completed mission stays completed. Entries are never removed.
fn ensure_forward(before: &ClassUser, after: &ClassUser) -> Result<()> {
    for (quiz_id, old) in &before.completed_quizzes {
        let Some(new) = after.completed_quizzes.get(quiz_id) else {
            return Err(regression(format!("completedQuizzes.{}: entry cannot be removed", quiz_id)));
        };
        if new.attempts < old.attempts {
            return Err(regression(format!(
                "completedQuizzes.{}.attempts: cannot decrease from {} to {}",
                quiz_id, old.attempts, new.attempts
            )));
        }
        if new.best_score < old.best_score {
            return Err(regression(format!(
                "completedQuizzes.{}.bestScore: cannot decrease from {} to {}",
                quiz_id, old.best_score, new.best_score
            )));
        }
    }

    for (mission_id, old) in &before.mission_progress {
        let Some(new) = after.mission_progress.get(mission_id) else {
            return Err(regression(format!("missionProgress.{}: entry cannot be removed", mission_id)));
        };
        if old.is_completed() && !new.is_completed() {
            return Err(regression(format!(
                "missionProgress.{}: a completed mission cannot return to in_progress",
                mission_id
            )));
        }
        if !new.is_completed() && new.current_value() < old.current_value() {
            return Err(regression(format!(
                "missionProgress.{}.currentValue: cannot decrease from {} to {}",
                mission_id,
                old.current_value(),
                new.current_value()
            )));
        }
    }

    Ok(())
}

fn regression(message: String) -> StoreError {
    StoreError::InvalidInput(message)
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}
