//! Quiz submission - grade an attempt and apply its rewards atomically
//!
//! The whole read-compute-write runs as one computed patch on the class
//! document, so concurrent submissions for the same class are linearized
//! and none of them can lose another's attempt count or rewards.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::scoring::{self, REWARD_THRESHOLD};
use super::{member_mut, replace_field, require_class};
use crate::errors::{Result, StoreError};
use crate::model::{ClassEntity, QuizStat};
use crate::repository::{CollectionRepository, Patch};

/// Outcome of one submitted attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub score: u32,
    pub attempts: u32,
    pub best_score: u32,
    pub xp_gained: u64,
    pub galleons_gained: u64,
    pub correct_answers: usize,
    pub combo_bonus: u64,
    pub performance_bonus: u64,
    pub is_first_attempt: bool,
    pub max_combo: usize,
}

#[derive(Debug, Clone)]
pub struct QuizSubmissionService {
    classes: CollectionRepository<ClassEntity>,
}

impl QuizSubmissionService {
    pub fn new(classes: CollectionRepository<ClassEntity>) -> Self {
        Self { classes }
    }

    /// Grade `answers` for `user_id` on `quiz_id` and persist the attempt
    ///
    /// `answers[i]` is the chosen option index for question `i`, `None`
    /// when unanswered.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown class, quiz or class member. Nothing is
    /// written in that case.
    pub async fn submit_attempt(
        &self,
        class_id: &str,
        user_id: &str,
        quiz_id: &str,
        answers: &[Option<usize>],
    ) -> Result<SubmissionResult> {
        let mut outcome = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let quiz = class
                .quiz(quiz_id)
                .ok_or_else(|| StoreError::not_found("quiz", quiz_id))?;

            let mut users = class.users.clone();
            let member = member_mut(&mut users, user_id)?;

            let grade = scoring::grade(&quiz.questions, answers);
            let previous = member.completed_quizzes.get(quiz_id);
            let is_first_attempt = previous.is_none();
            let attempts = previous.map_or(0, |stat| stat.attempts) + 1;
            let best_score = previous.map_or(0, |stat| stat.best_score).max(grade.score);
            let rewards = scoring::rewards(quiz, &grade, is_first_attempt);
            let now = Utc::now();

            member.completed_quizzes.insert(
                quiz_id.to_string(),
                QuizStat {
                    attempts,
                    best_score,
                    completed_at: now,
                },
            );

            if scoring::earns_rewards(&grade, is_first_attempt) {
                scoring::advance_quiz_missions(&class.missions, &mut member.mission_progress, now);
            }

            member.progress.xp = member.progress.xp.saturating_add(rewards.xp);
            let galleons = &mut member.progress.currencies.galleons;
            *galleons = galleons.saturating_add(rewards.galleons);

            outcome = Some(SubmissionResult {
                score: grade.score,
                attempts,
                best_score,
                xp_gained: rewards.xp,
                galleons_gained: rewards.galleons,
                correct_answers: grade.correct,
                combo_bonus: rewards.combo_bonus,
                performance_bonus: rewards.performance_bonus,
                is_first_attempt,
                max_combo: grade.max_combo,
            });

            replace_field("users", &users)
        });

        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        let result = outcome.ok_or_else(|| StoreError::not_found("class", class_id))?;
        info!(
            class_id,
            user_id,
            quiz_id,
            score = result.score,
            attempts = result.attempts,
            xp_gained = result.xp_gained,
            rewarded = result.score >= REWARD_THRESHOLD && result.is_first_attempt,
            "quiz attempt recorded"
        );
        Ok(result)
    }
}
