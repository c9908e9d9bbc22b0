//! Quiz scoring and reward rules
//!
//! Pure functions: no I/O, no clock except where a timestamp is passed in.
//! Percent shares are rounded half up, each bonus independently.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::{Mission, MissionProgress, Quiz, QuizQuestion};

/// Minimum score that earns rewards on a first attempt
pub const REWARD_THRESHOLD: u32 = 70;

/// Result of checking answers against a quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    pub correct: usize,
    /// 0..=100
    pub score: u32,
    /// Longest run of consecutive correct answers
    pub max_combo: usize,
}

/// Rewards granted for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rewards {
    pub xp: u64,
    pub galleons: u64,
    pub combo_bonus: u64,
    pub performance_bonus: u64,
}

/// Grade `answers` positionally against `questions`
///
/// A missing or `None` answer never matches. Answers beyond the last
/// question are ignored.
pub fn grade(questions: &[QuizQuestion], answers: &[Option<usize>]) -> Grade {
    let mut correct = 0;
    let mut combo = 0;
    let mut max_combo = 0;

    for (index, question) in questions.iter().enumerate() {
        let answer = answers.get(index).copied().flatten();
        if question.is_correct(answer) {
            correct += 1;
            combo += 1;
            max_combo = max_combo.max(combo);
        } else {
            combo = 0;
        }
    }

    Grade {
        correct,
        score: score(correct, questions.len()),
        max_combo,
    }
}

/// `round(100 * correct / total)`; 0 for an empty quiz
pub fn score(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let (correct, total) = (correct as u64, total as u64);
    ((200 * correct + total) / (2 * total)) as u32
}

/// `round(base * percent / 100)` without overflowing for any `base`
fn share(base: u64, percent: u64) -> u64 {
    base / 100 * percent + ((base % 100) * percent + 50) / 100
}

/// Bonus for the longest correct streak
///
/// | streak | bonus |
/// |--------|-------|
/// | >= 10  | 50%   |
/// | >= 5   | 30%   |
/// | >= 3   | 20%   |
pub fn combo_bonus(max_combo: usize, base_xp: u64) -> u64 {
    match max_combo {
        n if n >= 10 => share(base_xp, 50),
        n if n >= 5 => share(base_xp, 30),
        n if n >= 3 => share(base_xp, 20),
        _ => 0,
    }
}

/// Bonus for the overall score
pub fn performance_bonus(score: u32, base_xp: u64) -> u64 {
    match score {
        100 => share(base_xp, 50),
        s if s >= 90 => share(base_xp, 25),
        s if s >= 80 => share(base_xp, 10),
        _ => 0,
    }
}

/// Rewards for one attempt
///
/// Only a first attempt scoring at least [`REWARD_THRESHOLD`] earns
/// anything; every other attempt earns zero across the board.
pub fn rewards(quiz: &Quiz, grade: &Grade, is_first_attempt: bool) -> Rewards {
    if !earns_rewards(grade, is_first_attempt) {
        return Rewards::default();
    }

    let combo_bonus = combo_bonus(grade.max_combo, quiz.xp_reward);
    let performance_bonus = performance_bonus(grade.score, quiz.xp_reward);

    Rewards {
        xp: quiz
            .xp_reward
            .saturating_add(combo_bonus)
            .saturating_add(performance_bonus),
        galleons: quiz.galleon_reward,
        combo_bonus,
        performance_bonus,
    }
}

pub fn earns_rewards(grade: &Grade, is_first_attempt: bool) -> bool {
    is_first_attempt && grade.score >= REWARD_THRESHOLD
}

/// Advance every unfinished quiz-completion mission by one
///
/// Reaching the objective's target completes the mission at `now`.
/// Completed missions are left untouched.
pub fn advance_quiz_missions(
    missions: &[Mission],
    progress: &mut BTreeMap<String, MissionProgress>,
    now: DateTime<Utc>,
) {
    for mission in missions.iter().filter(|m| m.counts_quiz_completions()) {
        let current = progress.get(&mission.id);
        if current.is_some_and(MissionProgress::is_completed) {
            continue;
        }

        let next = current.map_or(0, MissionProgress::current_value) + 1;
        let entry = if next >= mission.objective.target() {
            MissionProgress::Completed {
                completed_at: Some(now),
            }
        } else {
            MissionProgress::InProgress {
                current_value: Some(next),
            }
        };
        progress.insert(mission.id.clone(), entry);
    }
}
