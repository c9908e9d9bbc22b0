//! Integration tests for quiz submission
//!
//! Tests the full path from a submitted answer sheet to the persisted class
//! document: grading, first-attempt rewards, mission progress and the
//! atomicity of concurrent attempts on the same member.

use grimoire_core::model::MissionProgress;
use grimoire_core::{ClassServices, Repositories, StoreConfig, StoreError};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const CLASS: &str = "potions";
const STUDENT: &str = "neville";

fn questions(count: usize) -> JsonValue {
    (0..count)
        .map(|i| {
            json!({
                "id": format!("q{}", i),
                "question": format!("Ingredient {}?", i),
                "options": ["Asphodel", "Wormwood", "Bezoar"],
                "correctAnswer": i % 3
            })
        })
        .collect()
}

/// Answers for `count` questions where only the first `correct` are right
fn answers(count: usize, correct: usize) -> Vec<Option<usize>> {
    (0..count)
        .map(|i| if i < correct { Some(i % 3) } else { Some((i + 1) % 3) })
        .collect()
}

async fn setup() -> (TempDir, Repositories, ClassServices) {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();

    repos
        .classes
        .create(json!({
            "id": CLASS,
            "name": "Potions",
            "description": "Subtle science and exact art",
            "professorId": "snape",
            "isPrivate": false,
            "password": null,
            "isActive": true,
            "createdAt": "2024-09-01T09:00:00Z",
            "users": {
                STUDENT: {
                    "progress": {"xp": 0, "level": 1, "streak": 0,
                                 "currencies": {"galleons": 0, "gems": 0}}
                }
            },
            "achievements": [],
            "missions": [{
                "id": "brew-twice",
                "title": "Brew Twice",
                "description": "Pass two quizzes",
                "icon": "⚗️",
                "xpReward": 40,
                "galleonReward": 10,
                "objective": {"type": "complete_quiz", "count": 2}
            }],
            "quizzes": [
                {
                    "id": "draught-of-peace",
                    "title": "Draught of Peace",
                    "description": "Ten steps",
                    "difficulty": "intermediate",
                    "xpReward": 100,
                    "galleonReward": 20,
                    "questions": questions(10),
                    "timeLimit": 600
                },
                {
                    "id": "polyjuice",
                    "title": "Polyjuice",
                    "description": "Twenty steps",
                    "difficulty": "advanced",
                    "xpReward": 80,
                    "galleonReward": 15,
                    "questions": questions(20),
                    "timeLimit": 900
                },
                {
                    "id": "wiggenweld",
                    "title": "Wiggenweld",
                    "description": "Four steps",
                    "difficulty": "beginner",
                    "xpReward": 30,
                    "galleonReward": 5,
                    "questions": questions(4),
                    "timeLimit": 120
                }
            ],
            "shop": [],
            "socialFeed": [],
            "forumPosts": [],
            "announcements": []
        }))
        .await
        .unwrap();

    let services = ClassServices::new(&repos);
    (temp, repos, services)
}

#[tokio::test]
async fn test_perfect_first_attempt_grants_all_bonuses() {
    let (_temp, repos, services) = setup().await;

    let result = assert_ok!(
        services
            .quiz_submission
            .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, 10))
            .await
    );

    assert_eq!(result.score, 100);
    assert_eq!(result.max_combo, 10);
    assert_eq!(result.combo_bonus, 50);
    assert_eq!(result.performance_bonus, 50);
    assert_eq!(result.xp_gained, 200);
    assert_eq!(result.galleons_gained, 20);
    assert!(result.is_first_attempt);

    let member = repos.classes.find_by_id(CLASS).await.unwrap().unwrap().users[STUDENT].clone();
    assert_eq!(member.progress.xp, 200);
    assert_eq!(member.progress.currencies.galleons, 20);
    assert_eq!(member.completed_quizzes["draught-of-peace"].attempts, 1);
    assert_eq!(member.completed_quizzes["draught-of-peace"].best_score, 100);
}

#[tokio::test]
async fn test_score_below_threshold_records_attempt_without_rewards() {
    let (_temp, repos, services) = setup().await;

    // 13 of 20 is 65%
    let result = services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "polyjuice", &answers(20, 13))
        .await
        .unwrap();

    assert_eq!(result.score, 65);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.best_score, 65);
    assert_eq!(result.xp_gained, 0);
    assert_eq!(result.galleons_gained, 0);
    assert_eq!(result.combo_bonus, 0);
    assert_eq!(result.performance_bonus, 0);

    let member = repos.classes.find_by_id(CLASS).await.unwrap().unwrap().users[STUDENT].clone();
    assert_eq!(member.progress.xp, 0);
    assert!(member.mission_progress.is_empty(), "failed attempt advanced a mission");
}

#[tokio::test]
async fn test_retry_keeps_best_score_and_earns_nothing() {
    let (_temp, repos, services) = setup().await;

    // Step 1: first attempt at 80% is rewarded
    let first = services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, 8))
        .await
        .unwrap();
    assert!(first.xp_gained > 0);

    // Step 2: a perfect retry raises the best score only
    let retry = services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, 10))
        .await
        .unwrap();
    assert!(!retry.is_first_attempt);
    assert_eq!(retry.attempts, 2);
    assert_eq!(retry.best_score, 100);
    assert_eq!(retry.xp_gained, 0);
    assert_eq!(retry.galleons_gained, 0);

    // Step 3: a worse retry never lowers it
    let worse = services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, 1))
        .await
        .unwrap();
    assert_eq!(worse.attempts, 3);
    assert_eq!(worse.best_score, 100);

    let member = repos.classes.find_by_id(CLASS).await.unwrap().unwrap().users[STUDENT].clone();
    assert_eq!(member.progress.xp, first.xp_gained);
}

#[tokio::test]
async fn test_mission_completes_after_two_rewarded_quizzes() {
    let (_temp, repos, services) = setup().await;
    let mission_state = |repos: Repositories| async move {
        repos.classes.find_by_id(CLASS).await.unwrap().unwrap().users[STUDENT]
            .mission_progress
            .get("brew-twice")
            .cloned()
    };

    services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, 10))
        .await
        .unwrap();
    assert_eq!(
        mission_state(repos.clone()).await,
        Some(MissionProgress::InProgress { current_value: Some(1) })
    );

    services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "wiggenweld", &answers(4, 4))
        .await
        .unwrap();
    let completed = mission_state(repos.clone()).await.unwrap();
    assert!(completed.is_completed());

    // A third rewarded quiz leaves the completed mission alone
    services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "polyjuice", &answers(20, 20))
        .await
        .unwrap();
    assert_eq!(mission_state(repos.clone()).await, Some(completed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_are_serialized() {
    let (_temp, repos, services) = setup().await;
    const ATTEMPTS: usize = 12;

    let mut handles = Vec::new();
    for n in 0..ATTEMPTS {
        let submission = services.quiz_submission.clone();
        handles.push(tokio::spawn(async move {
            submission
                .submit_attempt(CLASS, STUDENT, "draught-of-peace", &answers(10, n % 11))
                .await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // Every attempt saw a distinct attempt count: no lost updates
    let counts: HashSet<u32> = results.iter().map(|r| r.attempts).collect();
    assert_eq!(counts.len(), ATTEMPTS);
    assert_eq!(results.iter().filter(|r| r.is_first_attempt).count(), 1);

    let best = results.iter().map(|r| r.score).max().unwrap();
    let earned: u64 = results.iter().map(|r| r.xp_gained).sum();

    let member = repos.classes.find_by_id(CLASS).await.unwrap().unwrap().users[STUDENT].clone();
    let stat = &member.completed_quizzes["draught-of-peace"];
    assert_eq!(stat.attempts as usize, ATTEMPTS);
    assert_eq!(stat.best_score, best);
    assert_eq!(member.progress.xp, earned);
}

#[tokio::test]
async fn test_unknown_targets_are_not_found_and_write_nothing() {
    let (temp, _repos, services) = setup().await;
    let before = std::fs::read_to_string(temp.path().join("classes").join("potions.json")).unwrap();

    let missing_quiz = services
        .quiz_submission
        .submit_attempt(CLASS, STUDENT, "felix-felicis", &answers(1, 1))
        .await;
    assert!(matches!(missing_quiz, Err(StoreError::NotFound { kind: "quiz", .. })));

    let missing_member = services
        .quiz_submission
        .submit_attempt(CLASS, "draco", "draught-of-peace", &answers(10, 10))
        .await;
    assert!(matches!(missing_member, Err(StoreError::NotFound { kind: "class member", .. })));

    assert_err!(
        services
            .quiz_submission
            .submit_attempt("herbology", STUDENT, "draught-of-peace", &answers(10, 10))
            .await
    );

    let after = std::fs::read_to_string(temp.path().join("classes").join("potions.json")).unwrap();
    assert_eq!(before, after);
}
