//! Integration tests for the class lifecycle
//!
//! Walks a class through its whole life on a real data directory: creation,
//! enrollment, catalog edits, member updates, rankings and removal.

use grimoire_core::model::{House, Quiz};
use grimoire_core::repository::to_fields;
use grimoire_core::services::{ClassUserPatch, ProgressPatch};
use grimoire_core::{ClassServices, Patch, Repositories, StoreConfig, StoreError};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn class_input(id: &str, name: &str) -> JsonValue {
    json!({
        "id": id,
        "name": name,
        "description": "Defence Against the Dark Arts",
        "professorId": "lupin",
        "isPrivate": true,
        "password": "riddikulus",
        "isActive": true,
        "createdAt": "2024-09-01T09:00:00Z",
        "achievements": [],
        "missions": [],
        "quizzes": [],
        "shop": [],
        "socialFeed": [],
        "forumPosts": [],
        "announcements": []
    })
}

async fn create_user(repos: &Repositories, name: &str, house: &str) -> String {
    repos
        .users_internal
        .create(json!({
            "email": format!("{}@hogwarts.edu", name.to_lowercase()),
            "role": "student",
            "house": house,
            "profile": {"name": name, "avatar": format!("{}.png", name.to_lowercase())},
            "activity": {},
            "preferences": {},
            "auth": {"password": "alohomora"}
        }))
        .await
        .unwrap()
        .account
        .id
}

#[tokio::test]
async fn test_complete_class_lifecycle() {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();
    let services = ClassServices::new(&repos);

    // Step 1: Create the class; it becomes its own document
    let class = assert_ok!(repos.classes.create(class_input("dada", "DADA")).await);
    assert_eq!(class.details.id, "dada");
    assert!(temp.path().join("classes").join("dada.json").exists());

    // Step 2: A second class with the same id is rejected
    let duplicate = repos.classes.create(class_input("dada", "Impostor")).await;
    assert!(matches!(duplicate, Err(StoreError::AlreadyExists(_))));

    // Step 3: Enroll two students
    let harry = create_user(&repos, "Harry", "gryffindor").await;
    let draco = create_user(&repos, "Draco", "slytherin").await;
    for user in [&harry, &draco] {
        let outcome = services.enrollment.enroll("dada", user).await.unwrap();
        assert!(outcome.enrolled && outcome.member_created);
    }
    let members = services.users.get_all("dada").await.unwrap();
    assert_eq!(members.len(), 2);

    // Step 4: Build a quiz through the catalog
    let quiz: Quiz = services
        .catalog
        .create_quiz(
            "dada",
            json!({
                "id": "boggarts",
                "title": "Boggarts",
                "description": "Shape-shifters",
                "difficulty": "beginner",
                "xpReward": 50,
                "galleonReward": 10,
                "questions": [{
                    "id": "q1",
                    "question": "Incantation?",
                    "options": ["Riddikulus", "Lumos"],
                    "correctAnswer": 0
                }],
                "timeLimit": 60
            }),
        )
        .await
        .unwrap();
    assert_eq!(quiz.id, "boggarts");

    let quiz = services
        .catalog
        .add_question(
            "dada",
            "boggarts",
            json!({
                "id": "q2",
                "question": "Form for Lupin?",
                "options": ["Moon", "Dementor", "Spider"],
                "correctAnswer": 0
            }),
        )
        .await
        .unwrap();
    assert_eq!(quiz.questions.len(), 2);

    let updated = services
        .catalog
        .update_quiz("dada", "boggarts", to_fields(json!({"xpReward": 60})).unwrap())
        .await
        .unwrap();
    assert_eq!(updated.xp_reward, 60);
    assert_eq!(updated.questions.len(), 2);

    // Step 5: Creating the same quiz id again fails
    let again = services
        .catalog
        .create_quiz("dada", serde_json::to_value(&updated).unwrap())
        .await;
    assert!(matches!(again, Err(StoreError::AlreadyExists(_))));

    // Step 6: Play the quiz and adjust a member by hand
    let result = services
        .quiz_submission
        .submit_attempt("dada", &harry, "boggarts", &[Some(0), Some(0)])
        .await
        .unwrap();
    assert_eq!(result.score, 100);

    let patch = ClassUserPatch {
        progress: Some(ProgressPatch {
            xp: Some(10),
            ..Default::default()
        }),
        ..Default::default()
    };
    let draco_member = services.users.patch_one("dada", &draco, patch).await.unwrap();
    assert_eq!(draco_member.progress.xp, 10);
    assert_eq!(draco_member.progress.level, 1);

    // Step 7: Rankings reflect both
    let ranking = services.ranking.users("dada").await.unwrap();
    assert_eq!(ranking[0].user_id, harry);
    assert_eq!(ranking[1].user_id, draco);

    let houses = services.ranking.houses("dada").await.unwrap();
    assert_eq!(houses[0].house_id, House::Gryffindor);
    assert_eq!(houses[1].house_id, House::Slytherin);

    // Step 8: Update class details with a literal patch
    let renamed = repos
        .classes
        .update("dada", Patch::literal(json!({"name": "Defence", "isActive": false})).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.details.name, "Defence");
    assert!(!renamed.details.is_active);
    assert_eq!(renamed.users.len(), 2);

    // Step 9: Remove the quiz, then the class
    services.catalog.remove_quiz("dada", "boggarts").await.unwrap();
    assert!(services.catalog.get_quiz("dada", "boggarts").await.unwrap().is_none());

    assert!(repos.classes.remove("dada").await.unwrap());
    assert!(repos.classes.find_by_id("dada").await.unwrap().is_none());
    assert!(!temp.path().join("classes").join("dada.json").exists());

    // Enrollment on the global user side is untouched by class removal
    let harry_account = repos.users.find_by_id(&harry).await.unwrap().unwrap();
    assert_eq!(harry_account.enrollments, vec!["dada"]);
}

#[tokio::test]
async fn test_missing_class_is_not_found_everywhere() {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();
    let services = ClassServices::new(&repos);

    assert!(repos.classes.find_by_id("herbology").await.unwrap().is_none());
    assert!(repos
        .classes
        .update("herbology", Patch::literal(json!({"name": "x"})).unwrap())
        .await
        .unwrap()
        .is_none());

    assert_err!(services.catalog.list_quizzes("herbology").await);
    assert_err!(services.shop.list("herbology").await);
    assert_err!(services.ranking.users("herbology").await);

    // Lookups never create the document
    assert!(!temp.path().join("classes").join("herbology.json").exists());
}

#[tokio::test]
async fn test_class_ids_cannot_escape_the_collection() {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();

    let escaped = repos.classes.create(class_input("../core/users", "Escape")).await;
    assert!(matches!(escaped, Err(StoreError::AccessDenied(_))));

    let lookup = repos.classes.find_by_id("../core/users").await;
    assert!(matches!(lookup, Err(StoreError::AccessDenied(_))));
}

#[tokio::test]
async fn test_list_skips_corrupt_class_files() {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();

    repos.classes.create(class_input("charms", "Charms")).await.unwrap();
    repos.classes.create(class_input("potions", "Potions")).await.unwrap();
    std::fs::write(temp.path().join("classes").join("broken.json"), "{ not json").unwrap();

    let classes = repos.classes.all().await.unwrap();
    let ids: Vec<_> = classes.iter().map(|c| c.details.id.as_str()).collect();
    assert_eq!(ids, vec!["charms", "potions"]);
}
