//! Class catalog: quizzes, missions and achievements
//!
//! Each catalog is an array field on the class document. All three share
//! the same create / merge-update / remove rules; quiz questions get their
//! own operations and always re-validate the owning quiz.

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use super::{load_class, replace_field, require_class};
use crate::errors::{Result, StoreError};
use crate::model::{Achievement, ClassEntity, Mission, Quiz, QuizQuestion};
use crate::repository::{to_fields, CollectionRepository, Fields, Patch};
use crate::schema::{validate, Entity};

/// One array field of the class document
struct Section<T> {
    field: &'static str,
    kind: &'static str,
    records: fn(&ClassEntity) -> &Vec<T>,
}

const QUIZZES: Section<Quiz> = Section {
    field: "quizzes",
    kind: "quiz",
    records: quizzes,
};

const MISSIONS: Section<Mission> = Section {
    field: "missions",
    kind: "mission",
    records: missions,
};

const ACHIEVEMENTS: Section<Achievement> = Section {
    field: "achievements",
    kind: "achievement",
    records: achievements,
};

fn quizzes(class: &ClassEntity) -> &Vec<Quiz> {
    &class.quizzes
}

fn missions(class: &ClassEntity) -> &Vec<Mission> {
    &class.missions
}

fn achievements(class: &ClassEntity) -> &Vec<Achievement> {
    &class.achievements
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    classes: CollectionRepository<ClassEntity>,
}

impl CatalogService {
    pub fn new(classes: CollectionRepository<ClassEntity>) -> Self {
        Self { classes }
    }

    // Quizzes

    pub async fn list_quizzes(&self, class_id: &str) -> Result<Vec<Quiz>> {
        Ok(load_class(&self.classes, class_id).await?.quizzes)
    }

    pub async fn get_quiz(&self, class_id: &str, quiz_id: &str) -> Result<Option<Quiz>> {
        self.get(class_id, &QUIZZES, quiz_id).await
    }

    pub async fn create_quiz<I: Serialize>(&self, class_id: &str, input: I) -> Result<Quiz> {
        self.create(class_id, &QUIZZES, input).await
    }

    pub async fn update_quiz(&self, class_id: &str, quiz_id: &str, updates: Fields) -> Result<Quiz> {
        self.update(class_id, &QUIZZES, quiz_id, updates).await
    }

    pub async fn remove_quiz(&self, class_id: &str, quiz_id: &str) -> Result<()> {
        self.remove(class_id, &QUIZZES, quiz_id).await
    }

    // Quiz questions

    pub async fn add_question<I: Serialize>(
        &self,
        class_id: &str,
        quiz_id: &str,
        input: I,
    ) -> Result<Quiz> {
        let question: QuizQuestion = validate(&JsonValue::Object(with_id(input)?))?;
        self.modify_quiz(class_id, quiz_id, move |quiz| {
            if quiz.question(&question.id).is_some() {
                return Err(StoreError::AlreadyExists(format!(
                    "question '{}' in quiz '{}'",
                    question.id, quiz.id
                )));
            }
            quiz.questions.push(question);
            Ok(())
        })
        .await
    }

    pub async fn update_question(
        &self,
        class_id: &str,
        quiz_id: &str,
        question_id: &str,
        updates: Fields,
    ) -> Result<Quiz> {
        self.modify_quiz(class_id, quiz_id, move |quiz| {
            let question = quiz
                .questions
                .iter_mut()
                .find(|q| q.id == question_id)
                .ok_or_else(|| StoreError::not_found("question", question_id))?;
            *question = merge(&*question, updates)?;
            Ok(())
        })
        .await
    }

    /// Remove a question; a quiz cannot lose its last one
    pub async fn remove_question(
        &self,
        class_id: &str,
        quiz_id: &str,
        question_id: &str,
    ) -> Result<Quiz> {
        self.modify_quiz(class_id, quiz_id, move |quiz| {
            let before = quiz.questions.len();
            quiz.questions.retain(|q| q.id != question_id);
            if quiz.questions.len() == before {
                return Err(StoreError::not_found("question", question_id));
            }
            Ok(())
        })
        .await
    }

    // Missions

    pub async fn list_missions(&self, class_id: &str) -> Result<Vec<Mission>> {
        Ok(load_class(&self.classes, class_id).await?.missions)
    }

    pub async fn get_mission(&self, class_id: &str, mission_id: &str) -> Result<Option<Mission>> {
        self.get(class_id, &MISSIONS, mission_id).await
    }

    pub async fn create_mission<I: Serialize>(&self, class_id: &str, input: I) -> Result<Mission> {
        self.create(class_id, &MISSIONS, input).await
    }

    pub async fn update_mission(
        &self,
        class_id: &str,
        mission_id: &str,
        updates: Fields,
    ) -> Result<Mission> {
        self.update(class_id, &MISSIONS, mission_id, updates).await
    }

    pub async fn remove_mission(&self, class_id: &str, mission_id: &str) -> Result<()> {
        self.remove(class_id, &MISSIONS, mission_id).await
    }

    // Achievements

    pub async fn list_achievements(&self, class_id: &str) -> Result<Vec<Achievement>> {
        Ok(load_class(&self.classes, class_id).await?.achievements)
    }

    pub async fn get_achievement(
        &self,
        class_id: &str,
        achievement_id: &str,
    ) -> Result<Option<Achievement>> {
        self.get(class_id, &ACHIEVEMENTS, achievement_id).await
    }

    pub async fn create_achievement<I: Serialize>(
        &self,
        class_id: &str,
        input: I,
    ) -> Result<Achievement> {
        self.create(class_id, &ACHIEVEMENTS, input).await
    }

    pub async fn update_achievement(
        &self,
        class_id: &str,
        achievement_id: &str,
        updates: Fields,
    ) -> Result<Achievement> {
        self.update(class_id, &ACHIEVEMENTS, achievement_id, updates).await
    }

    pub async fn remove_achievement(&self, class_id: &str, achievement_id: &str) -> Result<()> {
        self.remove(class_id, &ACHIEVEMENTS, achievement_id).await
    }

    async fn get<T: Entity>(&self, class_id: &str, section: &Section<T>, id: &str) -> Result<Option<T>> {
        let class = load_class(&self.classes, class_id).await?;
        Ok((section.records)(&class).iter().find(|r| r.id() == id).cloned())
    }

    /// Append a record; uses `input.id` when given, else a fresh UUID
    async fn create<T: Entity, I: Serialize>(
        &self,
        class_id: &str,
        section: &Section<T>,
        input: I,
    ) -> Result<T> {
        let record: T = validate(&JsonValue::Object(with_id(input)?))?;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut records = (section.records)(class).clone();
            if records.iter().any(|r| r.id() == record.id()) {
                return Err(StoreError::AlreadyExists(format!(
                    "{} '{}'",
                    section.kind,
                    record.id()
                )));
            }
            records.push(record.clone());
            replace_field(section.field, &records)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        debug!(class_id, section = section.field, id = record.id(), "catalog record created");
        Ok(record)
    }

    async fn update<T: Entity>(
        &self,
        class_id: &str,
        section: &Section<T>,
        id: &str,
        updates: Fields,
    ) -> Result<T> {
        let mut updated = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut records = (section.records)(class).clone();
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| StoreError::not_found(section.kind, id))?;
            *record = merge(&*record, updates)?;
            updated = Some(record.clone());
            replace_field(section.field, &records)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        updated.ok_or_else(|| StoreError::not_found(section.kind, id))
    }

    async fn remove<T: Entity>(&self, class_id: &str, section: &Section<T>, id: &str) -> Result<()> {
        let patch = Patch::computed(|class: &ClassEntity| {
            let records = (section.records)(class);
            if !records.iter().any(|r| r.id() == id) {
                return Err(StoreError::not_found(section.kind, id));
            }
            let kept: Vec<&T> = records.iter().filter(|r| r.id() != id).collect();
            replace_field(section.field, &kept)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;
        Ok(())
    }

    async fn modify_quiz<F>(&self, class_id: &str, quiz_id: &str, change: F) -> Result<Quiz>
    where
        F: FnOnce(&mut Quiz) -> Result<()> + Send,
    {
        let mut updated = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut quizzes = class.quizzes.clone();
            let quiz = quizzes
                .iter_mut()
                .find(|q| q.id == quiz_id)
                .ok_or_else(|| StoreError::not_found("quiz", quiz_id))?;
            change(quiz)?;
            *quiz = validate(&serde_json::to_value(&*quiz)?)?;
            updated = Some(quiz.clone());
            replace_field("quizzes", &quizzes)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        updated.ok_or_else(|| StoreError::not_found("quiz", quiz_id))
    }
}

/// Input fields with an `id`, generated when absent
fn with_id<I: Serialize>(input: I) -> Result<Fields> {
    let mut fields = to_fields(input)?;
    if !fields.get("id").is_some_and(JsonValue::is_string) {
        fields.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
    }
    Ok(fields)
}

/// Shallow-merge `updates` onto `current`, keeping its id, and re-validate
fn merge<T: Entity>(current: &T, updates: Fields) -> Result<T> {
    let mut fields = to_fields(current)?;
    fields.extend(updates);
    fields.insert("id".to_string(), JsonValue::String(current.id().to_string()));
    Ok(validate(&JsonValue::Object(fields))?)
}
