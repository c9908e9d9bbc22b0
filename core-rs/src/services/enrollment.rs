//! Enrollment: link a global user to a class
//!
//! Two documents change: the user's `enrollments` list and the class's
//! `users` map. Each side is an idempotent computed patch on its own
//! document, so repeating an enrollment, or racing two of them, converges
//! on the same state.

use serde::Serialize;
use tracing::info;

use super::{replace_field, require_class};
use crate::errors::{Result, StoreError};
use crate::model::{ClassEntity, ClassUser, ClientUser};
use crate::registry::Repositories;
use crate::repository::Patch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentOutcome {
    /// The class id was added to the user's enrollments
    pub enrolled: bool,
    /// A fresh member record was added to the class
    pub member_created: bool,
}

impl EnrollmentOutcome {
    pub fn was_already_enrolled(&self) -> bool {
        !self.enrolled && !self.member_created
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentService {
    repos: Repositories,
}

impl EnrollmentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Enroll `user_id` in `class_id`
    ///
    /// # Errors
    ///
    /// `NotFound` if the class or the user does not exist.
    pub async fn enroll(&self, class_id: &str, user_id: &str) -> Result<EnrollmentOutcome> {
        if self.repos.classes.find_by_id(class_id).await?.is_none() {
            return Err(StoreError::not_found("class", class_id));
        }
        if self.repos.users.find_by_id(user_id).await?.is_none() {
            return Err(StoreError::not_found("user", user_id));
        }

        let mut enrolled = false;
        let add_enrollment = Patch::computed(|user: &ClientUser| {
            let mut enrollments = user.enrollments.clone();
            if !user.is_enrolled(class_id) {
                enrollments.push(class_id.to_string());
                enrolled = true;
            }
            replace_field("enrollments", &enrollments)
        });
        self.repos
            .users
            .update(user_id, add_enrollment)
            .await?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        let mut member_created = false;
        let add_member = Patch::computed(|class: &ClassEntity| {
            let mut users = class.users.clone();
            if !users.contains_key(user_id) {
                users.insert(user_id.to_string(), ClassUser::new_member());
                member_created = true;
            }
            replace_field("users", &users)
        });
        require_class(self.repos.classes.update(class_id, add_member).await?, class_id)?;

        let outcome = EnrollmentOutcome {
            enrolled,
            member_created,
        };
        info!(class_id, user_id, ?outcome, "enrollment processed");
        Ok(outcome)
    }
}
