// services/mod.rs - Class services built on computed patches
//
// Every mutation goes through `classes.update(class_id, Patch::Computed)`,
// so each service call is one locked read-modify-write of the class document.

pub mod catalog;
pub mod class_users;
pub mod enrollment;
pub mod quiz_submission;
pub mod ranking;
pub mod scoring;
pub mod shop;

pub use catalog::CatalogService;
pub use class_users::{ClassUserPatch, ClassUsersService, ProgressPatch};
pub use enrollment::{EnrollmentOutcome, EnrollmentService};
pub use quiz_submission::{QuizSubmissionService, SubmissionResult};
pub use ranking::{HouseStats, RankingService, UserRanking};
pub use shop::{PurchaseReceipt, ShopService};

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::{Result, StoreError};
use crate::model::{ClassEntity, ClassUser};
use crate::registry::Repositories;
use crate::repository::{CollectionRepository, Fields};

/// Every class service over one set of repositories
#[derive(Debug, Clone)]
pub struct ClassServices {
    pub quiz_submission: QuizSubmissionService,
    pub users: ClassUsersService,
    pub shop: ShopService,
    pub catalog: CatalogService,
    pub enrollment: EnrollmentService,
    pub ranking: RankingService,
}

impl ClassServices {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            quiz_submission: QuizSubmissionService::new(repos.classes.clone()),
            users: ClassUsersService::new(repos.classes.clone()),
            shop: ShopService::new(repos.classes.clone()),
            catalog: CatalogService::new(repos.classes.clone()),
            enrollment: EnrollmentService::new(repos.clone()),
            ranking: RankingService::new(repos.clone()),
        }
    }
}

/// Load a class or fail with `NotFound`
pub(crate) async fn load_class(
    classes: &CollectionRepository<ClassEntity>,
    class_id: &str,
) -> Result<ClassEntity> {
    require_class(classes.find_by_id(class_id).await?, class_id)
}

pub(crate) fn require_class<T>(found: Option<T>, class_id: &str) -> Result<T> {
    found.ok_or_else(|| StoreError::not_found("class", class_id))
}

pub(crate) fn member_mut<'m>(
    users: &'m mut BTreeMap<String, ClassUser>,
    user_id: &str,
) -> Result<&'m mut ClassUser> {
    users
        .get_mut(user_id)
        .ok_or_else(|| StoreError::not_found("class member", user_id))
}

/// Single-field patch replacing `name` with `value`
pub(crate) fn replace_field<V: Serialize>(name: &str, value: &V) -> Result<Fields> {
    let mut fields = Fields::new();
    fields.insert(name.to_string(), serde_json::to_value(value)?);
    Ok(fields)
}
