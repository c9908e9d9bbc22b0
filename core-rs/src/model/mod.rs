// model/mod.rs - Record shapes stored in the document store

pub mod achievement;
pub mod class;
pub mod member;
pub mod mission;
pub mod quiz;
pub mod shop;
pub mod user;

pub use achievement::Achievement;
pub use class::{ClassDetails, ClassEntity};
pub use member::{ClassUser, Currencies, MissionProgress, Progress, QuizStat, MAX_SCORE};
pub use mission::{Mission, MissionObjective, COMPLETE_QUIZ};
pub use quiz::{Difficulty, Quiz, QuizQuestion};
pub use shop::ShopItem;
pub use user::{
    ClientUser, Credentials, House, Language, Role, ServerUser, Theme, UserActivity,
    UserPreferences, UserProfile,
};
