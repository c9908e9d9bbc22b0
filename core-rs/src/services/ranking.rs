//! Leaderboards for one class
//!
//! Both rankings join class members against the global users document.
//! Members with no global profile are left out.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::load_class;
use crate::errors::Result;
use crate::model::{ClientUser, House};
use crate::registry::Repositories;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRanking {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub house: House,
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub galleons: u64,
    pub gems: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseStats {
    pub house_id: House,
    pub members: u32,
    pub total_xp: u64,
    /// Rounded to the nearest integer
    pub avg_xp: u64,
}

#[derive(Debug, Clone)]
pub struct RankingService {
    repos: Repositories,
}

impl RankingService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Class members ordered by xp, highest first
    pub async fn users(&self, class_id: &str) -> Result<Vec<UserRanking>> {
        let class = load_class(&self.repos.classes, class_id).await?;
        let profiles = self.profiles().await?;

        let mut ranking: Vec<UserRanking> = class
            .users
            .iter()
            .filter_map(|(user_id, member)| {
                let Some(profile) = profiles.get(user_id.as_str()) else {
                    warn!(class_id, user_id = %user_id, "class member has no user profile");
                    return None;
                };
                Some(UserRanking {
                    user_id: user_id.clone(),
                    name: profile.profile.name.clone(),
                    avatar: profile.profile.avatar.clone(),
                    house: profile.house,
                    xp: member.progress.xp,
                    level: member.progress.level,
                    streak: member.progress.streak,
                    galleons: member.progress.currencies.galleons,
                    gems: member.progress.currencies.gems,
                })
            })
            .collect();

        ranking.sort_by(|a, b| b.xp.cmp(&a.xp));
        Ok(ranking)
    }

    /// Per-house totals for the class, ordered by total xp, highest first
    pub async fn houses(&self, class_id: &str) -> Result<Vec<HouseStats>> {
        let class = load_class(&self.repos.classes, class_id).await?;
        let profiles = self.profiles().await?;

        let mut placard: BTreeMap<House, (u32, u64)> = BTreeMap::new();
        for (user_id, member) in &class.users {
            if let Some(profile) = profiles.get(user_id.as_str()) {
                let entry = placard.entry(profile.house).or_default();
                entry.0 += 1;
                entry.1 += member.progress.xp;
            }
        }

        let mut stats: Vec<HouseStats> = placard
            .into_iter()
            .map(|(house_id, (members, total_xp))| HouseStats {
                house_id,
                members,
                total_xp,
                avg_xp: rounded_mean(total_xp, members),
            })
            .collect();

        stats.sort_by(|a, b| b.total_xp.cmp(&a.total_xp));
        Ok(stats)
    }

    async fn profiles(&self) -> Result<HashMap<String, ClientUser>> {
        Ok(self
            .repos
            .users
            .all()
            .await?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect())
    }
}

fn rounded_mean(total: u64, count: u32) -> u64 {
    if count == 0 {
        return 0;
    }
    let count = u64::from(count);
    (2 * total + count) / (2 * count)
}
