use serde::{Deserialize, Serialize};

use crate::schema::{Entity, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub xp_reward: u64,
}

impl Schema for Achievement {}

impl Entity for Achievement {
    fn id(&self) -> &str {
        &self.id
    }
}
