use serde::{Deserialize, Serialize};

use crate::schema::{Entity, Schema};

/// Item sold in a class shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Galleons per unit
    pub price: u64,
    pub category: String,
    pub stock: u32,
}

impl Schema for ShopItem {}

impl Entity for ShopItem {
    fn id(&self) -> &str {
        &self.id
    }
}
