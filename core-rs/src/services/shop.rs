//! Class shop: catalog CRUD, purchases and restocking

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

use super::{load_class, member_mut, replace_field, require_class};
use crate::errors::{Result, StoreError};
use crate::model::{ClassEntity, ShopItem};
use crate::repository::{to_fields, CollectionRepository, Fields, Patch};
use crate::schema::validate;

/// What a successful purchase changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub item: ShopItem,
    pub quantity: u32,
    pub galleons_charged: u64,
    pub new_balance: u64,
    pub remaining_stock: u32,
}

#[derive(Debug, Clone)]
pub struct ShopService {
    classes: CollectionRepository<ClassEntity>,
}

impl ShopService {
    pub fn new(classes: CollectionRepository<ClassEntity>) -> Self {
        Self { classes }
    }

    pub async fn list(&self, class_id: &str) -> Result<Vec<ShopItem>> {
        Ok(load_class(&self.classes, class_id).await?.shop)
    }

    pub async fn get(&self, class_id: &str, item_id: &str) -> Result<Option<ShopItem>> {
        let class = load_class(&self.classes, class_id).await?;
        Ok(class.shop.into_iter().find(|item| item.id == item_id))
    }

    /// Add an item under a fresh id
    pub async fn create<I: Serialize>(&self, class_id: &str, input: I) -> Result<ShopItem> {
        let mut fields = to_fields(input)?;
        fields.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
        let item: ShopItem = validate(&JsonValue::Object(fields))?;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut shop = class.shop.clone();
            shop.push(item.clone());
            replace_field("shop", &shop)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;
        Ok(item)
    }

    /// Shallow-merge `updates` onto an item; the id cannot change
    pub async fn update(&self, class_id: &str, item_id: &str, updates: Fields) -> Result<ShopItem> {
        self.modify_item(class_id, item_id, move |item| {
            let mut merged = to_fields(&*item)?;
            merged.extend(updates);
            merged.insert("id".to_string(), JsonValue::String(item.id.clone()));
            *item = validate(&JsonValue::Object(merged))?;
            Ok(())
        })
        .await
    }

    pub async fn remove(&self, class_id: &str, item_id: &str) -> Result<()> {
        let patch = Patch::computed(|class: &ClassEntity| {
            if !class.shop.iter().any(|item| item.id == item_id) {
                return Err(StoreError::not_found("shop item", item_id));
            }
            let shop: Vec<&ShopItem> = class.shop.iter().filter(|item| item.id != item_id).collect();
            replace_field("shop", &shop)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;
        Ok(())
    }

    /// Buy `quantity` units of an item for a class member
    ///
    /// Stock, balance and inventory change together or not at all.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a zero quantity
    /// - `NotFound` for an unknown class, member or item
    /// - `InsufficientStock` / `InsufficientFunds` when the purchase cannot
    ///   be covered
    pub async fn purchase(
        &self,
        class_id: &str,
        user_id: &str,
        item_id: &str,
        quantity: u32,
    ) -> Result<PurchaseReceipt> {
        if quantity == 0 {
            return Err(StoreError::InvalidInput(
                "purchase quantity must be positive".to_string(),
            ));
        }

        let mut receipt = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut users = class.users.clone();
            let member = member_mut(&mut users, user_id)?;

            let mut shop = class.shop.clone();
            let item = shop
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| StoreError::not_found("shop item", item_id))?;

            if item.stock < quantity {
                return Err(StoreError::InsufficientStock {
                    item_id: item_id.to_string(),
                    requested: quantity,
                    available: item.stock,
                });
            }

            let price = item.price.checked_mul(u64::from(quantity)).ok_or_else(|| {
                StoreError::InvalidInput(format!(
                    "price of {} x '{}' overflows",
                    quantity, item_id
                ))
            })?;
            let balance = member.progress.currencies.galleons;
            if balance < price {
                return Err(StoreError::InsufficientFunds { balance, price });
            }

            item.stock -= quantity;
            member.progress.currencies.galleons = balance - price;
            member
                .inventory
                .extend(std::iter::repeat(item.id.clone()).take(quantity as usize));

            receipt = Some(PurchaseReceipt {
                item: item.clone(),
                quantity,
                galleons_charged: price,
                new_balance: balance - price,
                remaining_stock: item.stock,
            });

            let mut fields = replace_field("shop", &shop)?;
            fields.extend(replace_field("users", &users)?);
            Ok(fields)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        let receipt = receipt.ok_or_else(|| StoreError::not_found("class", class_id))?;
        info!(
            class_id,
            user_id,
            item_id,
            quantity,
            charged = receipt.galleons_charged,
            "shop purchase completed"
        );
        Ok(receipt)
    }

    /// Add `amount` units to an item's stock
    pub async fn restock(&self, class_id: &str, item_id: &str, amount: u32) -> Result<ShopItem> {
        if amount == 0 {
            return Err(StoreError::InvalidInput(
                "restock amount must be positive".to_string(),
            ));
        }

        self.modify_item(class_id, item_id, move |item| {
            item.stock = item.stock.checked_add(amount).ok_or_else(|| {
                StoreError::InvalidInput(format!("stock overflow for item '{}'", item.id))
            })?;
            Ok(())
        })
        .await
    }

    async fn modify_item<F>(&self, class_id: &str, item_id: &str, change: F) -> Result<ShopItem>
    where
        F: FnOnce(&mut ShopItem) -> Result<()> + Send,
    {
        let mut updated = None;

        let patch = Patch::computed(|class: &ClassEntity| {
            let mut shop = class.shop.clone();
            let item = shop
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| StoreError::not_found("shop item", item_id))?;
            change(item)?;
            updated = Some(item.clone());
            replace_field("shop", &shop)
        });
        require_class(self.classes.update(class_id, patch).await?, class_id)?;

        updated.ok_or_else(|| StoreError::not_found("shop item", item_id))
    }
}
