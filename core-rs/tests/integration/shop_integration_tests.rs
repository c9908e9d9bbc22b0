//! Integration tests for the class shop
//!
//! Purchases touch stock, balance and inventory in one class document
//! update. These tests drive purchases concurrently against real files and
//! check that no unit is sold twice and no galleon is spent twice.

use grimoire_core::model::ClassUser;
use grimoire_core::{ClassServices, Repositories, StoreConfig, StoreError};
use serde_json::json;
use tempfile::TempDir;
use tokio_test::assert_ok;

const CLASS: &str = "care-of-magical-creatures";

async fn setup(stock: u32, galleons: u64, shoppers: &[&str]) -> (TempDir, Repositories, ClassServices) {
    let temp = TempDir::new().unwrap();
    let repos = Repositories::from_config(&StoreConfig::with_data_dir(temp.path())).unwrap();

    let mut users = serde_json::Map::new();
    for shopper in shoppers {
        let mut member = ClassUser::new_member();
        member.progress.currencies.galleons = galleons;
        users.insert(shopper.to_string(), serde_json::to_value(member).unwrap());
    }

    repos
        .classes
        .create(json!({
            "id": CLASS,
            "name": "Care of Magical Creatures",
            "description": "Hagrid's hut",
            "professorId": "hagrid",
            "isPrivate": false,
            "password": null,
            "isActive": true,
            "createdAt": "2024-09-01T09:00:00Z",
            "users": users,
            "achievements": [],
            "missions": [],
            "quizzes": [],
            "shop": [{
                "id": "flobberworm-food",
                "name": "Flobberworm Food",
                "description": "Lettuce, mostly",
                "icon": "🥬",
                "price": 10,
                "category": "supplies",
                "stock": stock
            }],
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
async fn test_purchase_updates_stock_balance_and_inventory() {
    let (_temp, repos, services) = setup(5, 100, &["hermione"]).await;

    let receipt = assert_ok!(
        services
            .shop
            .purchase(CLASS, "hermione", "flobberworm-food", 3)
            .await
    );
    assert_eq!(receipt.galleons_charged, 30);
    assert_eq!(receipt.new_balance, 70);
    assert_eq!(receipt.remaining_stock, 2);

    let class = repos.classes.find_by_id(CLASS).await.unwrap().unwrap();
    assert_eq!(class.shop[0].stock, 2);
    let member = &class.users["hermione"];
    assert_eq!(member.progress.currencies.galleons, 70);
    assert_eq!(member.inventory, vec!["flobberworm-food"; 3]);
}

#[tokio::test]
async fn test_rejected_purchase_changes_nothing() {
    let (_temp, repos, services) = setup(2, 15, &["ron"]).await;

    let too_many = services.shop.purchase(CLASS, "ron", "flobberworm-food", 3).await;
    assert!(matches!(
        too_many,
        Err(StoreError::InsufficientStock { requested: 3, available: 2, .. })
    ));

    let too_poor = services.shop.purchase(CLASS, "ron", "flobberworm-food", 2).await;
    assert!(matches!(
        too_poor,
        Err(StoreError::InsufficientFunds { balance: 15, price: 20 })
    ));

    let zero = services.shop.purchase(CLASS, "ron", "flobberworm-food", 0).await;
    assert!(matches!(zero, Err(StoreError::InvalidInput(_))));

    let class = repos.classes.find_by_id(CLASS).await.unwrap().unwrap();
    assert_eq!(class.shop[0].stock, 2);
    assert_eq!(class.users["ron"].progress.currencies.galleons, 15);
    assert!(class.users["ron"].inventory.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_never_oversell() {
    let shoppers = ["harry", "ron", "hermione", "neville", "luna", "ginny", "dean", "seamus"];
    let (_temp, repos, services) = setup(5, 100, &shoppers).await;

    let mut handles = Vec::new();
    for shopper in shoppers {
        let shop = services.shop.clone();
        handles.push(tokio::spawn(async move {
            shop.purchase(CLASS, shopper, "flobberworm-food", 1).await
        }));
    }

    let mut sold = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(StoreError::InsufficientStock { .. }) => out_of_stock += 1,
            Err(other) => panic!("unexpected purchase error: {:?}", other),
        }
    }
    assert_eq!(sold, 5);
    assert_eq!(out_of_stock, 3);

    let class = repos.classes.find_by_id(CLASS).await.unwrap().unwrap();
    assert_eq!(class.shop[0].stock, 0);
    let owned: usize = class.users.values().map(|m| m.inventory.len()).sum();
    assert_eq!(owned, 5);
    let spent: u64 = class
        .users
        .values()
        .map(|m| 100 - m.progress.currencies.galleons)
        .sum();
    assert_eq!(spent, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_purchases_by_one_member_never_overspend() {
    let (_temp, repos, services) = setup(50, 35, &["fred"]).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let shop = services.shop.clone();
        handles.push(tokio::spawn(async move {
            shop.purchase(CLASS, "fred", "flobberworm-food", 1).await
        }));
    }

    let mut bought = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            bought += 1;
        }
    }
    assert_eq!(bought, 3);

    let class = repos.classes.find_by_id(CLASS).await.unwrap().unwrap();
    assert_eq!(class.users["fred"].progress.currencies.galleons, 5);
    assert_eq!(class.shop[0].stock, 47);
}

#[tokio::test]
async fn test_restock_and_item_management() {
    let (_temp, _repos, services) = setup(0, 100, &["cho"]).await;

    // Step 1: empty item cannot be bought
    assert!(services.shop.purchase(CLASS, "cho", "flobberworm-food", 1).await.is_err());

    // Step 2: restock and buy
    let item = services.shop.restock(CLASS, "flobberworm-food", 4).await.unwrap();
    assert_eq!(item.stock, 4);
    assert_ok!(services.shop.purchase(CLASS, "cho", "flobberworm-food", 1).await);

    // Step 3: add and remove a second item
    let created = services
        .shop
        .create(
            CLASS,
            json!({
                "name": "Bowtruckle Treats",
                "description": "Woodlice",
                "icon": "🪲",
                "price": 4,
                "category": "supplies",
                "stock": 10
            }),
        )
        .await
        .unwrap();
    assert_eq!(services.shop.list(CLASS).await.unwrap().len(), 2);

    services.shop.remove(CLASS, &created.id).await.unwrap();
    assert!(services.shop.get(CLASS, &created.id).await.unwrap().is_none());
    assert!(matches!(
        services.shop.remove(CLASS, &created.id).await,
        Err(StoreError::NotFound { .. })
    ));
}
