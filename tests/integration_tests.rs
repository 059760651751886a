mod common;

use common::TestEnvironment;
use reggie_rs::models::SaleStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

fn setmeal_status(page: &Value, setmeal_id: i64) -> i64 {
    page["data"]["records"]
        .as_array()
        .unwrap()
        .iter()
        .find(|record| record["id"].as_i64() == Some(setmeal_id))
        .map(|record| record["status"].as_i64().unwrap())
        .unwrap()
}

#[tokio::test]
async fn test_catalog_consistency_walkthrough() {
    let env = TestEnvironment::new().await;

    let dishes = env.create_category("Hunan", 1).await;
    let combos = env.create_category("Sets", 2).await;
    let dish_id = env.create_dish(dishes, "Chili Fish", 1).await;
    let (status, body) = env
        .create_setmeal(combos, "Fish Set", 1, &[dish_id])
        .await;
    assert_eq!(status, 200, "{}", body);
    let setmeal_id = body["data"]["id"].as_i64().unwrap();

    // A category with a dish cannot be deleted
    let (status, body) = env.delete(&format!("/category?id={}", dishes)).await;
    assert_eq!(status, 409);
    assert_eq!(body["code"], 0);
    assert!(body["data"].is_null());

    // Stopping the dish stops the combo holding it
    let (status, _) = env
        .post_empty(&format!("/dish/status/0?ids={}", dish_id))
        .await;
    assert_eq!(status, 200);
    let (_, page) = env.get("/setmeal/page?page=1&pageSize=10").await;
    assert_eq!(setmeal_status(&page, setmeal_id), 0);

    // The combo cannot come back while the dish is stopped
    let (status, _) = env
        .post_empty(&format!("/setmeal/status/1?ids={}", setmeal_id))
        .await;
    assert_eq!(status, 409);

    let (status, _) = env
        .post_empty(&format!("/dish/status/1?ids={}", dish_id))
        .await;
    assert_eq!(status, 200);
    let (status, body) = env
        .post_empty(&format!("/setmeal/status/1?ids={}", setmeal_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["code"], 1);

    let (_, page) = env.get("/setmeal/page").await;
    assert_eq!(setmeal_status(&page, setmeal_id), 1);
}

#[tokio::test]
async fn test_dish_crud_and_validation() {
    let env = TestEnvironment::new().await;
    let category = env.create_category("Soups", 1).await;
    let dish_id = env.create_dish(category, "Hot and Sour Soup", 1).await;

    let (status, body) = env.get(&format!("/dish/{}", dish_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Hot and Sour Soup");
    assert_eq!(body["data"]["flavors"].as_array().unwrap().len(), 1);

    let (status, body) = env
        .put(
            "/dish",
            json!({
                "id": dish_id,
                "name": "Hot and Sour Soup (large)",
                "categoryId": category,
                "price": 32,
                "status": 1,
                "flavors": []
            }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["flavors"].as_array().unwrap().len(), 0);

    let (status, body) = env.get("/dish/page?page=1&pageSize=10&name=large").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["categoryName"], "Soups");

    let (status, body) = env.get("/dish/999").await;
    assert_eq!(status, 404);
    assert_eq!(body["code"], 0);

    let (status, body) = env
        .post(
            "/dish",
            json!({ "name": "", "categoryId": category, "price": 1 }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], 0);

    let (status, _) = env.delete(&format!("/dish?ids={}", dish_id)).await;
    assert_eq!(status, 200);
    let (status, _) = env.get(&format!("/dish/{}", dish_id)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_dish_list_cache_is_rebuilt_after_change() {
    let env = TestEnvironment::new().await;
    let category = env.create_category("Noodles", 1).await;
    let dish_id = env.create_dish(category, "Beef Noodles", 1).await;
    let list_path = format!("/dish/list?categoryId={}&status=1", category);

    let (_, first) = env.get(&list_path).await;
    assert_eq!(first["data"].as_array().unwrap().len(), 1);
    assert!(env
        .state
        .cache
        .get_dishes(category, SaleStatus::OnSale)
        .await
        .is_some());

    let (_, second) = env.get(&list_path).await;
    assert_eq!(first["data"], second["data"]);

    env.create_dish(category, "Dan Dan Noodles", 1).await;
    assert!(env
        .state
        .cache
        .get_dishes(category, SaleStatus::OnSale)
        .await
        .is_none());
    let (_, rebuilt) = env.get(&list_path).await;
    assert_eq!(rebuilt["data"].as_array().unwrap().len(), 2);

    env.post_empty(&format!("/dish/status/0?ids={}", dish_id))
        .await;
    let (_, after_stop) = env.get(&list_path).await;
    assert_eq!(after_stop["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cart_requires_login() {
    let env = TestEnvironment::new().await;

    let (status, body) = env.get("/shoppingCart/list").await;
    assert_eq!(status, 401);
    assert_eq!(body["code"], 0);
    assert_eq!(body["msg"], "NOTLOGIN");

    let (status, _) = env
        .post("/user/sendMsg", json!({ "phone": "not-a-phone" }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = env
        .post(
            "/user/login",
            json!({ "phone": "13800000001", "code": "000000" }),
        )
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_cart_add_sub_and_clean() {
    let env = TestEnvironment::new().await;
    let user = env.login("13800000002").await;
    assert_eq!(user["phone"], "13800000002");

    let item = json!({ "dishId": 7, "name": "Mapo Tofu", "amount": 18, "dishFlavor": "hot" });
    let (status, body) = env.post("/shoppingCart/add", item.clone()).await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["data"]["number"], 1);

    let (_, body) = env.post("/shoppingCart/add", item.clone()).await;
    assert_eq!(body["data"]["number"], 2);

    let (_, body) = env.post("/shoppingCart/sub", json!({ "dishId": 7 })).await;
    assert_eq!(body["data"]["number"], 1);
    let (_, body) = env.post("/shoppingCart/sub", json!({ "dishId": 7 })).await;
    assert_eq!(body["data"]["number"], 0);

    let (status, _) = env.post("/shoppingCart/sub", json!({ "dishId": 7 })).await;
    assert_eq!(status, 404);

    let (status, _) = env.post("/shoppingCart/add", json!({ "name": "nothing" })).await;
    assert_eq!(status, 400);

    env.post("/shoppingCart/add", item.clone()).await;
    env.post("/shoppingCart/add", json!({ "setmealId": 3, "name": "Set", "amount": 40 }))
        .await;
    let (_, body) = env.get("/shoppingCart/list").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = env.delete("/shoppingCart/clean").await;
    assert_eq!(status, 200);
    let (_, body) = env.get("/shoppingCart/list").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_submission_flow() {
    let env = TestEnvironment::new().await;
    env.login("13800000003").await;

    let (status, _) = env.post("/order/submit", json!({})).await;
    assert_eq!(status, 400);

    let fish = json!({ "dishId": 1, "name": "Chili Fish", "amount": 28.5 });
    env.post("/shoppingCart/add", fish.clone()).await;
    env.post("/shoppingCart/add", fish).await;
    env.post("/shoppingCart/add", json!({ "setmealId": 2, "name": "Lunch Set", "amount": 45 }))
        .await;

    let (status, body) = env
        .post(
            "/order/submit",
            json!({ "address": "1 Harbour Road", "consignee": "Lee", "phone": "13800000003" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let order = &body["data"];
    assert_eq!(decimal(&order["amount"]), dec!(102));
    assert_eq!(order["status"], 1);
    let order_id = order["id"].as_i64().unwrap();

    let (_, cart) = env.get("/shoppingCart/list").await;
    assert!(cart["data"].as_array().unwrap().is_empty());

    let (_, page) = env.get("/order/userPage?page=1&pageSize=5").await;
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(
        page["data"]["records"][0]["orderDetails"]
            .as_array()
            .unwrap()
            .len(),
        2
    );

    let (status, body) = env
        .put("/order", json!({ "id": order_id, "status": 2 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], 2);
    assert!(!body["data"]["checkoutTime"].is_null());

    let (status, _) = env.put("/order", json!({ "id": order_id })).await;
    assert_eq!(status, 400);
    let (status, _) = env.put("/order", json!({ "id": 1, "status": 3 })).await;
    assert_eq!(status, 404);

    let (_, admin) = env
        .get("/order/page?beginTime=2000-01-01%2000:00:00&endTime=2999-12-31%2023:59:59")
        .await;
    assert_eq!(admin["data"]["total"], 1);
    let (status, _) = env.get("/order/page?beginTime=yesterday").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_carts_are_isolated_between_sessions() {
    let env = TestEnvironment::new().await;
    env.login("13800000004").await;
    env.post("/shoppingCart/add", json!({ "dishId": 1, "name": "Rice", "amount": 2 }))
        .await;

    let stranger = env.fresh_client();
    let response = stranger
        .get(env.url("/shoppingCart/list"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let (status, _) = env.post_empty("/user/logout").await;
    assert_eq!(status, 200);
    let (status, _) = env.get("/shoppingCart/list").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_health_metrics_and_seed() {
    let env = TestEnvironment::new().await;

    let (status, body) = env.get("/health/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["cache"]["provider"], "memory");

    let (status, body) = env.post_empty("/admin/setup-tables").await;
    assert_eq!(status, 200);
    assert!(body["tables_created"].as_array().unwrap().is_empty());

    let (status, body) = env.post_empty("/admin/seed").await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["setmeals_created"], 1);

    let (_, categories) = env.get("/category/list?type=1").await;
    assert_eq!(categories["data"].as_array().unwrap().len(), 3);

    let metrics = env
        .client
        .get(env.url("/metrics"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("http_requests_total"));
}

#[tokio::test]
async fn test_malformed_json_uses_failure_envelope() {
    let env = TestEnvironment::new().await;
    let response = env
        .client
        .post(env.url("/category"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 0);
}
