use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use reggie_rs::models::ServiceResult;
use reggie_rs::services::SmsSender;
use reggie_rs::{create_app, AppState, Config, Metrics};

/// Captures verification codes so tests can log in
#[derive(Default)]
pub struct CapturingSmsSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl CapturingSmsSender {
    pub fn code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == phone)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl SmsSender for CapturingSmsSender {
    async fn send_code(&self, phone: &str, code: &str) -> ServiceResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), code.to_string()));
        Ok(())
    }
}

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub sms: Arc<CapturingSmsSender>,
    pub state: AppState,
}

impl TestEnvironment {
    /// Boot the full router with in-memory backends on an ephemeral port
    pub async fn new() -> Self {
        let config = Config::in_memory();
        let sms = Arc::new(CapturingSmsSender::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let state = AppState::with_sms_sender(&config, metrics, sms.clone()).await;
        let app = create_app(state.clone(), &config.server);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            client,
            base_url: format!("http://{}", addr),
            sms,
            state,
        }
    }

    /// A second customer with its own cookie jar against the same server
    pub fn fresh_client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        read(self.client.get(self.url(path)).send().await.unwrap()).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        read(self.client.post(self.url(path)).json(&body).send().await.unwrap()).await
    }

    pub async fn post_empty(&self, path: &str) -> (u16, Value) {
        read(self.client.post(self.url(path)).send().await.unwrap()).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        read(self.client.put(self.url(path)).json(&body).send().await.unwrap()).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        read(self.client.delete(self.url(path)).send().await.unwrap()).await
    }

    /// Send a code to `phone` and log in with it on this environment's client
    pub async fn login(&self, phone: &str) -> Value {
        let (status, _) = self.post("/user/sendMsg", json!({ "phone": phone })).await;
        assert_eq!(status, 200);
        let code = self.sms.code_for(phone).expect("code was sent");

        let (status, body) = self
            .post("/user/login", json!({ "phone": phone, "code": code }))
            .await;
        assert_eq!(status, 200, "login failed: {}", body);
        body["data"].clone()
    }

    pub async fn create_category(&self, name: &str, category_type: u8) -> i64 {
        let (status, body) = self
            .post(
                "/category",
                json!({ "type": category_type, "name": name, "sort": 1 }),
            )
            .await;
        assert_eq!(status, 200, "category create failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_dish(&self, category_id: i64, name: &str, status: u8) -> i64 {
        let (code, body) = self
            .post(
                "/dish",
                json!({
                    "name": name,
                    "categoryId": category_id,
                    "price": 28.5,
                    "status": status,
                    "flavors": [{ "name": "Spice", "value": ["mild", "hot"] }]
                }),
            )
            .await;
        assert_eq!(code, 200, "dish create failed: {}", body);
        body["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_setmeal(
        &self,
        category_id: i64,
        name: &str,
        status: u8,
        dish_ids: &[i64],
    ) -> (u16, Value) {
        let dishes: Vec<Value> = dish_ids
            .iter()
            .map(|id| json!({ "dishId": id, "name": format!("dish {}", id), "price": 28.5, "copies": 1 }))
            .collect();
        self.post(
            "/setmeal",
            json!({
                "categoryId": category_id,
                "name": name,
                "price": 50,
                "status": status,
                "setmealDishes": dishes
            }),
        )
        .await
    }
}

async fn read(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}
