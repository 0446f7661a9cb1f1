// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use exam_portal::{
    config::{Config, PaymentConfig, Pricing, RegistrationConfig, UploadConfig},
    error::AppError,
    integrations::notifier::{Notification, Notifier},
    integrations::gateway::PaymentGateway,
    models::verification::PaymentOrder,
    routes,
    services::payment::PaymentVerifier,
    state::AppState,
    store::{AdminStore, MemoryStore},
    utils::hash::hash_password,
};
use serde_json::Value;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const KEY_SECRET: &str = "test_key_secret";

static MOBILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Gateway double that records requested amounts.
#[derive(Default)]
pub struct FakeGateway {
    pub amounts: Mutex<Vec<i64>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, amount: i64, currency: &str) -> Result<PaymentOrder, AppError> {
        let mut amounts = self.amounts.lock().unwrap();
        amounts.push(amount);
        Ok(PaymentOrder {
            id: format!("order_test_{}", amounts.len()),
            amount: amount * 100,
            currency: currency.to_string(),
            receipt: "receipt_test".to_string(),
        })
    }
}

/// Notifier double that keeps every message, or fails when told to.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::ExternalService("channel down".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: PaymentVerifier,
    pub config: Config,
    pub uploads: tempfile::TempDir,
}

pub fn test_config(uploads: PathBuf, ebook_path: PathBuf) -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_username: None,
        admin_password: None,
        registration: RegistrationConfig {
            prefix: "NFLO26".to_string(),
            start: 1001,
            max_attempts: 32,
        },
        pricing: Pricing {
            junior: 300,
            senior: 500,
            hard_copy_fee: 300,
        },
        payment: PaymentConfig {
            key_id: "rzp_test".to_string(),
            key_secret: KEY_SECRET.to_string(),
            currency: "INR".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
        },
        uploads: UploadConfig {
            dir: uploads,
            placeholder_photo: "public/placeholder.svg".to_string(),
            max_photo_bytes: 200 * 1024,
            max_archive_bytes: 5 * 1024 * 1024,
        },
        ebook_path,
        verification_code_ttl: 600,
        exam_violation_limit: Some(3),
        notify_webhook_url: None,
        cors_origins: vec!["http://localhost:5173".to_string()],
    }
}

/// Spawns the app on a random port, backed by the in-memory store, with one
/// seeded administrator.
pub async fn spawn_app() -> TestApp {
    let uploads = tempfile::tempdir().expect("Failed to create upload dir");
    let ebook_path = uploads.path().join("course-book.pdf");
    let config = test_config(uploads.path().to_path_buf(), ebook_path);

    let store = Arc::new(MemoryStore::new());
    store
        .insert_admin(ADMIN_USERNAME, &hash_password(ADMIN_PASSWORD).unwrap())
        .await
        .unwrap();

    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let state = AppState::new(config.clone(), store.clone(), gateway.clone(), notifier.clone());
    let verifier = state.verifier.clone();
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        gateway,
        notifier,
        verifier,
        config,
        uploads,
    }
}

pub fn unique_mobile() -> String {
    format!("98{:08}", MOBILE_SEQ.fetch_add(1, Ordering::SeqCst))
}

/// Smallest valid PNG header; content is never decoded.
pub fn png_bytes() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\nfake-image".to_vec()
}

pub struct Registration {
    pub category: &'static str,
    pub hard_copy: bool,
    pub total_price: i64,
    pub mobile: String,
    pub with_photo: bool,
    pub signature: Option<String>,
}

impl Registration {
    pub fn junior() -> Self {
        Self {
            category: "junior",
            hard_copy: false,
            total_price: 300,
            mobile: unique_mobile(),
            with_photo: true,
            signature: None,
        }
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn register(&self, reg: Registration) -> reqwest::Response {
        let order_id = format!("order_{}", uuid::Uuid::new_v4().simple());
        let payment_id = format!("pay_{}", uuid::Uuid::new_v4().simple());
        let signature = reg
            .signature
            .clone()
            .unwrap_or_else(|| self.verifier.sign(&order_id, &payment_id));

        let mut form = reqwest::multipart::Form::new()
            .text("fullName", "Asha Verma")
            .text("fatherName", "Ravi Verma")
            .text("motherName", "Sita Verma")
            .text("mobile", reg.mobile.clone())
            .text("email", format!("{}@example.com", reg.mobile))
            .text("address", "12 Lake Road")
            .text("city", "Jaipur")
            .text("pincode", "302001")
            .text("schoolName", "City Public School")
            .text("courseName", "Science")
            .text("category", reg.category)
            .text("hardCopy", reg.hard_copy.to_string())
            .text("totalPrice", reg.total_price.to_string())
            .text("razorpay_order_id", order_id)
            .text("razorpay_payment_id", payment_id)
            .text("razorpay_signature", signature);

        if reg.with_photo {
            let part = reqwest::multipart::Part::bytes(png_bytes())
                .file_name("me.png")
                .mime_str("image/png")
                .unwrap();
            form = form.part("photo", part);
        }

        self.client
            .post(self.url("/api/user/register"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Registers a participant and returns `(registration_id, mobile)`.
    pub async fn registered_participant(&self, category: &'static str) -> (String, String) {
        let mut reg = Registration::junior();
        reg.category = category;
        reg.total_price = if category == "senior" { 500 } else { 300 };
        let mobile = reg.mobile.clone();

        let response = self.register(reg).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        let id = body["participant"]["registration_id"]
            .as_str()
            .unwrap()
            .to_string();
        (id, mobile)
    }

    pub async fn participant_token(&self, registration_id: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/user/login"))
            .json(&serde_json::json!({
                "registration_id": registration_id,
                "password": password,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        let response = self
            .client
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({
                "username": ADMIN_USERNAME,
                "password": ADMIN_PASSWORD,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Adds a two-option question whose key is `a`.
    pub async fn add_question(&self, admin_token: &str, category: &str, marks: i32) -> i64 {
        let response = self
            .client
            .post(self.url("/api/exam/questions"))
            .bearer_auth(admin_token)
            .json(&serde_json::json!({
                "text": "Pick <b>a</b>",
                "options": [{"id": "a", "text": "A"}, {"id": "b", "text": "B"}],
                "correct_option": "a",
                "category": category,
                "marks": marks,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["question"]["id"].as_i64().unwrap()
    }
}
