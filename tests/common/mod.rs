#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LOCATION, SET_COOKIE};
use reqwest::{Client, Response};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use passreset::auth::password;
use passreset::config::Config;
use passreset::db;
use passreset::email::Mailer;
use passreset::models::User;

pub const TEST_SECRET: &str = "test-secret-key-for-signing";
pub const BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub username: String,
    pub reset_url: String,
}

/// Captures outgoing mail instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Takes `delay` per message, like a sluggish SMTP relay.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(
        &self,
        to_email: &str,
        username: &str,
        reset_url: &str,
        _ttl: Duration,
    ) -> Result<(), String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err("SMTP relay refused connection".to_string());
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to_email.to_string(),
            username: username.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        secret_key: TEST_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        base_url: BASE_URL.to_string(),
        token_ttl: Duration::from_secs(3600),
        max_body_size: 65_536,
        log_level: "warn".to_string(),
        smtp: None,
    }
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert an account directly, the way registration would.
    pub async fn seed_user(&self, email: &str, username: &str, plaintext: &str) -> User {
        let hashed = password::hash(plaintext).expect("hashing failed");
        db::users::create(&self.pool, email, username, &hashed)
            .await
            .expect("seed user failed")
    }

    pub async fn stored_hash(&self, email: &str) -> String {
        db::users::find_by_email(&self.pool, email)
            .await
            .expect("lookup failed")
            .expect("user missing")
            .hashed_password
    }

    pub async fn request_reset(&self, email: &str) -> Response {
        self.client
            .post(self.url("/reset-password"))
            .form(&[("email", email)])
            .send()
            .await
            .expect("reset request failed")
    }

    pub async fn open_link(&self, token: &str) -> Response {
        self.client
            .get(self.url(&format!("/reset-password/{token}")))
            .send()
            .await
            .expect("open link failed")
    }

    pub async fn submit_password(&self, token: &str, new_password: &str) -> Response {
        self.client
            .post(self.url(&format!("/reset-password/{token}")))
            .form(&[("password", new_password)])
            .send()
            .await
            .expect("submit password failed")
    }

    /// Reset mail is sent off the request path; poll until `count` messages
    /// have arrived.
    pub async fn wait_for_mail(&self, count: usize) -> Vec<SentMail> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let sent = self.mailer.sent();
            if sent.len() >= count {
                return sent;
            }
            assert!(
                Instant::now() < deadline,
                "expected {count} reset mails, got {}",
                sent.len()
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Give detached mail tasks time to finish before asserting nothing more
    /// was sent.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    /// Token from the most recent reset mail.
    pub async fn last_token(&self) -> String {
        let mail = self
            .wait_for_mail(1)
            .await
            .pop()
            .expect("no reset mail was sent");
        mail.reset_url
            .strip_prefix(&format!("{BASE_URL}/reset-password/"))
            .expect("unexpected reset url")
            .to_string()
    }
}

pub fn location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Value of the `flash` cookie set by a response, if any.
pub fn flash_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("flash="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(RecordingMailer::default()).await
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app_with(mailer: RecordingMailer) -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("passreset_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let mailer = Arc::new(mailer);
    let (app, _state) =
        passreset::build_app_with_mailer(pool.clone(), test_config(test_url), mailer.clone());

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        db_name,
        mailer,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
