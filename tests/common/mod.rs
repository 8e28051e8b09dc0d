#![allow(dead_code)]

use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use account_api::config::AppConfig;
use account_api::database::{DatabaseError, DatabaseManager, UserDirectory, UserRecord};
use account_api::server::{app, AppState};
use account_api::session::CookieSessionStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

pub const SECRET: &str = "integration-test-secret";

/// In-memory user directory
#[derive(Default)]
pub struct MemoryUsers(HashMap<Uuid, UserRecord>);

impl MemoryUsers {
    pub fn with(users: &[UserRecord]) -> Self {
        Self(users.iter().map(|u| (u.id, u.clone())).collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.0.get(&id).cloned())
    }
}

/// User directory whose backing store is down
pub struct UnreachableUsers;

#[async_trait]
impl UserDirectory for UnreachableUsers {
    async fn find_user(&self, _id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        Err(DatabaseError::ConnectionError("connection refused".to_string()))
    }
}

pub fn user(name: &str) -> UserRecord {
    UserRecord {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.to_string(),
        created_at: Utc::now(),
    }
}

pub fn config(pairs: &[(&str, &str)]) -> AppConfig {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_lookup(|key| map.get(key).cloned())
}

/// Router plus the session store it trusts, for minting cookies in tests
pub struct TestApp {
    pub router: Router,
    pub sessions: Arc<CookieSessionStore>,
}

impl TestApp {
    pub fn new(users: impl UserDirectory + 'static) -> Self {
        Self::with_config(config(&[("SESSION_SECRET", SECRET)]), users)
    }

    pub fn with_config(config: AppConfig, users: impl UserDirectory + 'static) -> Self {
        let sessions = Arc::new(CookieSessionStore::new(&config.security));
        let database = Arc::new(DatabaseManager::new(config.database.clone()));
        let state = AppState::with_parts(config, database, sessions.clone(), Arc::new(users));
        Self {
            router: app(state),
            sessions,
        }
    }

    /// `Cookie` header value carrying a fresh session for `subject`
    pub fn session_cookie(&self, subject: Uuid) -> String {
        let set_cookie = self.sessions.issue(subject).expect("issue session");
        request_cookie(set_cookie.to_str().expect("ascii cookie"))
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// Reduce a `Set-Cookie` value to the `name=value` pair a browser sends back
pub fn request_cookie(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().trim().to_string()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// The built binary running on a free port; killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub fn spawn(envs: &[(&str, &str)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_account-api"));
        cmd.arg("serve")
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string())
            .env_remove("DATABASE_URL")
            .env_remove("SESSION_SECRET")
            .env_remove("APP_ENV")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/system/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
