#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;

use riskworks_api::config::AppConfig;
use riskworks_api::database;
use riskworks_api::server::{build_router, AppState};
use riskworks_api::services::user_service::{UserCreate, UserService};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "correct-horse-battery";

/// One running application instance over its own temp-file database,
/// bound to an ephemeral port.
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub pool: SqlitePool,
    pub config: AppConfig,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Result<TestApp> {
        let db_dir = tempfile::tempdir().context("failed to create temp dir")?;
        let db_path = db_dir.path().join("riskworks-test.db");

        let mut config = AppConfig::local();
        config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());
        config.security.bcrypt_cost = 4;
        config.security.jwt_secret = "integration-test-secret".to_string();

        let pool = database::connect(&config.database.url, 5).await?;
        database::migrate(&pool).await?;

        let state = AppState {
            pool: pool.clone(),
            config: config.clone(),
        };
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(TestApp {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            pool,
            config,
            _db_dir: db_dir,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create an account with the given role directly through the
    /// service layer (registration only makes viewers) and log it in.
    pub async fn create_user(&self, email: &str, role: &str) -> Result<String> {
        let service = UserService::new(self.pool.clone(), self.config.security.clone());
        service
            .create(UserCreate {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                full_name: None,
                role: Some(role.to_string()),
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to create {}: {}", email, e))?;
        self.login(email, PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(
            resp.status().is_success(),
            "login failed for {}: {}",
            email,
            resp.status()
        );
        let body: Value = resp.json().await?;
        body["data"]["access_token"]
            .as_str()
            .map(String::from)
            .context("login response missing access_token")
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?)
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?)
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?)
    }

    pub async fn delete(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }
}

/// Unwrap the `{"success": true, "data": ...}` envelope.
pub async fn data(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await?;
    anyhow::ensure!(
        body["success"] == json!(true),
        "expected success envelope, got {} with body {}",
        status,
        body
    );
    Ok(body["data"].clone())
}
