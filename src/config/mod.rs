use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Fallback signing secret. Fine for local work, never for cloud.
pub const DEFAULT_JWT_SECRET: &str = "riskworks-local-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Cloud,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Cloud => "cloud",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub migrate_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub frontend_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("RISKWORKS_ENV").as_deref() {
            Ok("cloud") => Environment::Cloud,
            _ => Environment::Local,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Cloud => Self::cloud(),
            Environment::Local => Self::local(),
        }
        .with_env_overrides();

        if config.environment == Environment::Cloud
            && config.security.jwt_secret == DEFAULT_JWT_SECRET
        {
            tracing::warn!("JWT_SECRET is unset; cloud deployment is using the built-in secret");
        }

        config
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIGRATE_ON_START") {
            self.database.migrate_on_start = v.parse().unwrap_or(self.database.migrate_on_start);
        }

        // API overrides
        if let Ok(v) = env::var("HOST") {
            self.api.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("FRONTEND_ORIGIN") {
            self.api.frontend_origin = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        self
    }

    pub fn local() -> Self {
        Self {
            environment: Environment::Local,
            database: DatabaseConfig {
                url: "sqlite://riskworks.db?mode=rwc".to_string(),
                max_connections: 5,
                migrate_on_start: true,
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                frontend_origin: "http://localhost:5173".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: 6,           // keeps local logins and the test suite fast
            },
        }
    }

    pub fn cloud() -> Self {
        Self {
            environment: Environment::Cloud,
            database: DatabaseConfig {
                url: "sqlite:///data/riskworks.db?mode=rwc".to_string(),
                max_connections: 20,
                migrate_on_start: true,
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                frontend_origin: "https://riskworks.app".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 12,
            },
        }
    }

    /// One-line startup summary. Never includes the JWT secret.
    pub fn summary(&self) -> String {
        format!(
            "env={} db={} bind={}:{} frontend={}",
            self.environment.as_str(),
            self.database.url,
            self.api.host,
            self.api.port,
            self.api.frontend_origin
        )
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
