pub mod roles;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: i64, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn user_id(&self) -> Result<i64, JwtError> {
        self.sub.parse().map_err(|_| JwtError::MalformedSubject)
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken,
    InvalidSecret,
    MalformedSubject,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken => write!(f, "Invalid or expired token"),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::MalformedSubject => write!(f, "Malformed subject claim"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(user_id: i64, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let claims = Claims::new(user_id, security.jwt_expiry_hours);
    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    let header = Header::default();

    encode(&header, &claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| JwtError::InvalidToken)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hashed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "unit-test-secret".to_string(),
            jwt_expiry_hours: 1,
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn test_jwt_round_trip() {
        let security = test_security();
        let token = generate_jwt(42, &security).unwrap();
        let claims = decode_jwt(&token, &security).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let security = test_security();
        let token = generate_jwt(42, &security).unwrap();

        let other = SecurityConfig {
            jwt_secret: "a-different-secret".to_string(),
            ..test_security()
        };
        assert!(matches!(
            decode_jwt(&token, &other),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_jwt_rejects_expired() {
        let security = test_security();
        let claims = Claims {
            sub: "42".to_string(),
            // Far enough in the past to clear the default leeway
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            decode_jwt(&token, &security),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_jwt_requires_secret() {
        let security = SecurityConfig {
            jwt_secret: String::new(),
            ..test_security()
        };
        assert!(matches!(
            generate_jwt(1, &security),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hashed = hash_password("hunter2", 4).unwrap();
        assert_ne!(hashed, "hunter2");
        assert!(verify_password("hunter2", &hashed).unwrap());
        assert!(!verify_password("hunter3", &hashed).unwrap());
    }
}
