pub mod password;

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::database::models::Usuario;

pub use password::{hash_password, verify_password, PasswordError, PasswordHash};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id_usuario: i64,
    pub username: String,
    pub rol: String,
    #[serde(default)]
    pub estado: Option<i64>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
    InvalidExpiry(u64),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
            JwtError::InvalidExpiry(hours) => write!(f, "Token expiry of {} hours is out of range", hours),
        }
    }
}

impl std::error::Error for JwtError {}

/// Signs and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: TimeDelta,
}

impl TokenSigner {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }
        let expiry = i64::try_from(expiry_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .ok_or(JwtError::InvalidExpiry(expiry_hours))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, JwtError> {
        Self::new(&security.jwt_secret, security.jwt_expiry_hours)
    }

    pub fn claims_for(&self, user: &Usuario) -> Result<Claims, JwtError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.expiry)
            .ok_or_else(|| JwtError::TokenGeneration("token expiry overflows the calendar".to_string()))?;
        Ok(Claims {
            id_usuario: user.id_usuario,
            username: user.username.clone(),
            rol: user.rol.clone(),
            estado: user.estado,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::default(), claims, &self.encoding)
            .map_err(|e| JwtError::TokenGeneration(e.to_string()))
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Usuario {
        Usuario {
            id_usuario: 12,
            username: "agente".into(),
            contrasena: None,
            rol: "admin".into(),
            estado: Some(1),
            fecha_creacion: None,
            deleted_at: None,
        }
    }

    #[test]
    fn signed_tokens_verify() {
        let signer = TokenSigner::new("secreto", 2).unwrap();
        let claims = signer.claims_for(&user()).unwrap();
        assert_eq!(claims.exp - claims.iat, 2 * 3600);

        let token = signer.sign(&claims).unwrap();
        let decoded = signer.verify(&token).unwrap();
        assert_eq!(decoded.id_usuario, 12);
        assert_eq!(decoded.rol, "admin");
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let signer = TokenSigner::new("secreto", 2).unwrap();
        let other = TokenSigner::new("otro", 2).unwrap();
        let token = other.sign(&other.claims_for(&user()).unwrap()).unwrap();
        assert!(signer.verify(&token).is_err());

        let mut claims = signer.claims_for(&user()).unwrap();
        claims.iat -= 10_000;
        claims.exp = claims.iat + 60;
        let expired = signer.sign(&claims).unwrap();
        assert!(signer.verify(&expired).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(TokenSigner::new("", 2), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn out_of_range_expiry_is_an_error() {
        assert!(matches!(
            TokenSigner::new("secreto", 10_000_000_000_000),
            Err(JwtError::InvalidExpiry(10_000_000_000_000))
        ));
        assert!(matches!(TokenSigner::new("secreto", u64::MAX), Err(JwtError::InvalidExpiry(_))));
    }

    #[test]
    fn expiry_past_the_calendar_fails_to_build_claims() {
        let signer = TokenSigner::new("secreto", 3_000_000_000).unwrap();
        assert!(matches!(signer.claims_for(&user()), Err(JwtError::TokenGeneration(_))));
    }
}
