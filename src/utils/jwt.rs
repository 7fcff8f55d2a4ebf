use crate::config::get_config;
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Signs an HS256 token for the user. The expiry window is fixed at
/// issuance from `JWT_TTL_SECONDS`.
pub fn sign_token(user_id: Uuid, role: &str) -> Result<String> {
    let config = get_config();
    let issued_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Internal(e.to_string()))?
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: issued_at + config.jwt_ttl_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}
