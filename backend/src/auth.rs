use axum::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{AccountType, NewUser, PublicUser};
use crate::store::Storage;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    email: &str,
    jwt_secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: expiration,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

pub fn validate_token(
    token: &str,
    jwt_secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

/// Caller identity established from the bearer token. Verification is
/// stateless: the user record is not re-fetched here, so a still-valid
/// token keeps authenticating even if the account has since gone away.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Access token required".to_string()))?;
        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;
        let claims = validate_token(token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Forbidden("Invalid or expired token".to_string()))?;
        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub account_type: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

fn required<'a>(
    field: &'a Option<String>,
    label: &str,
    invalid: &mut Vec<String>,
) -> &'a str {
    match field {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            invalid.push(label.to_string());
            ""
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut invalid = Vec::new();
    let email = required(&input.email, "email", &mut invalid).to_string();
    let password = required(&input.password, "password", &mut invalid).to_string();
    let first_name = required(&input.first_name, "firstName", &mut invalid).to_string();
    let last_name = required(&input.last_name, "lastName", &mut invalid).to_string();
    let account_type = match input.account_type.as_deref().and_then(AccountType::parse) {
        Some(account_type) => account_type,
        None => {
            invalid.push("accountType".to_string());
            AccountType::Buyer
        }
    };
    if !invalid.is_empty() {
        return Err(ApiError::Validation(invalid));
    }

    let password_hash = hash_password(&password)?;
    let user = state.store.insert_user(NewUser {
        email,
        password_hash,
        first_name,
        last_name,
        account_type,
        location: input.location.filter(|l| !l.trim().is_empty()),
        phone: input.phone.filter(|p| !p.trim().is_empty()),
    })?;
    let token = create_token(
        &user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| ApiError::Internal(format!("token creation failed: {}", e)))?;
    log::info!("registered user {}", user.id);
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = input.email.unwrap_or_default();
    let password = input.password.unwrap_or_default();
    // Unknown email and wrong password are indistinguishable to the client.
    let user = state
        .store
        .get_user_by_email(&email)
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;
    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }
    let token = create_token(
        &user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )
    .map_err(|e| ApiError::Internal(format!("token creation failed: {}", e)))?;
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.store.get_user(&caller.id).ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}
