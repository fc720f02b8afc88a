use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ColumnTrait, QueryFilter};

use crate::{
    dto::auth::{CLIENT_ROLE, Claims, GrantType, TokenRequest, TokenResponse},
    entity::users::Column as UserCol,
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    scopes::active_users,
    state::AppState,
};

const TOKEN_TTL_HOURS: i64 = 24;

pub fn jwt_secret() -> AppResult<String> {
    std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))
}

pub fn encode_claims(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn issue_token(
    state: &AppState,
    payload: TokenRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let (sub, role) = match payload.grant_type {
        GrantType::Password => password_grant(state, &payload).await?,
        GrantType::ClientCredentials => client_credentials_grant(&payload)?,
    };

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub,
        role,
        exp: expiration.timestamp() as usize,
    };
    let access_token = encode_claims(&claims, &jwt_secret()?)?;

    tracing::debug!(role = %claims.role, "access token issued");

    Ok(ApiResponse::success(
        "Token issued",
        TokenResponse {
            token_type: "Bearer".to_string(),
            access_token,
            expires_in: TOKEN_TTL_HOURS * 3600,
        },
        Some(Meta::empty()),
    ))
}

async fn password_grant(state: &AppState, payload: &TokenRequest) -> AppResult<(String, String)> {
    let (Some(email), Some(password)) = (&payload.username, &payload.password) else {
        return Err(AppError::BadRequest(
            "username and password are required".into(),
        ));
    };

    let user = active_users()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized);
    }

    Ok((user.id.to_string(), user.role.as_str().to_string()))
}

fn client_credentials_grant(payload: &TokenRequest) -> AppResult<(String, String)> {
    let expected_id = std::env::var("OAUTH_CLIENT_ID")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("OAUTH_CLIENT_ID is not set")))?;
    let expected_secret = std::env::var("OAUTH_CLIENT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("OAUTH_CLIENT_SECRET is not set")))?;

    match (&payload.client_id, &payload.client_secret) {
        (Some(id), Some(secret)) if *id == expected_id && *secret == expected_secret => {
            Ok((id.clone(), CLIENT_ROLE.to_string()))
        }
        (Some(_), Some(_)) => Err(AppError::Unauthorized),
        _ => Err(AppError::BadRequest(
            "client_id and client_secret are required".into(),
        )),
    }
}
