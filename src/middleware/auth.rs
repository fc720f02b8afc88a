use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::{CLIENT_ROLE, Claims},
    entity::users::UserRole,
    error::AppError,
    services::auth_service::jwt_secret,
};

/// A caller holding a user access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

/// Any caller holding a valid token, including machine clients without a user.
#[derive(Debug, Clone)]
pub struct ClientAuth {
    pub subject: String,
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_self_or_admin(user: &AuthUser, target: Uuid) -> Result<(), AppError> {
    if user.user_id == target {
        return Ok(());
    }
    ensure_admin(user)
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

fn bearer_claims(parts: &axum::http::request::Parts) -> Result<Claims, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(AppError::BadRequest("Invalid Authorization scheme".into()));
    };

    decode_claims(token.trim(), &jwt_secret()?)
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = match claims.role.as_str() {
            "user" => UserRole::User,
            "admin" => UserRole::Admin,
            _ => return Err(AppError::Unauthorized),
        };
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;
        Ok(AuthUser { user_id, role })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::try_from(bearer_claims(parts)?)
    }
}

impl<S> FromRequestParts<S> for ClientAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts)?;
        if claims.role != CLIENT_ROLE {
            AuthUser::try_from(claims.clone())?;
        }
        Ok(ClientAuth {
            subject: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::encode_claims;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        }
    }

    #[test]
    fn decodes_token_signed_with_same_secret() {
        let id = Uuid::new_v4();
        let token = encode_claims(&claims(&id.to_string(), "admin"), "s3cret").unwrap();

        let user = AuthUser::try_from(decode_claims(&token, "s3cret").unwrap()).unwrap();

        assert_eq!(user.user_id, id);
        assert_eq!(user.role, UserRole::Admin);
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = encode_claims(&claims("x", "user"), "s3cret").unwrap();

        assert!(matches!(
            decode_claims(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn client_token_is_not_a_user() {
        assert!(AuthUser::try_from(claims("web-client", CLIENT_ROLE)).is_err());
    }

    #[test]
    fn self_or_admin_guard() {
        let me = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::User,
        };
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };

        assert!(ensure_self_or_admin(&me, me.user_id).is_ok());
        assert!(matches!(
            ensure_self_or_admin(&me, admin.user_id),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_self_or_admin(&admin, me.user_id).is_ok());
    }
}
