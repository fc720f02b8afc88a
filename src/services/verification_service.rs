use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit::record_user_event,
    dto::users::MessageData,
    entity::{
        Users,
        users::{Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    notifications::NotificationKind,
    response::{ApiResponse, Meta},
    scopes::{active_users, find_active_user},
    state::AppState,
};

const TOKEN_BYTES: usize = 32;
const TOKEN_DRAWS: usize = 5;

/// 256 bits from the OS CSPRNG, base64url without padding.
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Draws tokens until one is held by no user row, soft-deleted rows included.
/// The unique index on `verification_token` still guards the write itself.
pub async fn issue_unique_token<C: ConnectionTrait>(db: &C) -> AppResult<String> {
    for draw in 1..=TOKEN_DRAWS {
        let token = generate_verification_token();
        let holders = Users::find()
            .filter(UserCol::VerificationToken.eq(token.as_str()))
            .count(db)
            .await?;
        if holders == 0 {
            return Ok(token);
        }
        tracing::warn!(draw, "verification token collision, drawing again");
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "no unused verification token after {TOKEN_DRAWS} draws"
    )))
}

pub async fn find_by_verification_token<C: ConnectionTrait>(
    db: &C,
    token: &str,
) -> AppResult<UserModel> {
    active_users()
        .filter(UserCol::VerificationToken.eq(token))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

/// Consumes `token`. The write only matches while the token is still stored, so of two
/// concurrent redemptions exactly one succeeds and the other sees `NotFound`.
pub async fn verify(state: &AppState, token: &str) -> AppResult<ApiResponse<MessageData>> {
    let user = find_by_verification_token(state.orm.as_ref(), token).await?;

    let result = Users::update_many()
        .col_expr(UserCol::Verified, Expr::value(true))
        .col_expr(UserCol::VerificationToken, Expr::value(Option::<String>::None))
        .col_expr(UserCol::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(UserCol::Id.eq(user.id))
        .filter(UserCol::VerificationToken.eq(token))
        .exec(state.orm.as_ref())
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(user_id = %user.id, "account verified");
    record_user_event(state.orm.as_ref(), user.id, "user_verify").await;

    Ok(message("The account has been verified successfully"))
}

/// Re-delivers the pending token; it is not rotated.
pub async fn resend(state: &AppState, id: Uuid) -> AppResult<ApiResponse<MessageData>> {
    let user = find_active_user(state.orm.as_ref(), id).await?;
    if user.is_verified() {
        return Err(AppError::Conflict("This user is already verified".into()));
    }

    state
        .notifier
        .notify(NotificationKind::AccountCreated, &user)
        .await;

    Ok(message("The verification email has been resent"))
}

fn message(text: &str) -> ApiResponse<MessageData> {
    ApiResponse::success(
        text,
        MessageData {
            message: text.to_string(),
        },
        Some(Meta::empty()),
    )
}
