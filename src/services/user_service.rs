use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use email_address::EmailAddress;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit::record_user_event,
    dto::users::{CreateUserRequest, UpdateUserRequest, UserList},
    entity::{
        Users,
        users::{ActiveModel, Column as UserCol, Model as UserModel, UserRole},
    },
    error::{AppError, AppResult, FieldErrors},
    middleware::auth::{AuthUser, ensure_admin, ensure_self_or_admin},
    models::User,
    notifications::NotificationKind,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    scopes::{active_users, find_active_user},
    services::verification_service::{generate_verification_token, issue_unique_token},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const EMAIL_TAKEN: &str = "The email has already been taken.";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn password_matches(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn check_email(errors: &mut FieldErrors, email: &str) {
    if !EmailAddress::is_valid(email) {
        push(errors, "email", "The email must be a valid email address.");
    }
}

fn check_password(errors: &mut FieldErrors, password: &str, confirmation: Option<&str>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        push(errors, "password", "The password must be at least 6 characters.");
    }
    if confirmation != Some(password) {
        push(errors, "password", "The password confirmation does not match.");
    }
}

pub fn validate_registration(payload: &CreateUserRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if payload.name.trim().is_empty() {
        push(&mut errors, "name", "The name field is required.");
    }
    if payload.email.trim().is_empty() {
        push(&mut errors, "email", "The email field is required.");
    } else {
        check_email(&mut errors, &payload.email);
    }
    if payload.password.is_empty() {
        push(&mut errors, "password", "The password field is required.");
    } else {
        check_password(
            &mut errors,
            &payload.password,
            Some(payload.password_confirmation.as_str()),
        );
    }
    errors
}

pub fn validate_update(payload: &UpdateUserRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if payload.name.as_ref().is_some_and(|name| name.trim().is_empty()) {
        push(&mut errors, "name", "The name field must not be empty.");
    }
    if let Some(email) = &payload.email {
        check_email(&mut errors, email);
    }
    if let Some(password) = &payload.password {
        check_password(
            &mut errors,
            password,
            payload.password_confirmation.as_deref(),
        );
    }
    errors
}

/// Whether `email` belongs to any row other than `except`, soft-deleted rows included.
async fn email_taken<C: ConnectionTrait>(
    db: &C,
    email: &str,
    except: Option<Uuid>,
) -> AppResult<bool> {
    let mut query = Users::find().filter(UserCol::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(UserCol::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// A concurrent writer can still win the race for an address; the unique index reports it.
fn map_unique_violation(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("email") => {
            AppError::field("email", EMAIL_TAKEN)
        }
        _ => AppError::OrmError(err),
    }
}

#[derive(Debug)]
pub struct UpdatePlan {
    pub changes: ActiveModel,
    pub email_changed: bool,
    pub role_changed: bool,
}

/// The admin flag is only accepted for a verified account keeping its email.
fn ensure_role_change_allowed(existing: &UserModel, payload: &UpdateUserRequest) -> AppResult<()> {
    let email_changes = payload
        .email
        .as_ref()
        .is_some_and(|email| *email != existing.email);
    if payload.admin.is_some() && (!existing.verified || email_changes) {
        return Err(AppError::Conflict("Not verified".into()));
    }
    Ok(())
}

/// Applies `payload` to `existing` field by field, in order: name, email, password, admin.
///
/// An email change unverifies the user and issues a fresh token before the admin rule is
/// checked, so the same request cannot also elevate the role. A plan that changes nothing
/// is rejected as unprocessable.
pub fn plan_update(
    existing: &UserModel,
    payload: &UpdateUserRequest,
    issue_token: impl FnOnce() -> String,
) -> AppResult<UpdatePlan> {
    let mut changes: ActiveModel = existing.clone().into();
    let mut dirty = false;
    let mut verified = existing.verified;
    let mut email_changed = false;
    let mut role_changed = false;

    if let Some(name) = payload.name.as_ref().filter(|name| **name != existing.name) {
        changes.name = Set(name.clone());
        dirty = true;
    }

    if let Some(email) = payload.email.as_ref().filter(|email| **email != existing.email) {
        verified = false;
        changes.verified = Set(false);
        changes.verification_token = Set(Some(issue_token()));
        changes.email = Set(email.clone());
        email_changed = true;
        dirty = true;
    }

    if let Some(password) = payload
        .password
        .as_ref()
        .filter(|password| !password_matches(password, &existing.password_hash))
    {
        changes.password_hash = Set(hash_password(password)?);
        dirty = true;
    }

    if let Some(admin) = payload.admin {
        if !verified {
            return Err(AppError::Conflict("Not verified".into()));
        }
        let role = if admin { UserRole::Admin } else { UserRole::User };
        if role != existing.role {
            changes.role = Set(role);
            role_changed = true;
            dirty = true;
        }
    }

    if !dirty {
        return Err(AppError::Unprocessable(
            "A different value must be specified to update".into(),
        ));
    }

    changes.updated_at = Set(Utc::now().fixed_offset());
    Ok(UpdatePlan {
        changes,
        email_changed,
        role_changed,
    })
}

pub async fn list_users(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = active_users().order_by_asc(UserCol::CreatedAt);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<ApiResponse<User>> {
    let user = find_active_user(state.orm.as_ref(), id).await?;
    Ok(ApiResponse::success("User", User::from(user), None))
}

pub async fn create_user(
    state: &AppState,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let mut errors = validate_registration(&payload);
    if !errors.contains_key("email")
        && email_taken(state.orm.as_ref(), &payload.email, None).await?
    {
        push(&mut errors, "email", EMAIL_TAKEN);
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let now = Utc::now().fixed_offset();
    let user = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        email: Set(payload.email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(UserRole::User),
        verified: Set(false),
        verification_token: Set(Some(issue_unique_token(state.orm.as_ref()).await?)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(state.orm.as_ref())
    .await
    .map_err(map_unique_violation)?;

    tracing::info!(user_id = %user.id, "user registered");
    record_user_event(state.orm.as_ref(), user.id, "user_register").await;

    state
        .notifier
        .notify(NotificationKind::AccountCreated, &user)
        .await;

    Ok(ApiResponse::success(
        "User created",
        User::from(user),
        Some(Meta::empty()),
    ))
}

pub async fn update_user(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let user = find_active_user(state.orm.as_ref(), id).await?;
    ensure_self_or_admin(auth, user.id)?;
    ensure_role_change_allowed(&user, &payload)?;

    let mut errors = validate_update(&payload);
    if let Some(email) = payload.email.as_ref().filter(|email| **email != user.email) {
        if !errors.contains_key("email")
            && email_taken(state.orm.as_ref(), email, Some(user.id)).await?
        {
            push(&mut errors, "email", EMAIL_TAKEN);
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let fresh_token = if payload.email.as_ref().is_some_and(|email| *email != user.email) {
        Some(issue_unique_token(state.orm.as_ref()).await?)
    } else {
        None
    };
    let plan = plan_update(&user, &payload, || {
        fresh_token.unwrap_or_else(generate_verification_token)
    })?;
    if plan.role_changed {
        ensure_admin(auth)?;
    }

    let updated = plan
        .changes
        .update(state.orm.as_ref())
        .await
        .map_err(map_unique_violation)?;

    tracing::info!(
        user_id = %updated.id,
        email_changed = plan.email_changed,
        "user updated"
    );
    record_user_event(state.orm.as_ref(), updated.id, "user_update").await;

    if plan.email_changed {
        state
            .notifier
            .notify(NotificationKind::EmailChanged, &updated)
            .await;
    }

    Ok(ApiResponse::success(
        "Updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    let user = find_active_user(state.orm.as_ref(), id).await?;
    ensure_self_or_admin(auth, user.id)?;

    let now = Utc::now().fixed_offset();
    let mut active: ActiveModel = user.into();
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    let deleted = active.update(state.orm.as_ref()).await?;

    tracing::info!(user_id = %deleted.id, "user soft-deleted");
    record_user_event(state.orm.as_ref(), deleted.id, "user_delete").await;

    Ok(ApiResponse::success(
        "Deleted",
        User::from(deleted),
        Some(Meta::empty()),
    ))
}
