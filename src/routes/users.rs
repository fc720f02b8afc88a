use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::users::{CreateUserRequest, MessageData, UpdateUserRequest, UserList},
    error::{AppResult, ErrorBody},
    middleware::auth::{AuthUser, ClientAuth},
    models::User,
    response::ApiResponse,
    routes::{
        extract::{ApiJson, ApiPath, ApiQuery},
        params::Pagination,
    },
    services::{user_service, verification_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/verify/{token}", get(verify))
        .route(
            "/{id}",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/{id}/resend", post(resend))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List users", body = ApiResponse<UserList>),
        (status = 401, description = "Unauthenticated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = user_service::list_users(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<User>),
        (status = 422, description = "Invalid input", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    _client: ClientAuth,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = user_service::create_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Get user", body = ApiResponse<User>),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_user(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<User>),
        (status = 409, description = "Admin role requires a verified account", body = ErrorBody),
        (status = 422, description = "Invalid input or nothing to change", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Soft-deleted user", body = ApiResponse<User>),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::delete_user(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/verify/{token}",
    params(("token" = String, Path, description = "Verification token from the email")),
    responses(
        (status = 200, description = "Account verified", body = ApiResponse<MessageData>),
        (status = 404, description = "Unknown or already used token", body = ErrorBody)
    ),
    security(()),
    tag = "Users"
)]
pub async fn verify(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = verification_service::verify(&state, &token).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/resend",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Verification email resent", body = ApiResponse<MessageData>),
        (status = 409, description = "User already verified", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn resend(
    State(state): State<AppState>,
    _client: ClientAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<MessageData>>> {
    let resp = verification_service::resend(&state, id).await?;
    Ok(Json(resp))
}
