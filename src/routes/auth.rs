use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::auth::{TokenRequest, TokenResponse},
    error::{AppResult, ErrorBody},
    response::ApiResponse,
    routes::extract::ApiJson,
    services::auth_service::issue_token,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/token", post(token))
}

#[utoipa::path(
    post,
    path = "/api/oauth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Access token", body = ApiResponse<TokenResponse>),
        (status = 400, description = "Missing grant fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    security(()),
    tag = "Auth"
)]
pub async fn token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let resp = issue_token(&state, payload).await?;
    Ok(Json(resp))
}
