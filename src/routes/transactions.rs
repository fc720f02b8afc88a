use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::transactions::TransactionList,
    error::{AppResult, ErrorBody},
    middleware::auth::AuthUser,
    models::Transaction,
    response::ApiResponse,
    routes::{
        extract::{ApiPath, ApiQuery},
        params::Pagination,
    },
    services::transaction_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions))
        .route("/{id}", get(get_transaction))
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List transactions", body = ApiResponse<TransactionList>),
        (status = 401, description = "Unauthenticated", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<ApiResponse<TransactionList>>> {
    let resp = transaction_service::list_transactions(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Get transaction", body = ApiResponse<Transaction>),
        (status = 404, description = "Transaction not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Transaction>>> {
    let resp = transaction_service::get_transaction(&state, id).await?;
    Ok(Json(resp))
}
