use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{categories::CategoryList, users::PartyList},
    error::{AppResult, ErrorBody},
    models::Party,
    response::ApiResponse,
    routes::{
        extract::{ApiPath, ApiQuery},
        params::Pagination,
    },
    scopes::RoleView,
    services::party_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_buyers))
        .route("/{id}", get(get_buyer))
        .route("/{id}/categories", get(buyer_categories))
}

#[utoipa::path(
    get,
    path = "/api/buyers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Users with at least one purchase", body = ApiResponse<PartyList>)
    ),
    security(()),
    tag = "Buyers"
)]
pub async fn list_buyers(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PartyList>>> {
    let resp = party_service::list_parties(&state, RoleView::Buyer, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/buyers/{id}",
    params(("id" = Uuid, Path, description = "Buyer ID")),
    responses(
        (status = 200, description = "Get buyer", body = ApiResponse<Party>),
        (status = 404, description = "No such buyer", body = ErrorBody)
    ),
    security(()),
    tag = "Buyers"
)]
pub async fn get_buyer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Party>>> {
    let resp = party_service::get_party(&state, RoleView::Buyer, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/buyers/{id}/categories",
    params(("id" = Uuid, Path, description = "Buyer ID")),
    responses(
        (status = 200, description = "Distinct categories of purchased products", body = ApiResponse<CategoryList>),
        (status = 404, description = "No such buyer", body = ErrorBody)
    ),
    security(()),
    tag = "Buyers"
)]
pub async fn buyer_categories(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = party_service::buyer_categories(&state, id).await?;
    Ok(Json(resp))
}
