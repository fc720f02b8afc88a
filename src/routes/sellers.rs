use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::users::PartyList,
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
        .route("/", get(list_sellers))
        .route("/{id}", get(get_seller))
}

#[utoipa::path(
    get,
    path = "/api/sellers",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Users owning at least one product", body = ApiResponse<PartyList>)
    ),
    security(()),
    tag = "Sellers"
)]
pub async fn list_sellers(
    State(state): State<AppState>,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<ApiResponse<PartyList>>> {
    let resp = party_service::list_parties(&state, RoleView::Seller, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/sellers/{id}",
    params(("id" = Uuid, Path, description = "Seller ID")),
    responses(
        (status = 200, description = "Get seller", body = ApiResponse<Party>),
        (status = 404, description = "No such seller", body = ErrorBody)
    ),
    security(()),
    tag = "Sellers"
)]
pub async fn get_seller(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Party>>> {
    let resp = party_service::get_party(&state, RoleView::Seller, id).await?;
    Ok(Json(resp))
}
