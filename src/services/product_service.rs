use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Select,
    sea_query::{Expr, Query, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    dto::products::ProductList,
    entity::{
        CategoryProduct, Products,
        category_product::Column as PivotCol,
        products::{Column, ProductStatus},
    },
    error::{AppError, AppResult},
    models::Product,
    response::ApiResponse,
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

fn catalog_filter(query: &ProductQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if query.available_only.unwrap_or(false) {
        condition = condition.add(Column::Status.eq(ProductStatus::Available));
    }
    if let Some(seller_id) = query.seller_id {
        condition = condition.add(Column::SellerId.eq(seller_id));
    }
    if let Some(category_id) = query.category_id {
        let tagged = Query::select()
            .column(PivotCol::ProductId)
            .from(CategoryProduct)
            .and_where(PivotCol::CategoryId.eq(category_id))
            .to_owned();
        condition = condition.add(Column::Id.in_subquery(tagged));
    }

    condition
}

/// Newest first unless asked otherwise.
fn catalog_query(query: &ProductQuery) -> Select<Products> {
    let column = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Quantity => Column::Quantity,
        ProductSortBy::Name => Column::Name,
    };
    let finder = Products::find().filter(catalog_filter(query));
    match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(column),
        SortOrder::Desc => finder.order_by_desc(column),
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let finder = catalog_query(&query);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::paged(
        "Products",
        ProductList { items },
        page,
        limit,
        total,
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", Product::from(product), None))
}
