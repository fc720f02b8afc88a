use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    dto::transactions::TransactionList,
    entity::{Transactions, transactions::Column as TxCol},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Transaction,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_transactions(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<TransactionList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Transactions::find().order_by_desc(TxCol::CreatedAt);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Transaction::from)
        .collect();

    tracing::debug!(user_id = %user.user_id, total, "transactions listed");
    Ok(ApiResponse::success(
        "Transactions",
        TransactionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_transaction(
    state: &AppState,
    id: Uuid,
) -> AppResult<ApiResponse<Transaction>> {
    let transaction = Transactions::find()
        .filter(TxCol::Id.eq(id))
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Transaction",
        Transaction::from(transaction),
        None,
    ))
}
