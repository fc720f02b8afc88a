//! Read-time views over the `users` table.
//!
//! Buyers and sellers are not stored separately: a seller is an active user owning at least one
//! product, a buyer is an active user that purchased at least once. Every query for a role goes
//! through [`RoleView::scope`], so the predicate cannot be forgotten at a call site.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Select, sea_query::Query,
};
use uuid::Uuid;

use crate::{
    entity::{
        Products, Transactions, Users, products::Column as ProductCol,
        transactions::Column as TxCol, users::Column as UserCol, users::Model as UserModel,
    },
    error::{AppError, AppResult},
};

/// Users that are not soft-deleted.
pub fn active_users() -> Select<Users> {
    Users::find().filter(UserCol::DeletedAt.is_null())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleView {
    Buyer,
    Seller,
}

impl RoleView {
    pub fn scope(self) -> Select<Users> {
        let owners = match self {
            RoleView::Buyer => Query::select()
                .column(TxCol::BuyerId)
                .from(Transactions)
                .to_owned(),
            RoleView::Seller => Query::select()
                .column(ProductCol::SellerId)
                .from(Products)
                .to_owned(),
        };
        active_users().filter(UserCol::Id.in_subquery(owners))
    }

    pub fn label(self) -> &'static str {
        match self {
            RoleView::Buyer => "buyer",
            RoleView::Seller => "seller",
        }
    }
}

/// Explicit lookup-or-404 for `{id}` path segments.
pub async fn find_active_user<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<UserModel> {
    active_users()
        .filter(UserCol::Id.eq(id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn find_in_view<C: ConnectionTrait>(
    db: &C,
    view: RoleView,
    id: Uuid,
) -> AppResult<UserModel> {
    view.scope()
        .filter(UserCol::Id.eq(id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;

    #[test]
    fn active_users_excludes_soft_deleted() {
        let sql = active_users().build(DbBackend::Postgres).to_string();
        assert!(sql.contains(r#""users"."deleted_at" IS NULL"#), "{sql}");
    }

    #[test]
    fn seller_scope_requires_owned_products() {
        let sql = RoleView::Seller.scope().build(DbBackend::Postgres).to_string();
        assert!(sql.contains(r#""deleted_at" IS NULL"#), "{sql}");
        assert!(
            sql.contains(r#"IN (SELECT "seller_id" FROM "products")"#),
            "{sql}"
        );
    }

    #[test]
    fn buyer_scope_requires_transactions() {
        let sql = RoleView::Buyer.scope().build(DbBackend::Postgres).to_string();
        assert!(
            sql.contains(r#"IN (SELECT "buyer_id" FROM "transactions")"#),
            "{sql}"
        );
    }
}
