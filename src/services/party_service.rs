use std::collections::HashSet;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::{categories::CategoryList, users::PartyList},
    entity::{
        Categories, Products, Transactions, categories::Model as CategoryModel,
        products::Column as ProductCol, transactions::Column as TxCol, users::Column as UserCol,
    },
    error::AppResult,
    models::{Category, Party},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    scopes::{RoleView, find_in_view},
    state::AppState,
};

pub async fn list_parties(
    state: &AppState,
    view: RoleView,
    pagination: Pagination,
) -> AppResult<ApiResponse<PartyList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = view.scope().order_by_asc(UserCol::CreatedAt);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Party::from)
        .collect();

    let message = match view {
        RoleView::Buyer => "Buyers",
        RoleView::Seller => "Sellers",
    };
    Ok(ApiResponse::success(
        message,
        PartyList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_party(
    state: &AppState,
    view: RoleView,
    id: Uuid,
) -> AppResult<ApiResponse<Party>> {
    let user = find_in_view(state.orm.as_ref(), view, id).await?;
    Ok(ApiResponse::success(view.label(), Party::from(user), None))
}

/// Flattens per-product category lists, keeping one entry per category id.
pub fn unique_categories<I>(groups: I) -> Vec<CategoryModel>
where
    I: IntoIterator<Item = Vec<CategoryModel>>,
{
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .flatten()
        .filter(|category| seen.insert(category.id))
        .collect()
}

/// Every category of every product the buyer ever purchased.
pub async fn purchased_categories<C: ConnectionTrait>(
    db: &C,
    buyer_id: Uuid,
) -> AppResult<Vec<CategoryModel>> {
    let product_ids: Vec<Uuid> = Transactions::find()
        .filter(TxCol::BuyerId.eq(buyer_id))
        .all(db)
        .await?
        .into_iter()
        .map(|tx| tx.product_id)
        .collect();

    if product_ids.is_empty() {
        return Ok(Vec::new());
    }

    let groups = Products::find()
        .filter(ProductCol::Id.is_in(product_ids))
        .find_with_related(Categories)
        .all(db)
        .await?;

    Ok(unique_categories(
        groups.into_iter().map(|(_product, categories)| categories),
    ))
}

pub async fn buyer_categories(
    state: &AppState,
    buyer_id: Uuid,
) -> AppResult<ApiResponse<CategoryList>> {
    let buyer = find_in_view(state.orm.as_ref(), RoleView::Buyer, buyer_id).await?;
    let items: Vec<Category> = purchased_categories(state.orm.as_ref(), buyer.id)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(ApiResponse::success(
        "Buyer categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    use super::*;
    use crate::{
        entity::transactions::Model as TransactionModel,
        test_support::{RecordingMailer, state_with, user_model},
    };

    fn category(id: Uuid, name: &str) -> CategoryModel {
        let now = Utc::now().fixed_offset();
        CategoryModel {
            id,
            name: name.to_string(),
            description: format!("{name} things"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn overlapping_product_categories_collapse_to_distinct_set() {
        let (c1, c2, c3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let groups = vec![
            vec![category(c1, "C1"), category(c2, "C2")],
            vec![category(c2, "C2"), category(c3, "C3")],
        ];

        let ids: HashSet<Uuid> = unique_categories(groups).iter().map(|c| c.id).collect();

        assert_eq!(ids, HashSet::from([c1, c2, c3]));
    }

    #[test]
    fn each_category_appears_once() {
        let c1 = Uuid::new_v4();
        let groups = vec![vec![category(c1, "C1")], vec![category(c1, "C1")], vec![]];

        assert_eq!(unique_categories(groups).len(), 1);
    }

    #[test]
    fn no_purchases_means_no_categories() {
        assert!(unique_categories(Vec::<Vec<CategoryModel>>::new()).is_empty());
    }

    #[test]
    fn product_categories_join_through_pivot() {
        let sql = Products::find()
            .find_with_related(Categories)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"JOIN "category_product""#), "{sql}");
        assert!(sql.contains(r#"JOIN "categories""#), "{sql}");
    }

    #[tokio::test]
    async fn buyer_without_purchases_lists_nothing() {
        let buyer = user_model("Bea", "bea@example.com", None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![buyer.clone()]])
            .append_query_results([Vec::<TransactionModel>::new()])
            .into_connection();
        let state = state_with(db, RecordingMailer::default());

        let resp = buyer_categories(&state, buyer.id).await.unwrap();

        assert!(resp.data.unwrap().items.is_empty());
        assert_eq!(resp.meta, Some(Meta::empty()));
    }
}
