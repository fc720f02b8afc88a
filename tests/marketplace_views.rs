use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use marketplace_api::{
    config::DispatchMode,
    db::{create_orm_conn, run_migrations},
    entity::{
        categories::ActiveModel as CategoryActive,
        category_product::ActiveModel as CategoryProductActive,
        products::{ActiveModel as ProductActive, ProductStatus},
        transactions::ActiveModel as TransactionActive,
        users::{ActiveModel as UserActive, UserRole},
    },
    error::AppError,
    middleware::auth::AuthUser,
    notifications::{LogMailer, Notifier, RetryPolicy},
    routes::params::{Pagination, ProductQuery},
    scopes::RoleView,
    services::{party_service, product_service, user_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Buyer and seller views are derived from products and transactions.
#[tokio::test]
async fn buyer_and_seller_views_follow_activity() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run marketplace view tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let seller = insert_user(&state, "Sam", "sam@example.com").await?;
    let buyer = insert_user(&state, "Bea", "bea@example.com").await?;
    let idle = insert_user(&state, "Ida", "ida@example.com").await?;

    let c1 = insert_category(&state, "C1").await?;
    let c2 = insert_category(&state, "C2").await?;
    let c3 = insert_category(&state, "C3").await?;

    let p1 = insert_product(&state, seller, "Mug", 5, &[c1, c2]).await?;
    let p2 = insert_product(&state, seller, "Apron", 0, &[c2, c3]).await?;

    insert_transaction(&state, buyer, p1).await?;
    insert_transaction(&state, buyer, p2).await?;

    // Every category appears once even though C2 is on both purchases
    let categories = party_service::buyer_categories(&state, buyer)
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(categories.len(), 3);
    let ids: BTreeSet<Uuid> = categories.iter().map(|c| c.id).collect();
    assert_eq!(ids, BTreeSet::from([c1, c2, c3]));

    // Role views
    let sellers = party_service::list_parties(&state, RoleView::Seller, Pagination::default())
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(sellers.iter().map(|p| p.id).collect::<Vec<_>>(), vec![seller]);

    let buyers = party_service::list_parties(&state, RoleView::Buyer, Pagination::default())
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(buyers.iter().map(|p| p.id).collect::<Vec<_>>(), vec![buyer]);

    assert!(matches!(
        party_service::get_party(&state, RoleView::Seller, idle).await,
        Err(AppError::NotFound)
    ));
    assert!(matches!(
        party_service::buyer_categories(&state, seller).await,
        Err(AppError::NotFound)
    ));

    // Product listing filters
    let available = product_service::list_products(
        &state,
        ProductQuery {
            available_only: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(available.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p1]);

    let searched = product_service::list_products(
        &state,
        ProductQuery {
            q: Some("apr".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap()
    .items;
    assert_eq!(searched.iter().map(|p| p.id).collect::<Vec<_>>(), vec![p2]);

    // A soft-deleted buyer drops out of the buyer view
    let auth = AuthUser {
        user_id: buyer,
        role: UserRole::User,
    };
    user_service::delete_user(&state, &auth, buyer).await?;
    assert!(matches!(
        party_service::get_party(&state, RoleView::Buyer, buyer).await,
        Err(AppError::NotFound)
    ));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE audit_logs, transactions, category_product, products, categories, users CASCADE",
    ))
    .await?;

    let notifier = Notifier::new(
        Arc::new(LogMailer),
        RetryPolicy::default(),
        DispatchMode::Inline,
        "http://shop.test",
    );
    Ok(AppState { orm, notifier })
}

async fn insert_user(state: &AppState, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(UserRole::User),
        verified: Set(true),
        verification_token: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(state.orm.as_ref())
    .await?;

    Ok(user.id)
}

async fn insert_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("{name} things")),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.orm.as_ref())
    .await?;

    Ok(category.id)
}

async fn insert_product(
    state: &AppState,
    seller_id: Uuid,
    name: &str,
    quantity: i32,
    categories: &[Uuid],
) -> anyhow::Result<Uuid> {
    let now = Utc::now().fixed_offset();
    let status = if quantity > 0 {
        ProductStatus::Available
    } else {
        ProductStatus::Unavailable
    };
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("A {name}")),
        quantity: Set(quantity),
        status: Set(status),
        image: Set(None),
        seller_id: Set(seller_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(state.orm.as_ref())
    .await?;

    for category_id in categories {
        CategoryProductActive {
            category_id: Set(*category_id),
            product_id: Set(product.id),
        }
        .insert(state.orm.as_ref())
        .await?;
    }

    Ok(product.id)
}

async fn insert_transaction(
    state: &AppState,
    buyer_id: Uuid,
    product_id: Uuid,
) -> anyhow::Result<()> {
    TransactionActive {
        id: Set(Uuid::new_v4()),
        quantity: Set(1),
        buyer_id: Set(buyer_id),
        product_id: Set(product_id),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(state.orm.as_ref())
    .await?;

    Ok(())
}
