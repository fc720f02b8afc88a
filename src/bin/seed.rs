use chrono::Utc;
use marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Categories, Users,
        categories::{ActiveModel as CategoryActive, Column as CategoryCol},
        category_product::ActiveModel as CategoryProductActive,
        products::{ActiveModel as ProductActive, ProductStatus},
        transactions::ActiveModel as TransactionActive,
        users::{ActiveModel as UserActive, Column as UserCol, UserRole},
    },
    services::{user_service::hash_password, verification_service::generate_verification_token},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(
        &orm,
        "Admin",
        "admin@example.com",
        "admin123",
        UserRole::Admin,
        true,
    )
    .await?;
    let seller_id = ensure_user(
        &orm,
        "Sam Seller",
        "seller@example.com",
        "seller123",
        UserRole::User,
        true,
    )
    .await?;
    let buyer_id = ensure_user(
        &orm,
        "Bea Buyer",
        "buyer@example.com",
        "buyer123",
        UserRole::User,
        true,
    )
    .await?;
    ensure_user(
        &orm,
        "Una Verified",
        "pending@example.com",
        "pending123",
        UserRole::User,
        false,
    )
    .await?;

    let apparel = ensure_category(&orm, "Apparel", "Things to wear").await?;
    let kitchen = ensure_category(&orm, "Kitchen", "Mugs and more").await?;
    let books = ensure_category(&orm, "Books", "Printed and digital reading").await?;

    let catalog = [
        ("Ferris Hoodie", "Warm hoodie for Rustaceans", 50, vec![apparel]),
        ("Ferris Mug", "Coffee tastes better with Ferris", 100, vec![kitchen]),
        ("Async Rust", "Learn async Rust patterns", 75, vec![books]),
        ("Crab Apron", "Cook like a crab", 0, vec![apparel, kitchen]),
    ];

    let mut product_ids = Vec::new();
    for (name, description, quantity, categories) in catalog {
        let product_id = seed_product(&orm, seller_id, name, description, quantity).await?;
        for category_id in categories {
            CategoryProductActive {
                category_id: Set(category_id),
                product_id: Set(product_id),
            }
            .insert(orm.as_ref())
            .await?;
        }
        product_ids.push(product_id);
    }
    println!("Seeded {} products for seller {seller_id}", product_ids.len());

    for (product_id, quantity) in product_ids.iter().take(2).zip([2, 1]) {
        TransactionActive {
            id: Set(Uuid::new_v4()),
            quantity: Set(quantity),
            buyer_id: Set(buyer_id),
            product_id: Set(*product_id),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(orm.as_ref())
        .await?;
    }
    println!("Seeded transactions for buyer {buyer_id}");

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
    verified: bool,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let now = Utc::now().fixed_offset();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        verified: Set(verified),
        verification_token: Set((!verified).then(generate_verification_token)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={})", user.role.as_str());
    Ok(user.id)
}

async fn ensure_category(
    orm: &DatabaseConnection,
    name: &str,
    description: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Categories::find()
        .filter(CategoryCol::Name.eq(name))
        .one(orm)
        .await?
    {
        return Ok(existing.id);
    }

    let now = Utc::now().fixed_offset();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;
    Ok(category.id)
}

async fn seed_product(
    orm: &DatabaseConnection,
    seller_id: Uuid,
    name: &str,
    description: &str,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let status = if quantity > 0 {
        ProductStatus::Available
    } else {
        ProductStatus::Unavailable
    };
    let now = Utc::now().fixed_offset();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        quantity: Set(quantity),
        status: Set(status),
        image: Set(None),
        seller_id: Set(seller_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(orm)
    .await?;
    Ok(product.id)
}
