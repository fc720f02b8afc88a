use std::sync::Arc;

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection};

/// Shared handle; `DatabaseConnection` itself is not `Clone` once the mock backend is compiled in.
pub type OrmConn = Arc<DatabaseConnection>;

/// Create a SeaORM connection.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let conn = Database::connect(database_url).await?;
    Ok(Arc::new(conn))
}

/// Apply the SQL files in `migrations/` through the connection's underlying Postgres pool.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let pool = conn.get_postgres_connection_pool();
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
