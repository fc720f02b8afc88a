pub mod audit_logs;
pub mod categories;
pub mod category_product;
pub mod products;
pub mod transactions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use category_product::Entity as CategoryProduct;
pub use products::Entity as Products;
pub use transactions::Entity as Transactions;
pub use users::Entity as Users;
