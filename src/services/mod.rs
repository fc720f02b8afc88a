pub mod auth_service;
pub mod category_service;
pub mod party_service;
pub mod product_service;
pub mod transaction_service;
pub mod user_service;
pub mod verification_service;
