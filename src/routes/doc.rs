use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{GrantType, TokenRequest, TokenResponse},
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        products::ProductList,
        transactions::TransactionList,
        users::{CreateUserRequest, MessageData, PartyList, UpdateUserRequest, UserList},
    },
    entity::{products::ProductStatus, users::UserRole},
    error::{ErrorBody, ErrorDetail},
    models::{Category, Party, Product, Transaction, User},
    response::{ApiResponse, Meta},
    routes::{
        auth, buyers, categories, health, params, products, sellers, transactions, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::token,
        users::list_users,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::verify,
        users::resend,
        buyers::list_buyers,
        buyers::get_buyer,
        buyers::buyer_categories,
        sellers::list_sellers,
        sellers::get_seller,
        categories::list_categories,
        categories::create_category,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        transactions::list_transactions,
        transactions::get_transaction
    ),
    components(
        schemas(
            User,
            UserRole,
            Party,
            Category,
            Product,
            ProductStatus,
            Transaction,
            GrantType,
            TokenRequest,
            TokenResponse,
            CreateUserRequest,
            UpdateUserRequest,
            CreateCategoryRequest,
            UpdateCategoryRequest,
            MessageData,
            UserList,
            PartyList,
            CategoryList,
            ProductList,
            TransactionList,
            ErrorBody,
            ErrorDetail,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<UserList>,
            ApiResponse<Party>,
            ApiResponse<PartyList>,
            ApiResponse<Category>,
            ApiResponse<CategoryList>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Transaction>,
            ApiResponse<TransactionList>,
            ApiResponse<MessageData>,
            ApiResponse<TokenResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Access token issuance"),
        (name = "Users", description = "Registration, verification and account management"),
        (name = "Buyers", description = "Users seen through their purchases"),
        (name = "Sellers", description = "Users seen through their products"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Products", description = "Product endpoints"),
        (name = "Transactions", description = "Transaction endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_verification_routes() {
        let spec = ApiDoc::openapi();

        assert!(spec.paths.paths.contains_key("/api/users/verify/{token}"));
        assert!(spec.paths.paths.contains_key("/api/users/{id}/resend"));
        assert!(spec.paths.paths.contains_key("/api/buyers/{id}/categories"));
    }
}
