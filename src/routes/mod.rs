use axum::{Router, http::Uri, response::IntoResponse, routing::get};

use crate::{error::AppError, state::AppState};

pub mod auth;
pub mod buyers;
pub mod categories;
pub mod doc;
pub mod extract;
pub mod health;
pub mod params;
pub mod products;
pub mod sellers;
pub mod transactions;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/oauth", auth::router())
        .nest("/buyers", buyers::router())
        .nest("/categories", categories::router())
        .nest("/products", products::router())
        .nest("/sellers", sellers::router())
        .nest("/transactions", transactions::router())
        .nest("/users", users::router())
}

/// Every route the service answers, without the HTTP middleware stack.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "no route");
    AppError::NotFound
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::{RecordingMailer, state_with};

    fn app() -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        create_app(state_with(db, RecordingMailer::default()))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_uses_error_envelope() {
        let response = app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], 404);
        assert_eq!(json["error"]["message"], "Not Found");
    }

    #[tokio::test]
    async fn user_listing_requires_bearer_token() {
        let response = app()
            .oneshot(Request::get("/api/users").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_requires_client_token() {
        let response = app()
            .oneshot(
                Request::post("/api/users")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name":"A","email":"a@x.com","password":"secret1","password_confirmation":"secret1"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn incomplete_body_uses_error_envelope() {
        let response = app()
            .oneshot(
                Request::post("/api/categories")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Kitchen"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], 422);
        assert!(
            json["error"]["message"]
                .as_str()
                .unwrap()
                .contains("description")
        );
    }

    #[tokio::test]
    async fn malformed_id_uses_error_envelope() {
        let response = app()
            .oneshot(
                Request::get("/api/categories/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], 404);
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "ok");
    }
}
