use axum::{extract::Request, middleware, routing::post, Router};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::account_handlers::{
    login_for_access_token, request_reset, reset_password, signup,
};
use gather_shared::config::route_prefix;
use gather_shared::mailer::Mailer;
use gather_shared::models::ErrorBody;
use gather_shared::store::{dynamo::DynamoStore, UserStore};

/// Shared handler state: the user store and the outbound mailer
pub struct AccountState<S> {
    pub store: Arc<S>,
    pub mailer: Arc<Mailer>,
}

impl<S> Clone for AccountState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mailer: self.mailer.clone(),
        }
    }
}

/// Creates a router backed by DynamoDB and the configured mail provider
pub async fn create_router() -> Router {
    info!("Creating account router with DynamoDB store");

    let dynamo_store = Arc::new(DynamoStore::new().await);
    let prefix = route_prefix();
    info!("Using API route prefix: {}", prefix);

    create_router_with_store(dynamo_store, Arc::new(Mailer::from_env()), prefix)
}

pub fn create_router_with_store<S>(store: Arc<S>, mailer: Arc<Mailer>, prefix: &str) -> Router
where
    S: UserStore + 'static,
{
    info!("Setting up account routes with prefix: '{}'", prefix);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        next.run(req).await
    }

    // No auth layer: these routes are how a caller gets a token
    let account_routes = Router::new()
        .route("/signup", post(signup::<S>))
        .route("/token", post(login_for_access_token::<S>))
        .route("/request-reset", post(request_reset::<S>))
        .route("/reset", post(reset_password::<S>))
        .with_state(AccountState { store, mailer });

    let router = if prefix.is_empty() {
        account_routes
    } else {
        Router::new().nest(prefix, account_routes)
    };
    let router = router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware));

    router.fallback(|req: Request| async move {
        warn!("No route matched for: {} {}", req.method(), req.uri());
        (
            axum::http::StatusCode::NOT_FOUND,
            axum::Json(ErrorBody {
                detail: "The requested resource was not found".to_string(),
                code: Some("not_found".to_string()),
            }),
        )
    })
}
