use axum::{
    extract::Request,
    middleware,
    routing::{get, patch, post},
    Router,
};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::geocode::GeocodeClient;
use crate::handlers::{
    delegate_handlers::{
        attach_delegate, delegate_profile, leave_delegate_event, register_delegate,
        remove_delegate, remove_volunteer,
    },
    event_handlers::{announce, get_event_detail, list_events, upsert_event},
    geocode_handlers::geocode,
    join_handlers::{join_delegate_group, join_event, join_task, leave_task},
    task_handlers::{assign_delegate, create_task, list_tasks, unassign_delegate, update_task},
    volunteer_handlers::{leave_group, volunteer_profile},
};
use gather_shared::auth::auth_middleware;
use gather_shared::config::route_prefix;
use gather_shared::models::ErrorBody;
use gather_shared::store::{dynamo::DynamoStore, MembershipStore};

/// Creates a router backed by DynamoDB and the configured geocoder
pub async fn create_router() -> Router {
    info!("Creating router with DynamoDB store");

    let dynamo_store = Arc::new(DynamoStore::new().await);
    let prefix = route_prefix();
    info!("Using API route prefix: {}", prefix);

    create_router_with_parts(dynamo_store, Arc::new(GeocodeClient::from_env()), prefix)
}

/// Creates a router with a given store and geocoder
pub fn create_router_with_parts<S>(
    store: Arc<S>,
    geocoder: Arc<GeocodeClient>,
    prefix: &str,
) -> Router
where
    S: MembershipStore + 'static,
{
    info!("Setting up API routes with prefix: '{}'", prefix);

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

    let event_routes = Router::new()
        .route("/event", patch(upsert_event::<S>))
        .route("/event/join/:code", post(join_event::<S>))
        .route("/events", get(list_events::<S>))
        .route("/events/:id", get(get_event_detail::<S>))
        .route("/events/:id/announce", post(announce::<S>))
        .route(
            "/events/:id/tasks",
            get(list_tasks::<S>).post(create_task::<S>),
        )
        .route("/events/:id/tasks/:task_id", patch(update_task::<S>))
        .route(
            "/events/:id/tasks/:task_id/assign",
            patch(assign_delegate::<S>),
        )
        .route(
            "/events/:id/tasks/:task_id/unassign",
            patch(unassign_delegate::<S>),
        )
        .route("/tasks/join/:code", post(join_task::<S>))
        .route("/tasks/leave", post(leave_task::<S>))
        .route("/delegate/register", post(register_delegate::<S>))
        .route("/delegate/profile", get(delegate_profile::<S>))
        .route("/delegate/join/:code", post(join_delegate_group::<S>))
        .route(
            "/delegate/attach/:event_ref/:code",
            post(attach_delegate::<S>),
        )
        .route("/delegate/leave", post(leave_delegate_event::<S>))
        .route("/delegate/remove/:event_id", post(remove_delegate::<S>))
        .route("/delegate/volunteer/remove", post(remove_volunteer::<S>))
        .route("/volunteer/profile", get(volunteer_profile::<S>))
        .route("/volunteer/leave", post(leave_group::<S>))
        .layer(middleware::from_fn(auth_middleware))
        .with_state(store);

    let geocode_routes = Router::new()
        .route("/geocode", get(geocode))
        .layer(middleware::from_fn(auth_middleware))
        .with_state(geocoder);

    let api_routes = event_routes.merge(geocode_routes);

    let router = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(prefix, api_routes)
    };
    let router = router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(logging_middleware));

    info!(
        "Router configured with all routes and middleware under prefix: '{}'",
        prefix
    );

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
