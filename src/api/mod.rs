mod handlers;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::backlog::Backlog;

pub fn create_router(backlog: Backlog) -> Router {
    create_router_with_cors(backlog, None)
}

/// Build the router, restricting CORS to `cors_origins` when given.
pub fn create_router_with_cors(backlog: Backlog, cors_origins: Option<&[String]>) -> Router {
    let api = Router::new()
        // Projects
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/{id}/records", get(handlers::list_project_records))
        .route("/projects/{id}/hierarchy", get(handlers::get_hierarchy_tree))
        .route("/projects/{id}/epics", post(handlers::create_epic))
        .route("/projects/{id}/features", post(handlers::create_feature))
        .route("/projects/{id}/user-stories", post(handlers::create_user_story))
        .route("/projects/{id}/items", post(handlers::create_item))
        // Records (by type name and id)
        .route(
            "/records/{type}/{id}",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route(
            "/records/{type}/{id}/parent",
            get(handlers::get_parent).put(handlers::set_parent),
        )
        .route("/records/{type}/{id}/children", get(handlers::list_children))
        // Registered hierarchy types
        .route("/types", get(handlers::list_types))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(backlog)
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
