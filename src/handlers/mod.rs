pub mod protected;
pub mod public;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{authenticate, optional_authenticate};
use crate::state::AppState;

/// Build the full application router. Protected routes sit behind the auth
/// middleware; the banner route runs the optional-auth variant.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route("/api/auth/refresh", post(protected::auth::refresh))
        .route(
            "/api/data/:entity",
            get(protected::data::entity::list).post(protected::data::entity::create),
        )
        .route(
            "/api/data/:entity/:id",
            get(protected::data::record::get)
                .patch(protected::data::record::patch)
                .delete(protected::data::record::delete),
        )
        .route("/api/find/:entity", post(protected::find::find_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let banner = Router::new()
        .route("/", get(public::root))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_authenticate,
        ));

    Router::new()
        .merge(banner)
        .route("/health", get(public::health))
        .route("/auth/login", post(public::auth::login))
        .route("/auth/register", post(public::auth::register))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
