use crate::{AppState, access, handlers};
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Public Router Module
///
/// `/health` and `/logout` are open to everybody. `/register` and `/login` are guest-only:
/// the `unauthenticated_user` guard sends an already signed-in caller to the dashboard.
pub fn public_routes(state: AppState) -> Router<AppState> {
    let guest_only = Router::new()
        // POST /register
        // Creates a login, puts it in the `customer` group and creates its Customer record.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Returns a bearer token for valid credentials.
        .route("/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(
            state,
            access::unauthenticated_user,
        ));

    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/logout", post(handlers::logout))
        .merge(guest_only)
}
