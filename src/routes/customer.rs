use crate::{AppState, access, handlers};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    routing::{get, post},
};

/// Customer Router Module
///
/// Pages a customer uses to follow its own orders and maintain its account.
/// Every route requires a signed-in caller whose first group is `customer`; the customer
/// record is always derived from the caller's identity.
pub fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // GET /user
        // The caller's orders with total/delivered/pending counters.
        .route("/user", get(handlers::user_page))
        // GET/POST /account
        // Read or partially update the caller's customer record.
        .route(
            "/account",
            get(handlers::account_settings).post(handlers::update_account_settings),
        )
        // POST /account/profile-pic
        // Presigned upload URL for a new profile picture.
        .route(
            "/account/profile-pic",
            post(handlers::get_profile_picture_upload_url),
        )
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            access::users_allowed(access::CUSTOMER_ONLY, request, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, access::login_required))
}
