use crate::{AppState, access, handlers};
use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    routing::{get, post},
};

/// Admin Router Module
///
/// The dashboard and every management page. Two guard stacks:
/// - `/` uses `only_admin`, which sends customers to their own page instead of refusing them.
/// - everything else uses `users_allowed(["admin"])`.
///
/// Both sit inside `login_required`, so anonymous callers are sent to the login page first.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    let dashboard = Router::new()
        // GET /
        // Every order and customer with aggregate counters.
        .route("/", get(handlers::home))
        .route_layer(middleware::from_fn(access::only_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            access::login_required,
        ));

    let management = Router::new()
        // GET /products
        .route("/products", get(handlers::products))
        // GET /customers/{id}?status=&product=&start_date=&end_date=&note=
        // Customer detail; `order_count` ignores the filter.
        .route("/customers/{id}", get(handlers::customer_detail))
        // POST /customers/{id}/orders
        // Inline order set of up to five lines.
        .route("/customers/{id}/orders", post(handlers::create_orders))
        // GET/PUT/DELETE /orders/{id}
        .route(
            "/orders/{id}",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        // GET /orders/{id}/delete
        // Delete confirmation payload; the deletion itself is DELETE /orders/{id}.
        .route("/orders/{id}/delete", get(handlers::confirm_delete_order))
        .route_layer(middleware::from_fn(|request: Request, next: Next| {
            access::users_allowed(access::ADMIN_ONLY, request, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, access::login_required));

    dashboard.merge(management)
}
