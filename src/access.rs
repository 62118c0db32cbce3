//! Access control for route handlers.
//!
//! Each guard exists twice: as a pure decision over the caller's identity (`check_*`), and as
//! axum middleware named after the guard that turns the decision into a response. Routers
//! stack them with `route_layer`, `login_required` outermost:
//!
//! ```ignore
//! Router::new()
//!     .route("/products", get(handlers::products))
//!     .route_layer(middleware::from_fn(|req: Request, next: Next| {
//!         access::users_allowed(access::ADMIN_ONLY, req, next)
//!     }))
//!     .route_layer(middleware::from_fn_with_state(state, access::login_required))
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, auth::AuthUser};

pub const ADMIN: &str = "admin";
pub const CUSTOMER: &str = "customer";

pub const ADMIN_ONLY: &[&str] = &[ADMIN];
pub const CUSTOMER_ONLY: &[&str] = &[CUSTOMER];

pub const HOME_URL: &str = "/";
pub const LOGIN_URL: &str = "/login";
pub const USER_PAGE_URL: &str = "/user";

pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to view this page";

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Send the caller elsewhere (`302 Found`).
    Redirect(String),
    /// Answer with the unauthorized page.
    Denied,
}

impl Access {
    /// The response replacing the handler, or `None` when access is granted.
    pub fn into_rejection(self) -> Option<Response> {
        match self {
            Access::Granted => None,
            Access::Redirect(location) => Some(found(&location)),
            Access::Denied => Some(unauthorized()),
        }
    }
}

/// `302 Found` pointing at `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HOME_URL)]).into_response(),
    }
}

pub fn unauthorized() -> Response {
    (StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE).into_response()
}

/// Login page URL that returns to `next` after signing in.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_URL}?next={encoded}")
}

// --- Decisions ---

/// Pages for guests only (login, register): a signed-in caller goes home.
pub fn check_unauthenticated(user: Option<&AuthUser>) -> Access {
    match user {
        Some(_) => Access::Redirect(HOME_URL.to_string()),
        None => Access::Granted,
    }
}

/// Anonymous callers are sent to the login page, remembering where they were going.
pub fn check_login(user: Option<&AuthUser>, next: &str) -> Access {
    match user {
        Some(_) => Access::Granted,
        None => Access::Redirect(login_url(next)),
    }
}

/// The caller's first group must be one of `roles`.
pub fn check_users_allowed(user: &AuthUser, roles: &[&str]) -> Access {
    match user.group() {
        Some(group) if roles.contains(&group) => Access::Granted,
        _ => Access::Denied,
    }
}

/// Admin landing page: admins proceed, customers are sent to their own page,
/// everybody else is unauthorized.
pub fn check_only_admin(user: &AuthUser) -> Access {
    match user.group() {
        Some(ADMIN) => Access::Granted,
        Some(CUSTOMER) => Access::Redirect(USER_PAGE_URL.to_string()),
        _ => Access::Denied,
    }
}

// --- Middleware ---

async fn resolve_user(state: &AppState, request: Request) -> (Option<AuthUser>, Request) {
    let (mut parts, body) = request.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, state).await.ok();
    (user, Request::from_parts(parts, body))
}

/// unauthenticated_user
///
/// Wraps guest-only routes. Needs the state to try resolving an identity.
pub async fn unauthenticated_user(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (user, request) = resolve_user(&state, request).await;

    match check_unauthenticated(user.as_ref()).into_rejection() {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

/// login_required
///
/// Resolves the caller and stores the `AuthUser` in the request extensions, where the role
/// guards and the handlers' `AuthUser` extractor pick it up without another lookup.
pub async fn login_required(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| HOME_URL.to_string());

    let (user, mut request) = resolve_user(&state, request).await;

    if let Some(rejection) = check_login(user.as_ref(), &target).into_rejection() {
        tracing::debug!(path = %target, "anonymous request redirected to login");
        return rejection;
    }

    if let Some(user) = user {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

/// users_allowed
///
/// Role guard. Must sit inside `login_required`; a request that reaches it without an
/// identity is treated as anonymous.
pub async fn users_allowed(roles: &[&str], request: Request, next: Next) -> Response {
    let decision = match request.extensions().get::<AuthUser>() {
        Some(user) => {
            let decision = check_users_allowed(user, roles);
            if decision == Access::Denied {
                tracing::warn!(
                    user = %user.username,
                    group = ?user.group(),
                    path = %request.uri().path(),
                    "access denied"
                );
            }
            decision
        }
        None => check_login(None, request.uri().path()),
    };

    match decision.into_rejection() {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}

/// only_admin
///
/// Guard for the admin landing page. Must sit inside `login_required`.
pub async fn only_admin(request: Request, next: Next) -> Response {
    let decision = match request.extensions().get::<AuthUser>() {
        Some(user) => {
            let decision = check_only_admin(user);
            if decision == Access::Denied {
                tracing::warn!(
                    user = %user.username,
                    group = ?user.group(),
                    "access denied"
                );
            }
            decision
        }
        None => check_login(None, request.uri().path()),
    };

    match decision.into_rejection() {
        Some(rejection) => rejection,
        None => next.run(request).await,
    }
}
