use crate::{
    AppState,
    access::{self, LOGIN_URL},
    auth::{self, AuthUser},
    error::AppError,
    filters::OrderFilter,
    models::{
        CreateOrdersRequest, Customer, CustomerDetailResponse, DashboardResponse,
        DeleteConfirmation, LoginRequest, LoginResponse, MessageResponse, NewAccount, Order,
        OrderSummary, PresignedUrlRequest, PresignedUrlResponse, Product, RegisterUserRequest,
        UpdateCustomerRequest, UpdateOrderRequest, UserPageResponse,
    },
    storage,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use uuid::Uuid;
use validator::Validate;

// --- Guest pages ---

/// register_user
///
/// [Guest Route] Opens a customer account: user, `customer` group membership and linked
/// Customer record are created together.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    payload.validate()?;

    if state.repo.find_credentials(&payload.username).await?.is_some() {
        return Err(AppError::conflict("A user with that username already exists."));
    }

    let password_hash = auth::hash_password(&payload.password1)?;
    let user = state
        .repo
        .create_customer_account(NewAccount {
            username: payload.username,
            email: payload.email,
            password_hash,
        })
        .await?;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        "customer account created"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Account was created for {}", user.username),
        }),
    ))
}

/// login
///
/// [Guest Route] Exchanges username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Username or Password is incorrect")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let credentials = state
        .repo
        .find_credentials(&payload.username)
        .await?
        .filter(|c| auth::verify_password(&payload.password, &c.password_hash))
        .ok_or_else(|| AppError::unauthorized("Username or Password is incorrect"))?;

    let token = auth::encode_jwt(
        credentials.id,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
    }))
}

/// logout
///
/// Tokens are stateless; the client drops its token and is sent back to the login page.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 302, description = "Redirect to login"))
)]
pub async fn logout() -> Response {
    access::found(LOGIN_URL)
}

// --- Customer pages ---

async fn own_customer(state: &AppState, user_id: Uuid) -> Result<Customer, AppError> {
    state
        .repo
        .get_customer_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer profile not found"))
}

/// user_page
///
/// [Customer Route] The caller's own orders with their counters.
#[utoipa::path(
    get,
    path = "/user",
    responses((status = 200, description = "My orders", body = UserPageResponse))
)]
pub async fn user_page(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserPageResponse>, AppError> {
    let customer = own_customer(&state, id).await?;
    let orders = state.repo.customer_orders(customer.id).await?;
    let summary = OrderSummary::from_orders(&orders);

    Ok(Json(UserPageResponse {
        orders,
        total_orders: summary.total_orders,
        delivered: summary.delivered,
        pending: summary.pending,
    }))
}

/// account_settings
///
/// [Customer Route] The caller's customer record.
#[utoipa::path(
    get,
    path = "/account",
    responses((status = 200, description = "Account", body = Customer))
)]
pub async fn account_settings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(own_customer(&state, id).await?))
}

/// update_account_settings
///
/// [Customer Route] Partial update of the caller's customer record. A customer can only
/// ever reach its own record: the ID comes from the identity, never from the request.
/// `profile_pic` must be the default picture or a key issued under the caller's own prefix.
#[utoipa::path(
    post,
    path = "/account",
    request_body = UpdateCustomerRequest,
    responses(
        (status = 200, description = "Updated", body = Customer),
        (status = 400, description = "Validation error or foreign picture key")
    )
)]
pub async fn update_account_settings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    payload.validate()?;

    let customer = own_customer(&state, id).await?;

    if let Some(key) = payload.profile_pic.as_deref() {
        if !storage::is_own_picture_key(customer.id, key) {
            tracing::warn!(
                customer_id = %customer.id,
                key,
                "rejected foreign profile picture key"
            );
            return Err(AppError::bad_request("Invalid profile picture key")
                .with_details(key.to_string()));
        }
    }

    let updated = state
        .repo
        .update_customer(customer.id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Customer profile not found"))?;

    Ok(Json(updated))
}

/// get_profile_picture_upload_url
///
/// [Customer Route] Presigned URL for uploading a new profile picture straight to storage.
/// The returned `resource_key` is then saved through `POST /account`.
#[utoipa::path(
    post,
    path = "/account/profile-pic",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "Not an image")
    )
)]
pub async fn get_profile_picture_upload_url(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> Result<Json<PresignedUrlResponse>, AppError> {
    if !payload.file_type.starts_with("image/") {
        return Err(AppError::bad_request("Profile pictures must be images")
            .with_details(payload.file_type));
    }

    let customer = own_customer(&state, id).await?;
    let object_key = storage::profile_picture_key(customer.id, &payload.filename);
    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await?;

    Ok(Json(PresignedUrlResponse {
        upload_url,
        resource_key: object_key,
    }))
}

// --- Admin pages ---

/// home
///
/// [Admin Route] Dashboard: every order and customer plus aggregate counters.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 302, description = "Customers are sent to /user")
    )
)]
pub async fn home(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let orders = state.repo.list_orders().await?;
    let customers = state.repo.list_customers().await?;
    let summary = OrderSummary::from_orders(&orders);

    Ok(Json(DashboardResponse {
        total_customers: customers.len() as i64,
        total_orders: summary.total_orders,
        delivered: summary.delivered,
        pending: summary.pending,
        orders,
        customers,
    }))
}

/// products
///
/// [Admin Route] The product catalogue.
#[utoipa::path(
    get,
    path = "/products",
    responses((status = 200, description = "Products", body = [Product]))
)]
pub async fn products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.repo.list_products().await?))
}

/// customer_detail
///
/// [Admin Route] One customer with its orders. `order_count` is taken before filtering.
#[utoipa::path(
    get,
    path = "/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID"), OrderFilter),
    responses(
        (status = 200, description = "Customer", body = CustomerDetailResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn customer_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<CustomerDetailResponse>, AppError> {
    let customer = state
        .repo
        .get_customer(id)
        .await?
        .ok_or_else(|| AppError::not_found("Customer not found"))?;

    let orders = state.repo.customer_orders(customer.id).await?;
    let order_count = orders.len() as i64;

    Ok(Json(CustomerDetailResponse {
        customer,
        orders: filter.apply(orders),
        order_count,
    }))
}

/// create_orders
///
/// [Admin Route] Saves an inline order set (up to five lines) for one customer.
/// Blank lines are skipped; any invalid line rejects the whole set.
#[utoipa::path(
    post,
    path = "/customers/{id}/orders",
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = CreateOrdersRequest,
    responses(
        (status = 201, description = "Created", body = [Order]),
        (status = 400, description = "Invalid order set"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn create_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CreateOrdersRequest>,
) -> Result<(StatusCode, Json<Vec<Order>>), AppError> {
    let lines = payload.into_lines()?;

    if state.repo.get_customer(customer_id).await?.is_none() {
        return Err(AppError::not_found("Customer not found"));
    }

    let created = state.repo.create_orders(customer_id, lines).await?;
    tracing::info!(%customer_id, count = created.len(), "orders created");

    Ok((StatusCode::CREATED, Json(created)))
}

async fn existing_order(state: &AppState, id: Uuid) -> Result<Order, AppError> {
    state
        .repo
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// get_order
///
/// [Admin Route] Current values of an order, for the edit form.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order", body = Order),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(existing_order(&state, id).await?))
}

/// update_order
///
/// [Admin Route] Partial update of an order.
#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated", body = Order),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .repo
        .update_order(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    Ok(Json(order))
}

/// confirm_delete_order
///
/// [Admin Route] The order about to be deleted, for the confirmation page.
#[utoipa::path(
    get,
    path = "/orders/{id}/delete",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Confirmation", body = DeleteConfirmation),
        (status = 404, description = "Not Found")
    )
)]
pub async fn confirm_delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteConfirmation>, AppError> {
    Ok(Json(DeleteConfirmation {
        item: existing_order(&state, id).await?,
    }))
}

/// delete_order
///
/// [Admin Route] Deletes an order.
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repo.delete_order(id).await? {
        tracing::info!(order_id = %id, "order deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Order not found"))
    }
}
