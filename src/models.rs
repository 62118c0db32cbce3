use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Maximum number of order lines accepted in one order set.
pub const MAX_ORDER_LINES: usize = 5;

/// Default storage key for customers who never uploaded a picture.
pub const DEFAULT_PROFILE_PIC: &str = "profile1.png";

// --- Text-backed enums ---

/// Raised when a stored or submitted value is not one of the known choices.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

/// Implements Postgres TEXT encoding/decoding for an enum exposing `as_str` and `FromStr`.
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(raw.parse::<$ty>()?)
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// OrderStatus
///
/// Delivery state of an order. Stored and serialized with the human-readable labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum OrderStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Out for delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::OutForDelivery => "Out for delivery",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Out for delivery" => Ok(OrderStatus::OutForDelivery),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(UnknownChoice {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(OrderStatus);

/// Category
///
/// Where a product is meant to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Category {
    #[serde(rename = "Indoor")]
    Indoor,
    #[serde(rename = "Out Door")]
    OutDoor,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Indoor => "Indoor",
            Category::OutDoor => "Out Door",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Indoor" => Ok(Category::Indoor),
            "Out Door" => Ok(Category::OutDoor),
            other => Err(UnknownChoice {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

text_column!(Category);

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Login identity from the `users` table, together with its group names in the order they
/// were granted. The first group is the one access control looks at.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
    pub groups: Vec<String>,
}

/// Password material for a username. Never leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
}

/// Everything needed to open a customer account in one transaction.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Customer
///
/// A buyer. Self-registered customers are linked one-to-one to their `User`;
/// customers created by staff may have no login at all.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Storage key of the profile picture.
    pub profile_pic: Option<String>,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
}

/// Product
///
/// Catalogue entry. `tags` is aggregated from the `product_tags` join table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<Category>,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
    #[sqlx(default)]
    pub tags: Vec<String>,
}

/// Order
///
/// One product ordered by one customer. `customer_name` and `product_name` are loaded via
/// JOINs in the repository; both foreign keys are nullable (`ON DELETE SET NULL`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub note: Option<String>,
    #[ts(type = "string")]
    pub date_created: DateTime<Utc>,
    #[sqlx(default)]
    pub customer_name: Option<String>,
    #[sqlx(default)]
    pub product_name: Option<String>,
}

// --- Aggregates ---

/// OrderSummary
///
/// Counters shown on both dashboards. Computed from the same order list that is returned,
/// so the numbers always match the records on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderSummary {
    pub total_orders: i64,
    pub delivered: i64,
    pub pending: i64,
}

impl OrderSummary {
    pub fn from_orders(orders: &[Order]) -> Self {
        let count = |status: OrderStatus| {
            orders
                .iter()
                .filter(|order| order.status == Some(status))
                .count() as i64
        };

        Self {
            total_orders: orders.len() as i64,
            delivered: count(OrderStatus::Delivered),
            pending: count(OrderStatus::Pending),
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Sign-up form. The password is hashed before it reaches the repository.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password1: String,
    #[validate(must_match(other = "password1"))]
    pub password2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// UpdateCustomerRequest
///
/// Partial update of the caller's own customer record (account settings).
/// Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateCustomerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,

    /// Key returned by the profile picture upload endpoint, or the default picture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
}

/// OrderLine
///
/// One row of the inline order set. A row with neither field set is blank and ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

/// CreateOrdersRequest
///
/// Inline order set for a single customer (POST /customers/{id}/orders).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateOrdersRequest {
    pub orders: Vec<OrderLine>,
}

/// A non-blank, validated order line ready for insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderSetError {
    #[error("at most {max} order lines can be submitted at once, got {0}", max = MAX_ORDER_LINES)]
    TooManyLines(usize),
    #[error("order line {0} has a status but no product")]
    MissingProduct(usize),
}

impl CreateOrdersRequest {
    /// Drops blank lines and rejects incomplete ones. Line numbers in errors are 1-based.
    pub fn into_lines(self) -> Result<Vec<NewOrderLine>, OrderSetError> {
        if self.orders.len() > MAX_ORDER_LINES {
            return Err(OrderSetError::TooManyLines(self.orders.len()));
        }

        let mut lines = Vec::with_capacity(self.orders.len());
        for (index, line) in self.orders.into_iter().enumerate() {
            match (line.product_id, line.status) {
                (None, None) => continue,
                (None, Some(_)) => return Err(OrderSetError::MissingProduct(index + 1)),
                (Some(product_id), status) => lines.push(NewOrderLine { product_id, status }),
            }
        }
        Ok(lines)
    }
}

/// UpdateOrderRequest
///
/// Partial update of an order. Only provided fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived profile picture upload URL.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "me.png")]
    pub filename: String,
    /// The MIME type. Only `image/*` is accepted.
    #[schema(example = "image/png")]
    pub file_type: String,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key to store as `profile_pic` once the upload succeeds.
    pub resource_key: String,
}

// --- Page Schemas (Output) ---

/// DashboardResponse
///
/// Admin home page (GET /).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardResponse {
    pub orders: Vec<Order>,
    pub customers: Vec<Customer>,
    pub total_customers: i64,
    pub total_orders: i64,
    pub delivered: i64,
    pub pending: i64,
}

/// UserPageResponse
///
/// A customer's own order overview (GET /user).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserPageResponse {
    pub orders: Vec<Order>,
    pub total_orders: i64,
    pub delivered: i64,
    pub pending: i64,
}

/// CustomerDetailResponse
///
/// `order_count` counts every order of the customer; `orders` is the filtered subset.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CustomerDetailResponse {
    pub customer: Customer,
    pub orders: Vec<Order>,
    pub order_count: i64,
}

/// Payload of the delete confirmation page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DeleteConfirmation {
    pub item: Order,
}
