use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, de};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::models::{Order, OrderStatus};

/// OrderFilter
///
/// Query parameters accepted by the customer detail page (GET /customers/{id}).
/// Every field is optional; empty values (`?status=`) count as absent, the way a
/// submitted-but-blank HTML filter form arrives.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    /// Exact delivery status.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "Pending")]
    pub status: Option<OrderStatus>,
    /// Exact product ID.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>)]
    pub product: Option<Uuid>,
    /// Orders created on or after this day.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "2024-01-31")]
    pub start_date: Option<NaiveDate>,
    /// Orders created on or before this day.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[param(value_type = Option<String>, example = "2024-12-31")]
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of the order note.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub note: Option<String>,
}

impl OrderFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.product.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.note.is_none()
    }

    pub fn matches(&self, order: &Order) -> bool {
        if let Some(status) = self.status {
            if order.status != Some(status) {
                return false;
            }
        }

        if let Some(product) = self.product {
            if order.product_id != Some(product) {
                return false;
            }
        }

        let created = order.date_created.date_naive();
        if self.start_date.is_some_and(|start| created < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| created > end) {
            return false;
        }

        if let Some(needle) = &self.note {
            let needle = needle.to_lowercase();
            let found = order
                .note
                .as_deref()
                .is_some_and(|note| note.to_lowercase().contains(&needle));
            if !found {
                return false;
            }
        }

        true
    }

    /// Keeps the orders matching every supplied criterion, preserving their order.
    pub fn apply(&self, orders: Vec<Order>) -> Vec<Order> {
        if self.is_empty() {
            return orders;
        }
        orders.into_iter().filter(|order| self.matches(order)).collect()
    }
}

fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}
