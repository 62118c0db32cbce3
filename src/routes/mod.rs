/// Router Module Index
///
/// Routes are split by who may reach them. Each tier applies its own guards with
/// `route_layer`, so a handler can never be mounted without the access check of its tier.

/// Open routes and guest-only pages (login, register).
pub mod public;

/// Routes for signed-in users whose first group is `customer`.
pub mod customer;

/// Dashboard and management routes for the `admin` group.
pub mod admin;
