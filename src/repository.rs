use crate::access::CUSTOMER;
use crate::models::{
    Customer, DEFAULT_PROFILE_PIC, NewAccount, NewOrderLine, Order, Product,
    UpdateCustomerRequest, UpdateOrderRequest, User, UserCredentials,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Persistence contract used by handlers and the `AuthUser` extractor. Handlers only see
/// `Arc<dyn Repository>`, so tests substitute an in-memory implementation.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    /// User with its group names, earliest membership first.
    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>>;
    async fn find_credentials(&self, username: &str) -> sqlx::Result<Option<UserCredentials>>;
    /// Creates the user, adds it to the `customer` group and creates its linked Customer,
    /// all in one transaction.
    async fn create_customer_account(&self, account: NewAccount) -> sqlx::Result<User>;

    // --- Customers ---
    async fn list_customers(&self) -> sqlx::Result<Vec<Customer>>;
    async fn get_customer(&self, id: Uuid) -> sqlx::Result<Option<Customer>>;
    async fn get_customer_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<Customer>>;
    /// Partial update; absent fields keep their value.
    async fn update_customer(
        &self,
        id: Uuid,
        req: UpdateCustomerRequest,
    ) -> sqlx::Result<Option<Customer>>;

    // --- Products ---
    async fn list_products(&self) -> sqlx::Result<Vec<Product>>;

    // --- Orders ---
    async fn list_orders(&self) -> sqlx::Result<Vec<Order>>;
    async fn customer_orders(&self, customer_id: Uuid) -> sqlx::Result<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> sqlx::Result<Option<Order>>;
    /// Inserts every line for `customer_id` atomically.
    async fn create_orders(
        &self,
        customer_id: Uuid,
        lines: Vec<NewOrderLine>,
    ) -> sqlx::Result<Vec<Order>>;
    async fn update_order(&self, id: Uuid, req: UpdateOrderRequest)
    -> sqlx::Result<Option<Order>>;
    /// Returns false when no such order exists.
    async fn delete_order(&self, id: Uuid) -> sqlx::Result<bool>;
}

/// RepositoryState
///
/// Shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.date_joined,
           COALESCE(
               ARRAY_AGG(g.name ORDER BY ug.id) FILTER (WHERE g.name IS NOT NULL),
               '{}'
           )::TEXT[] AS groups
    FROM users u
    LEFT JOIN user_groups ug ON ug.user_id = u.id
    LEFT JOIN groups g ON g.id = ug.group_id
"#;

const CUSTOMER_SELECT: &str = r#"
    SELECT id, user_id, name, phone, email, profile_pic, date_created
    FROM customers
"#;

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.customer_id, o.product_id, o.status, o.note, o.date_created,
           c.name AS customer_name, p.name AS product_name
    FROM orders o
    LEFT JOIN customers c ON c.id = o.customer_id
    LEFT JOIN products p ON p.id = o.product_id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("{USER_SELECT} WHERE u.id = $1 GROUP BY u.id"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_credentials(&self, username: &str) -> sqlx::Result<Option<UserCredentials>> {
        sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// create_customer_account
    ///
    /// A missing `customer` group is a deployment error (the seed migration did not run) and
    /// aborts the transaction.
    async fn create_customer_account(&self, account: NewAccount) -> sqlx::Result<User> {
        let mut tx = self.pool.begin().await?;

        let group_id: Option<i32> = sqlx::query_scalar("SELECT id FROM groups WHERE name = $1")
            .bind(CUSTOMER)
            .fetch_optional(&mut *tx)
            .await?;
        let group_id = group_id.ok_or_else(|| {
            sqlx::Error::Configuration(format!("group '{CUSTOMER}' does not exist").into())
        })?;

        let user_id = Uuid::new_v4();
        let date_joined: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO users (id, username, email, password_hash, date_joined) \
             VALUES ($1, $2, $3, $4, NOW()) RETURNING date_joined",
        )
        .bind(user_id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO customers (id, user_id, name, email, profile_pic, date_created) \
             VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(DEFAULT_PROFILE_PIC)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(User {
            id: user_id,
            username: account.username,
            email: account.email,
            date_joined,
            groups: vec![CUSTOMER.to_string()],
        })
    }

    async fn list_customers(&self) -> sqlx::Result<Vec<Customer>> {
        sqlx::query_as::<_, Customer>(&format!("{CUSTOMER_SELECT} ORDER BY date_created DESC"))
            .fetch_all(&self.pool)
            .await
    }

    async fn get_customer(&self, id: Uuid) -> sqlx::Result<Option<Customer>> {
        sqlx::query_as::<_, Customer>(&format!("{CUSTOMER_SELECT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_customer_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<Customer>> {
        sqlx::query_as::<_, Customer>(&format!("{CUSTOMER_SELECT} WHERE user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// update_customer
    ///
    /// `COALESCE` keeps the stored value for every `None` field.
    async fn update_customer(
        &self,
        id: Uuid,
        req: UpdateCustomerRequest,
    ) -> sqlx::Result<Option<Customer>> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                email = COALESCE($4, email),
                profile_pic = COALESCE($5, profile_pic)
            WHERE id = $1
            RETURNING id, user_id, name, phone, email, profile_pic, date_created
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.phone)
        .bind(req.email)
        .bind(req.profile_pic)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_products(&self) -> sqlx::Result<Vec<Product>> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name, p.price, p.category, p.description, p.date_created,
                   COALESCE(
                       ARRAY_AGG(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
                       '{}'
                   )::TEXT[] AS tags
            FROM products p
            LEFT JOIN product_tags pt ON pt.product_id = p.id
            LEFT JOIN tags t ON t.id = pt.tag_id
            GROUP BY p.id
            ORDER BY p.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn list_orders(&self) -> sqlx::Result<Vec<Order>> {
        sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} ORDER BY o.date_created DESC"))
            .fetch_all(&self.pool)
            .await
    }

    async fn customer_orders(&self, customer_id: Uuid) -> sqlx::Result<Vec<Order>> {
        sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.customer_id = $1 ORDER BY o.date_created DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_order(&self, id: Uuid) -> sqlx::Result<Option<Order>> {
        sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_orders(
        &self,
        customer_id: Uuid,
        lines: Vec<NewOrderLine>,
    ) -> sqlx::Result<Vec<Order>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(lines.len());

        for line in &lines {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO orders (id, customer_id, product_id, status, date_created) \
                 VALUES ($1, $2, $3, $4, NOW())",
            )
            .bind(id)
            .bind(customer_id)
            .bind(line.product_id)
            .bind(line.status)
            .execute(&mut *tx)
            .await?;
            ids.push(id);
        }

        tx.commit().await?;

        sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.id = ANY($1) ORDER BY o.date_created DESC"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_order(
        &self,
        id: Uuid,
        req: UpdateOrderRequest,
    ) -> sqlx::Result<Option<Order>> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET customer_id = COALESCE($2, customer_id),
                product_id = COALESCE($3, product_id),
                status = COALESCE($4, status),
                note = COALESCE($5, note)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.customer_id)
        .bind(req.product_id)
        .bind(req.status)
        .bind(req.note)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_order(id).await
    }

    async fn delete_order(&self, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
