#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use chrono::{DateTime, Utc};
use order_portal::{
    AppConfig, AppState, create_router,
    auth::encode_jwt,
    models::{
        Customer, NewAccount, NewOrderLine, Order, OrderStatus, Product, UpdateCustomerRequest,
        UpdateOrderRequest, User, UserCredentials,
    },
    repository::Repository,
    storage::MockStorageService,
};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

#[derive(Default)]
struct Store {
    users: Vec<(User, String)>,
    customers: Vec<Customer>,
    products: Vec<Product>,
    orders: Vec<Order>,
}

/// MemoryRepo
///
/// In-memory `Repository` with the same observable behaviour as the Postgres one:
/// joined names on orders, partial updates, and the `customer` group requirement on sign-up.
pub struct MemoryRepo {
    store: Mutex<Store>,
    customer_group_exists: bool,
}

impl MemoryRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(Store::default()),
            customer_group_exists: true,
        })
    }

    pub fn without_customer_group() -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(Store::default()),
            customer_group_exists: false,
        })
    }

    pub fn add_user(&self, username: &str, groups: &[&str]) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            date_joined: Utc::now(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        };
        // Minimum bcrypt cost.
        let hash = bcrypt::hash(TEST_PASSWORD, 4).expect("hash");
        self.store.lock().unwrap().users.push((user.clone(), hash));
        user
    }

    pub fn remove_user(&self, id: Uuid) {
        self.store.lock().unwrap().users.retain(|(u, _)| u.id != id);
    }

    pub fn add_customer(&self, user_id: Option<Uuid>, name: &str) -> Customer {
        let customer = Customer {
            id: Uuid::new_v4(),
            user_id,
            name: Some(name.to_string()),
            phone: None,
            email: Some(format!("{}@example.com", name.to_lowercase())),
            profile_pic: Some("profile1.png".to_string()),
            date_created: Utc::now(),
        };
        self.store.lock().unwrap().customers.push(customer.clone());
        customer
    }

    pub fn add_product(&self, name: &str) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            price: Some(12.5),
            category: None,
            description: None,
            date_created: Utc::now(),
            tags: vec!["Kitchen".to_string()],
        };
        self.store.lock().unwrap().products.push(product.clone());
        product
    }

    pub fn add_order(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
        note: Option<&str>,
    ) -> Order {
        self.add_order_at(customer_id, product_id, status, note, Utc::now())
    }

    pub fn add_order_at(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        status: OrderStatus,
        note: Option<&str>,
        date_created: DateTime<Utc>,
    ) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: Some(customer_id),
            product_id: Some(product_id),
            status: Some(status),
            note: note.map(str::to_string),
            date_created,
            customer_name: None,
            product_name: None,
        };
        self.store.lock().unwrap().orders.push(order.clone());
        order
    }

    pub fn order_count(&self) -> usize {
        self.store.lock().unwrap().orders.len()
    }

    pub fn customer_of(&self, user_id: Uuid) -> Option<Customer> {
        self.store
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.user_id == Some(user_id))
            .cloned()
    }

    fn joined(store: &Store, order: &Order) -> Order {
        let mut order = order.clone();
        order.customer_name = store
            .customers
            .iter()
            .find(|c| Some(c.id) == order.customer_id)
            .and_then(|c| c.name.clone());
        order.product_name = store
            .products
            .iter()
            .find(|p| Some(p.id) == order.product_id)
            .and_then(|p| p.name.clone());
        order
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn get_user(&self, id: Uuid) -> sqlx::Result<Option<User>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials(&self, username: &str) -> sqlx::Result<Option<UserCredentials>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| UserCredentials {
                id: u.id,
                password_hash: hash.clone(),
            }))
    }

    async fn create_customer_account(&self, account: NewAccount) -> sqlx::Result<User> {
        if !self.customer_group_exists {
            return Err(sqlx::Error::Configuration(
                "group 'customer' does not exist".into(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: account.username.clone(),
            email: account.email.clone(),
            date_joined: Utc::now(),
            groups: vec!["customer".to_string()],
        };

        let mut store = self.store.lock().unwrap();
        store.users.push((user.clone(), account.password_hash));
        store.customers.push(Customer {
            id: Uuid::new_v4(),
            user_id: Some(user.id),
            name: Some(account.username),
            phone: None,
            email: Some(account.email),
            profile_pic: Some("profile1.png".to_string()),
            date_created: Utc::now(),
        });
        Ok(user)
    }

    async fn list_customers(&self) -> sqlx::Result<Vec<Customer>> {
        Ok(self.store.lock().unwrap().customers.clone())
    }

    async fn get_customer(&self, id: Uuid) -> sqlx::Result<Option<Customer>> {
        let store = self.store.lock().unwrap();
        Ok(store.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn get_customer_by_user(&self, user_id: Uuid) -> sqlx::Result<Option<Customer>> {
        Ok(self.customer_of(user_id))
    }

    async fn update_customer(
        &self,
        id: Uuid,
        req: UpdateCustomerRequest,
    ) -> sqlx::Result<Option<Customer>> {
        let mut store = self.store.lock().unwrap();
        let Some(customer) = store.customers.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if req.name.is_some() {
            customer.name = req.name;
        }
        if req.phone.is_some() {
            customer.phone = req.phone;
        }
        if req.email.is_some() {
            customer.email = req.email;
        }
        if req.profile_pic.is_some() {
            customer.profile_pic = req.profile_pic;
        }
        Ok(Some(customer.clone()))
    }

    async fn list_products(&self) -> sqlx::Result<Vec<Product>> {
        Ok(self.store.lock().unwrap().products.clone())
    }

    async fn list_orders(&self) -> sqlx::Result<Vec<Order>> {
        let store = self.store.lock().unwrap();
        Ok(store.orders.iter().map(|o| Self::joined(&store, o)).collect())
    }

    async fn customer_orders(&self, customer_id: Uuid) -> sqlx::Result<Vec<Order>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .orders
            .iter()
            .filter(|o| o.customer_id == Some(customer_id))
            .map(|o| Self::joined(&store, o))
            .collect())
    }

    async fn get_order(&self, id: Uuid) -> sqlx::Result<Option<Order>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| Self::joined(&store, o)))
    }

    async fn create_orders(
        &self,
        customer_id: Uuid,
        lines: Vec<NewOrderLine>,
    ) -> sqlx::Result<Vec<Order>> {
        let mut store = self.store.lock().unwrap();
        let mut created = Vec::new();
        for line in lines {
            let order = Order {
                id: Uuid::new_v4(),
                customer_id: Some(customer_id),
                product_id: Some(line.product_id),
                status: line.status,
                note: None,
                date_created: Utc::now(),
                customer_name: None,
                product_name: None,
            };
            store.orders.push(order.clone());
            created.push(Self::joined(&store, &order));
        }
        Ok(created)
    }

    async fn update_order(
        &self,
        id: Uuid,
        req: UpdateOrderRequest,
    ) -> sqlx::Result<Option<Order>> {
        let mut store = self.store.lock().unwrap();
        let Some(order) = store.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if req.customer_id.is_some() {
            order.customer_id = req.customer_id;
        }
        if req.product_id.is_some() {
            order.product_id = req.product_id;
        }
        if req.status.is_some() {
            order.status = req.status;
        }
        if req.note.is_some() {
            order.note = req.note;
        }
        let order = order.clone();
        Ok(Some(Self::joined(&store, &order)))
    }

    async fn delete_order(&self, id: Uuid) -> sqlx::Result<bool> {
        let mut store = self.store.lock().unwrap();
        let before = store.orders.len();
        store.orders.retain(|o| o.id != id);
        Ok(store.orders.len() < before)
    }
}

// --- State & request helpers ---

pub fn test_state(repo: Arc<MemoryRepo>) -> AppState {
    AppState {
        repo,
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

pub fn test_app(repo: Arc<MemoryRepo>) -> Router {
    create_router(test_state(repo))
}

pub fn token_for(user: &User) -> String {
    let config = AppConfig::default();
    encode_jwt(user.id, &config.jwt_secret, 1).expect("token")
}

pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("router is infallible")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
