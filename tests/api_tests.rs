mod common;

use common::{MemoryRepo, TEST_PASSWORD, test_state};
use order_portal::{
    create_router,
    models::{DashboardResponse, LoginResponse, Order, OrderStatus},
};
use reqwest::{StatusCode, header, redirect::Policy};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepo>,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    let repo = MemoryRepo::new();
    let router = create_router(test_state(repo.clone()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Redirects are part of the contract under test.
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        repo,
        client,
    }
}

impl TestApp {
    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(format!("{}/login", self.address))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), StatusCode::OK);
        let body: LoginResponse = response.json().await.unwrap();
        body.token
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_anonymous_dashboard_redirects() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        "/login?next=%2F"
    );
}

#[tokio::test]
async fn test_admin_order_lifecycle() {
    let app = spawn_app().await;
    app.repo.add_user("root", &["admin"]);
    let customer = app.repo.add_customer(None, "Quinn");
    let lamp = app.repo.add_product("Lamp");
    let token = app.login("root", TEST_PASSWORD).await;

    // Create
    let response = app
        .client
        .post(format!("{}/customers/{}/orders", app.address, customer.id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "orders": [
                { "product_id": lamp.id, "status": "Pending" },
                { "product_id": null, "status": null }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Vec<Order> = response.json().await.unwrap();
    assert_eq!(created.len(), 1);
    let order_id = created[0].id;

    // Update
    let response = app
        .client
        .put(format!("{}/orders/{}", app.address, order_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "status": "Out for delivery" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Order = response.json().await.unwrap();
    assert_eq!(updated.status, Some(OrderStatus::OutForDelivery));

    // Dashboard reflects it
    let dashboard: DashboardResponse = app
        .client
        .get(format!("{}/", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dashboard.total_orders, 1);
    assert_eq!(dashboard.pending, 0);
    assert_eq!(dashboard.delivered, 0);

    // Delete
    let response = app
        .client
        .delete(format!("{}/orders/{}", app.address, order_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.repo.order_count(), 0);
}

#[tokio::test]
async fn test_customer_filter_query_string() {
    let app = spawn_app().await;
    app.repo.add_user("root", &["admin"]);
    let customer = app.repo.add_customer(None, "Rae");
    let lamp = app.repo.add_product("Lamp");
    app.repo
        .add_order(customer.id, lamp.id, OrderStatus::Pending, Some("Leave at DOOR"));
    app.repo
        .add_order(customer.id, lamp.id, OrderStatus::Delivered, None);
    let token = app.login("root", TEST_PASSWORD).await;

    // Blank fields behave as if they were absent.
    let response = app
        .client
        .get(format!(
            "{}/customers/{}?status=&product=&note=door",
            app.address, customer.id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["order_count"], 2);
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);
}
