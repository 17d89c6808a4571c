//! The sample catalog application.
//!
//! Products and expenses are resolved by construction from repositories in
//! the container; the project service is registered under its
//! `ProjectCatalog` capability.

pub mod expense;
pub mod product;
pub mod project;

use std::str::FromStr;

use autoroute::prelude::*;
use rust_decimal::Decimal;

use expense::{Expense, ExpenseAppService, ExpenseRepository, InMemoryExpenseRepository};
use product::{InMemoryProductRepository, Product, ProductAppService, ProductRepository};
use project::{InMemoryProjectRepository, Project, ProjectAppService, ProjectCatalog, ProjectRepository};

pub const TITLE: &str = "Catalog API";

/// Wires the catalog services and their repositories into an [`App`].
pub fn app(config: &ServerConfig) -> App {
    let products: Arc<dyn ProductRepository> = Arc::new(seed_products());
    let projects: Arc<dyn ProjectRepository> = Arc::new(seed_projects());
    let expenses: Arc<dyn ExpenseRepository> = Arc::new(seed_expenses());

    let mut app = App::new()
        .state(products)
        .state(expenses)
        .provide_as::<dyn ProjectCatalog, _>(ProjectAppService::new(projects))
        .service::<ProductAppService>()
        .service::<ProjectAppService>()
        .service::<ExpenseAppService>()
        .mapper_options(MapperOptions::new().prefix(config.api_prefix.clone()))
        .middleware(RequestLogMiddleware::new())
        .openapi(TITLE, env!("CARGO_PKG_VERSION"));

    if let Some(timeout) = config.request_timeout {
        app = app.with_request_timeout(timeout);
    }
    app
}

fn seed_products() -> InMemoryProductRepository {
    let seed = [("Standing desk", "499.00"), ("Desk lamp", "39.90")];
    InMemoryProductRepository::with_products(seed.into_iter().filter_map(|(name, price)| {
        let price = Decimal::from_str(price).ok()?;
        Product::new(name, price).ok()
    }))
}

fn seed_projects() -> InMemoryProjectRepository {
    InMemoryProjectRepository::new(vec![Project::new("Warehouse move"), Project::new("Spring sale")])
}

fn seed_expenses() -> InMemoryExpenseRepository {
    InMemoryExpenseRepository::new(vec![Expense::new(1001), Expense::new(1002), Expense::new(1003)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoroute::testing::TestClient;
    use http::StatusCode;

    const SECRET: &str = "catalog-test-secret";

    async fn client() -> (TestClient, AuthConfig) {
        let auth = AuthConfig::new(SECRET, 3600);
        let client = TestClient::new(app(&ServerConfig::default()).with_auth(auth.clone())).await;
        (client, auth)
    }

    fn token(auth: &AuthConfig, permissions: &[&str]) -> String {
        auth.create_token_with(
            "tester",
            Vec::new(),
            permissions.iter().map(|p| p.to_string()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_catalog_routes() {
        let dispatcher = app(&ServerConfig::default()).build().unwrap();
        let mut routes: Vec<_> = dispatcher
            .routes()
            .into_iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        routes.sort();

        assert_eq!(
            routes,
            [
                "DELETE /api/product/delete",
                "GET /api/expense/getall",
                "GET /api/product/get",
                "GET /api/product/getall",
                "GET /api/project/getall",
                "POST /api/product/create",
                "PUT /api/product/update",
            ]
        );
    }

    #[tokio::test]
    async fn test_seeded_products_are_listed() {
        let (client, auth) = client().await;
        let response = client
            .get("/api/product/getall")
            .bearer(&token(&auth, &["Products.Read"]))
            .send()
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let products = response.json::<Vec<serde_json::Value>>();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0]["name"], "Standing desk");
    }

    #[tokio::test]
    async fn test_create_conflict_and_validation() {
        let (client, auth) = client().await;
        let token = token(&auth, &["Products.Create"]);

        let response = client
            .post("/api/product/create")
            .bearer(&token)
            .json(&serde_json::json!({"name": "Standing desk", "price": "1"}))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = client
            .post("/api/product/create")
            .bearer(&token)
            .json(&serde_json::json!({"name": "", "price": "1"}))
            .send()
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_project_listing_needs_only_authentication() {
        let (client, auth) = client().await;
        let response = client
            .get("/api/project/getall")
            .bearer(&token(&auth, &[]))
            .send()
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.json::<Vec<serde_json::Value>>().len(), 2);
    }

    #[tokio::test]
    async fn test_expense_listing() {
        let (client, auth) = client().await;
        let response = client
            .get("/api/expense/getall")
            .bearer(&token(&auth, &[]))
            .send()
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let expenses = response.json::<Vec<serde_json::Value>>();
        assert_eq!(expenses.len(), 3);
        assert_eq!(expenses[0]["doc_no"], 1001);
    }
}
