//! Services found through `#[app_service]` registration.
//!
//! `inventory` collects from the entire test binary, so every service
//! declared here is discovered by every test in this file.

use autoroute::prelude::*;
use autoroute::testing::TestClient;
use http::StatusCode;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct ExpenseDto {
    amount: u32,
}

struct ExpenseAppService;

impl AppService for ExpenseAppService {
    fn construct(_: &AppState) -> Result<Self> {
        Ok(Self)
    }
}

#[app_service]
impl ExpenseAppService {
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<ExpenseDto>> {
        Ok(vec![ExpenseDto { amount: 12 }])
    }

    pub async fn recalculate(&self, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    #[endpoint(verb = "PUT", path = "approve/all")]
    pub async fn approve_everything(&self, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    #[endpoint(skip)]
    pub async fn internal_audit(&self, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    #[allow(dead_code)]
    async fn not_exposed(&self) -> Result<()> {
        Ok(())
    }
}

struct InvoiceAppService;

impl AppService for InvoiceAppService {
    fn construct(_: &AppState) -> Result<Self> {
        Ok(Self)
    }
}

#[app_service]
impl InvoiceAppService {
    pub async fn list_open(&self, _ct: CancellationToken) -> Result<Vec<u32>> {
        Ok(vec![1, 2, 3])
    }
}

#[test]
fn test_discover_finds_every_registered_service() {
    let registry = ServiceRegistry::new().discover();
    let names: Vec<_> = registry.type_names().collect();
    assert_eq!(names, ["ExpenseAppService", "InvoiceAppService"]);
}

#[test]
fn test_discover_twice_does_not_duplicate() {
    let registry = ServiceRegistry::new()
        .service::<ExpenseAppService>()
        .discover()
        .discover();
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_discovered_routes() {
    let dispatcher = App::new().discover().build().unwrap();
    let mut routes: Vec<_> = dispatcher
        .routes()
        .into_iter()
        .map(|r| format!("{} {} {}", r.method, r.path, r.handler_name))
        .collect();
    routes.sort();

    assert_eq!(
        routes,
        [
            "GET /api/expense/getall ExpenseAppService.GetAllAsync",
            "GET /api/invoice/listopen InvoiceAppService.ListOpen",
            "POST /api/expense/recalculate ExpenseAppService.Recalculate",
            "PUT /api/expense/approve/all ExpenseAppService.ApproveEverything",
        ]
    );
}

#[tokio::test]
async fn test_discovered_services_are_served() {
    let client = TestClient::new(App::new().discover()).await;

    let response = client.get("/api/expense/getall").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<serde_json::Value>()[0]["amount"], 12);

    let response = client.get("/api/invoice/listopen").send().await;
    assert_eq!(response.json::<Vec<u32>>(), [1, 2, 3]);

    let response = client.post("/api/expense/recalculate").send().await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.put("/api/expense/approve/all").send().await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_skipped_methods_are_not_routed() {
    let client = TestClient::new(App::new().discover()).await;
    let response = client.post("/api/expense/internalaudit").send().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_prefix() {
    let app = App::new()
        .discover()
        .mapper_options(MapperOptions::new().prefix("/v2/"));
    let client = TestClient::new(app).await;

    let response = client.get("/v2/expense/getall").send().await;
    assert_eq!(response.status(), StatusCode::OK);
}
