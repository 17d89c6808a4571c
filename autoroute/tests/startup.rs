//! Registration problems abort `App::build`.

use autoroute::StartupError;
use autoroute::endpoint::{MethodDescriptor, ParamKind};
use autoroute::prelude::*;
use autoroute::testing::TestClient;
use http::StatusCode;

struct OrderAppService;

impl AppService for OrderAppService {
    fn construct(_: &AppState) -> Result<Self> {
        Ok(Self)
    }
}

#[app_service]
impl OrderAppService {
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }
}

/// Derives the same route group as `OrderAppService`.
struct Order;

impl AppService for Order {}

#[app_service]
impl Order {
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }
}

struct ShippingAppService;

impl AppService for ShippingAppService {}

#[app_service]
impl ShippingAppService {
    pub async fn get_async(&self, _id: Uuid, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    #[endpoint(verb = "GET", path = "get")]
    pub async fn fetch_async(&self, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }
}

/// An explicit `:id` segment that would swallow `getall`.
struct ItemAppService;

impl AppService for ItemAppService {}

#[app_service]
impl ItemAppService {
    #[endpoint(path = ":id")]
    pub async fn get_async(&self, _id: Uuid, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<u32>> {
        Ok(Vec::new())
    }
}

/// Same parameterised segment, different verbs.
struct TicketAppService;

impl AppService for TicketAppService {
    fn construct(_: &AppState) -> Result<Self> {
        Ok(Self)
    }
}

#[app_service]
impl TicketAppService {
    #[endpoint(path = ":id")]
    pub async fn get_async(&self, _id: Uuid, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }

    #[endpoint(path = ":id")]
    pub async fn delete_async(&self, _id: Uuid, _ct: CancellationToken) -> Result<()> {
        Ok(())
    }
}

/// Wires `DispatchAsync` through the no-argument adapter while declaring an id.
struct MismatchAppService;

impl AppService for MismatchAppService {}

impl Operations for MismatchAppService {
    const TYPE_NAME: &'static str = "MismatchAppService";

    fn operations() -> Vec<Operation<Self>> {
        vec![Operation::no_args(
            MethodDescriptor::new("DispatchAsync")
                .param("id", ParamKind::Identifier)
                .param("ct", ParamKind::Cancellation),
            |_: Arc<Self>, _: CancellationToken| async { Ok(()) },
        )]
    }
}

/// Two identifiers; only reachable through a fallback handler.
struct MergeAppService;

impl AppService for MergeAppService {
    fn construct(_: &AppState) -> Result<Self> {
        Ok(Self)
    }
}

impl Operations for MergeAppService {
    const TYPE_NAME: &'static str = "MergeAppService";

    fn operations() -> Vec<Operation<Self>> {
        vec![Operation::fallback(
            MethodDescriptor::new("MergeAsync")
                .param("left", ParamKind::Identifier)
                .param("right", ParamKind::Identifier)
                .param("ct", ParamKind::Cancellation),
            |_: Arc<Self>, _: CancellationToken| async { Ok(()) },
        )]
    }
}

struct BareAppService;

impl AppService for BareAppService {}

impl Operations for BareAppService {
    const TYPE_NAME: &'static str = "AppService";

    fn operations() -> Vec<Operation<Self>> {
        Vec::new()
    }
}

fn build_err(app: App) -> StartupError {
    match app.build() {
        Ok(_) => panic!("expected the application to be rejected"),
        Err(err) => err,
    }
}

#[test]
fn test_duplicate_route_group() {
    let err = build_err(App::new().service::<OrderAppService>().service::<Order>());
    assert_eq!(
        err,
        StartupError::DuplicateRouteGroup {
            group: "order".to_string(),
            first: "OrderAppService".to_string(),
            second: "Order".to_string(),
        }
    );
}

#[test]
fn test_duplicate_route_within_a_service() {
    let err = build_err(App::new().service::<ShippingAppService>());
    assert_eq!(
        err,
        StartupError::DuplicateRoute {
            verb: "GET".to_string(),
            path: "/api/shipping/get".to_string(),
            first: "ShippingAppService.GetAsync".to_string(),
            second: "ShippingAppService.FetchAsync".to_string(),
        }
    );
}

#[test]
fn test_parameterised_route_shadowing_a_literal() {
    let err = build_err(App::new().service::<ItemAppService>());
    assert_eq!(
        err,
        StartupError::AmbiguousRoute {
            verb: "GET".to_string(),
            first_path: "/api/item/:id".to_string(),
            second_path: "/api/item/getall".to_string(),
            first: "ItemAppService.GetAsync".to_string(),
            second: "ItemAppService.GetAllAsync".to_string(),
        }
    );
}

#[tokio::test]
async fn test_parameterised_routes_on_different_verbs() {
    let client = TestClient::new(App::new().service::<TicketAppService>()).await;
    let path = format!("/api/ticket/{}", Uuid::new_v4());

    assert_eq!(client.get(&path).send().await.status(), StatusCode::OK);
    assert_eq!(client.delete(&path).send().await.status(), StatusCode::NO_CONTENT);
}

#[test]
fn test_shape_mismatch() {
    let err = build_err(App::new().service::<MismatchAppService>());
    assert!(matches!(err, StartupError::ShapeMismatch { ref method, .. } if method == "DispatchAsync"));
}

#[test]
fn test_unsupported_shape_without_fallback() {
    let err = build_err(App::new().service::<MergeAppService>());
    assert!(matches!(err, StartupError::UnsupportedShape { .. }));
    assert!(err.to_string().contains("MergeAsync"));
}

#[test]
fn test_empty_route_group() {
    let err = build_err(App::new().service::<BareAppService>());
    assert_eq!(
        err,
        StartupError::EmptyRouteGroup {
            service: "AppService".to_string(),
        }
    );
}

#[tokio::test]
async fn test_fallback_is_mapped_when_enabled() {
    let app = App::new()
        .service::<MergeAppService>()
        .mapper_options(MapperOptions::new().allow_fallback(true));
    let client = TestClient::new(app).await;

    // Merge is not a recognised verb prefix.
    let response = client.post("/api/merge/merge").send().await;
    assert_eq!(response.status(), StatusCode::OK);
}
