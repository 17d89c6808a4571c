//! Products: the entity, its repository and the application service that
//! exposes it under `/api/product`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use autoroute::middleware::BoxFuture;
use autoroute::prelude::*;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use validator::Validate;

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl Product {
    pub fn new(name: &str, price: Decimal) -> Result<Self> {
        let mut product = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            price: Decimal::ZERO,
        };
        product.rename(name)?;
        product.reprice(price)?;
        Ok(product)
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("name is required"));
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn reprice(&mut self, price: Decimal) -> Result<()> {
        if price.is_sign_negative() {
            return Err(Error::validation("price must not be negative"));
        }
        self.price = price;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub price: Decimal,
}

pub trait ProductRepository: Send + Sync {
    fn get(&self, id: Uuid) -> BoxFuture<'_, Option<Product>>;

    fn list(&self) -> BoxFuture<'_, Vec<Product>>;

    fn add(&self, product: Product) -> BoxFuture<'_, ()>;

    fn update(&self, product: Product) -> BoxFuture<'_, ()>;

    /// Returns whether a product was removed.
    fn delete(&self, id: Uuid) -> BoxFuture<'_, bool>;

    /// Whether a product other than `except` already uses `name`.
    fn name_taken<'a>(&'a self, name: &'a str, except: Option<Uuid>) -> BoxFuture<'a, bool>;
}

/// Products kept in memory, listed in insertion order.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<Uuid, (u64, Product)>>,
    sequence: AtomicU64,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut repo = Self::new();
        for product in products {
            let seq = repo.next_sequence();
            repo.products.get_mut().insert(product.id, (seq, product));
        }
        repo
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn get(&self, id: Uuid) -> BoxFuture<'_, Option<Product>> {
        Box::pin(async move {
            self.products
                .read()
                .await
                .get(&id)
                .map(|(_, product)| product.clone())
        })
    }

    fn list(&self) -> BoxFuture<'_, Vec<Product>> {
        Box::pin(async move {
            let products = self.products.read().await;
            let mut ordered: Vec<_> = products.values().collect();
            ordered.sort_by_key(|(seq, _)| *seq);
            ordered.into_iter().map(|(_, p)| p.clone()).collect()
        })
    }

    fn add(&self, product: Product) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let seq = self.next_sequence();
            self.products.write().await.insert(product.id, (seq, product));
        })
    }

    fn update(&self, product: Product) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Some(entry) = self.products.write().await.get_mut(&product.id) {
                entry.1 = product;
            }
        })
    }

    fn delete(&self, id: Uuid) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.products.write().await.remove(&id).is_some() })
    }

    fn name_taken<'a>(&'a self, name: &'a str, except: Option<Uuid>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.products.read().await.values().any(|(_, p)| {
                Some(p.id) != except && p.name.eq_ignore_ascii_case(name.trim())
            })
        })
    }
}

/// What the rest of the application sees of the product service.
pub trait ProductService: Send + Sync {}

pub struct ProductAppService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductAppService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }
}

impl ProductService for ProductAppService {}

impl AppService for ProductAppService {
    fn capabilities() -> Vec<Capability> {
        vec![Capability::of::<dyn ProductService>()]
    }

    fn construct(state: &AppState) -> Result<Self> {
        Ok(Self::new(state.require::<Arc<dyn ProductRepository>>()?))
    }
}

#[app_service]
impl ProductAppService {
    #[permission("Products.Read")]
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<ProductDto>> {
        let products = self.repo.list().await;
        Ok(products.iter().map(ProductDto::from).collect())
    }

    #[permission("Products.Read")]
    pub async fn get_async(&self, id: Uuid, _ct: CancellationToken) -> Result<Option<ProductDto>> {
        Ok(self.repo.get(id).await.as_ref().map(ProductDto::from))
    }

    #[permission("Products.Create")]
    pub async fn create_async(
        &self,
        dto: CreateProductRequest,
        ct: CancellationToken,
    ) -> Result<Uuid> {
        dto.validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        if self.repo.name_taken(&dto.name, None).await {
            return Err(Error::conflict("product name must be unique"));
        }

        let product = Product::new(&dto.name, dto.price)?;
        let id = product.id;
        if ct.is_cancelled() {
            return Err(Error::timeout("request cancelled"));
        }
        self.repo.add(product).await;
        tracing::info!(product_id = %id, "product created");
        Ok(id)
    }

    #[permission("Products.Update")]
    pub async fn update_async(
        &self,
        id: Uuid,
        dto: UpdateProductRequest,
        _ct: CancellationToken,
    ) -> Result<()> {
        dto.validate()
            .map_err(|e| Error::validation(e.to_string()))?;
        let mut product = self
            .repo
            .get(id)
            .await
            .ok_or_else(|| Error::not_found("product not found"))?;
        if self.repo.name_taken(&dto.name, Some(id)).await {
            return Err(Error::conflict("product name must be unique"));
        }

        product.rename(&dto.name)?;
        product.reprice(dto.price)?;
        self.repo.update(product).await;
        Ok(())
    }

    #[permission("Products.Delete")]
    pub async fn delete_async(&self, id: Uuid, _ct: CancellationToken) -> Result<()> {
        if !self.repo.delete(id).await {
            return Err(Error::not_found("product not found"));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn service() -> ProductAppService {
        ProductAppService::new(Arc::new(InMemoryProductRepository::new()))
    }

    fn create(name: &str, price: &str) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn test_product_rejects_blank_name_and_negative_price() {
        assert_eq!(Product::new("  ", Decimal::ONE).unwrap_err().status, 422);
        assert_eq!(
            Product::new("Desk", Decimal::NEGATIVE_ONE).unwrap_err().status,
            422
        );
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let service = service();
        let ct = CancellationToken::new();
        let id = service.create_async(create("Desk", "120.50"), ct.clone()).await.unwrap();

        let all = service.get_all_async(ct.clone()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].price, Decimal::from_str("120.50").unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let service = service();
        let ct = CancellationToken::new();
        service.create_async(create("Desk", "1"), ct.clone()).await.unwrap();

        let err = service.create_async(create("desk", "2"), ct).await.unwrap_err();
        assert_eq!(err.status, 409);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let service = service();
        let ct = CancellationToken::new();
        let update = UpdateProductRequest {
            name: "Chair".to_string(),
            price: Decimal::ONE,
        };

        let err = service
            .update_async(Uuid::new_v4(), update, ct.clone())
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);

        let err = service.delete_async(Uuid::new_v4(), ct).await.unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_update_may_keep_its_own_name() {
        let service = service();
        let ct = CancellationToken::new();
        let id = service.create_async(create("Desk", "1"), ct.clone()).await.unwrap();

        let update = UpdateProductRequest {
            name: "Desk".to_string(),
            price: Decimal::TEN,
        };
        service.update_async(id, update, ct.clone()).await.unwrap();

        let product = service.get_async(id, ct).await.unwrap().unwrap();
        assert_eq!(product.price, Decimal::TEN);
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let repo = InMemoryProductRepository::with_products([
            Product::new("B", Decimal::ONE).unwrap(),
            Product::new("A", Decimal::ONE).unwrap(),
        ]);
        let names: Vec<_> = repo.list().await.into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn test_operations_table() {
        let names: Vec<_> = ProductAppService::operations()
            .iter()
            .map(|op| op.descriptor().name)
            .collect();
        assert_eq!(
            names,
            ["GetAllAsync", "GetAsync", "CreateAsync", "UpdateAsync", "DeleteAsync"]
        );
    }
}
