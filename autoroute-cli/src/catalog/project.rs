//! Projects, listed under `/api/project/getall`.

use autoroute::middleware::BoxFuture;
use autoroute::prelude::*;

/// Most projects a listing returns.
pub const LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectListDto {
    pub id: Uuid,
    pub name: String,
}

pub trait ProjectRepository: Send + Sync {
    fn all(&self) -> BoxFuture<'_, Vec<Project>>;
}

pub struct InMemoryProjectRepository {
    projects: Vec<Project>,
}

impl InMemoryProjectRepository {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    fn all(&self) -> BoxFuture<'_, Vec<Project>> {
        Box::pin(async move { self.projects.clone() })
    }
}

/// Capability the project service is registered under.
pub trait ProjectCatalog: Send + Sync {}

pub struct ProjectAppService {
    repo: Arc<dyn ProjectRepository>,
}

impl ProjectAppService {
    pub fn new(repo: Arc<dyn ProjectRepository>) -> Self {
        Self { repo }
    }
}

impl ProjectCatalog for ProjectAppService {}

impl AppService for ProjectAppService {
    fn capabilities() -> Vec<Capability> {
        vec![Capability::of::<dyn ProjectCatalog>()]
    }
}

#[app_service]
impl ProjectAppService {
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<ProjectListDto>> {
        let projects = self.repo.all().await;
        Ok(projects
            .into_iter()
            .take(LIST_LIMIT)
            .map(|p| ProjectListDto {
                id: p.id,
                name: p.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_is_capped() {
        let projects = (0..150).map(|i| Project::new(format!("P{}", i))).collect();
        let service = ProjectAppService::new(Arc::new(InMemoryProjectRepository::new(projects)));

        let listed = service
            .get_all_async(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(listed.len(), LIST_LIMIT);
        assert_eq!(listed[0].name, "P0");
    }

    #[test]
    fn test_no_constructor_without_registration() {
        let err = ProjectAppService::construct(&AppState::new()).err().unwrap();
        assert_eq!(err.status, 500);
    }
}
