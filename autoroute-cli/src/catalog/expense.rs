//! Expenses, listed under `/api/expense/getall`.

use autoroute::middleware::BoxFuture;
use autoroute::prelude::*;

/// Most expenses a listing returns.
pub const LIST_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub doc_no: u32,
}

impl Expense {
    pub fn new(doc_no: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc_no,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseListDto {
    pub id: Uuid,
    pub doc_no: u32,
}

pub trait ExpenseRepository: Send + Sync {
    fn all(&self) -> BoxFuture<'_, Vec<Expense>>;
}

pub struct InMemoryExpenseRepository {
    expenses: Vec<Expense>,
}

impl InMemoryExpenseRepository {
    pub fn new(expenses: Vec<Expense>) -> Self {
        Self { expenses }
    }
}

impl ExpenseRepository for InMemoryExpenseRepository {
    fn all(&self) -> BoxFuture<'_, Vec<Expense>> {
        Box::pin(async move { self.expenses.clone() })
    }
}

/// Built per request from the container's `Arc<dyn ExpenseRepository>`.
pub struct ExpenseAppService {
    repo: Arc<dyn ExpenseRepository>,
}

impl AppService for ExpenseAppService {
    fn construct(state: &AppState) -> Result<Self> {
        Ok(Self {
            repo: state.require::<Arc<dyn ExpenseRepository>>()?,
        })
    }
}

#[app_service]
impl ExpenseAppService {
    pub async fn get_all_async(&self, _ct: CancellationToken) -> Result<Vec<ExpenseListDto>> {
        let expenses = self.repo.all().await;
        Ok(expenses
            .into_iter()
            .take(LIST_LIMIT)
            .map(|e| ExpenseListDto {
                id: e.id,
                doc_no: e.doc_no,
            })
            .collect())
    }
}
