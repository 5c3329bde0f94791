use crate::error::Result;
use crate::models::Element;
use crate::query_builder::QueryPlan;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Storage backend that executes compiled query plans.
///
/// Offsets are absolute within the plan's full result set. Pagination recorded on the
/// plan itself is applied by the caller, not by the backend.
#[async_trait]
pub trait ElementStorage: Send + Sync {
    /// Fetch up to `limit` matching elements starting at `offset`, in plan order
    async fn fetch_page(&self, plan: &QueryPlan, offset: u64, limit: u64) -> Result<Vec<Element>>;

    /// Count every element the plan matches
    async fn count(&self, plan: &QueryPlan) -> Result<u64>;
}

/// Storage that scans an in-memory element list
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    elements: RwLock<Vec<Element>>,
    fetches: AtomicU64,
}

impl InMemoryStorage {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements: RwLock::new(elements),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn insert(&self, element: Element) {
        self.elements.write().push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    /// Number of `fetch_page` round trips served so far
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn matching(&self, plan: &QueryPlan) -> Vec<Element> {
        let mut matched: Vec<Element> = self
            .elements
            .read()
            .iter()
            .filter(|element| plan.matches(element))
            .cloned()
            .collect();
        plan.sort(&mut matched);
        matched
    }
}

#[async_trait]
impl ElementStorage for InMemoryStorage {
    async fn fetch_page(&self, plan: &QueryPlan, offset: u64, limit: u64) -> Result<Vec<Element>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let page: Vec<Element> = self
            .matching(plan)
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        debug!(
            element_type = %plan.element_type(),
            offset,
            limit,
            returned = page.len(),
            "Served in-memory page"
        );
        Ok(page)
    }

    async fn count(&self, plan: &QueryPlan) -> Result<u64> {
        Ok(self.matching(plan).len() as u64)
    }
}
