use super::storage::ElementStorage;
use crate::error::{QueryError, Result};
use crate::models::Element;
use crate::query_builder::QueryPlan;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Open,
    /// Storage has no more rows; the buffer may still hold some
    Drained,
    /// The end has been reported to the caller
    Finished,
}

/// Forward-only cursor over a compiled plan's results.
///
/// Rows are fetched from storage in pages. The plan's own offset and limit bound the
/// window. Once `next` has returned `Ok(None)` the cursor is spent and any further call
/// fails with [`QueryError::Exhausted`].
pub struct ElementCursor {
    storage: Arc<dyn ElementStorage>,
    plan: Arc<QueryPlan>,
    page_size: u64,
    next_offset: u64,
    remaining: Option<u64>,
    buffer: VecDeque<Element>,
    state: CursorState,
    yielded: u64,
}

impl std::fmt::Debug for ElementCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementCursor")
            .field("page_size", &self.page_size)
            .field("next_offset", &self.next_offset)
            .field("remaining", &self.remaining)
            .field("buffered", &self.buffer.len())
            .field("state", &self.state)
            .finish()
    }
}

impl ElementCursor {
    pub fn new(storage: Arc<dyn ElementStorage>, plan: Arc<QueryPlan>, page_size: u64) -> Self {
        let pagination = plan.pagination();
        Self {
            storage,
            page_size: page_size.max(1),
            next_offset: pagination.start(),
            remaining: pagination.limit,
            buffer: VecDeque::new(),
            state: CursorState::Open,
            yielded: 0,
            plan,
        }
    }

    /// Next element, or `None` once the window is consumed
    pub async fn next(&mut self) -> Result<Option<Element>> {
        if self.state == CursorState::Finished {
            return Err(QueryError::exhausted(format!(
                "cursor already consumed after {} elements",
                self.yielded
            )));
        }

        if self.buffer.is_empty() && self.state == CursorState::Open {
            self.fetch_next_page().await?;
        }

        match self.buffer.pop_front() {
            Some(element) => {
                self.yielded += 1;
                Ok(Some(element))
            }
            None => {
                self.state = CursorState::Finished;
                Ok(None)
            }
        }
    }

    /// Drain every remaining element
    pub async fn collect_remaining(&mut self) -> Result<Vec<Element>> {
        let mut elements = Vec::new();
        while let Some(element) = self.next().await? {
            elements.push(element);
        }
        Ok(elements)
    }

    pub fn is_finished(&self) -> bool {
        self.state == CursorState::Finished
    }

    /// Adapt the cursor into a stream that ends after the last element
    pub fn into_stream(self) -> impl Stream<Item = Result<Element>> {
        futures::stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            match cursor.next().await {
                Ok(Some(element)) => Some((Ok(element), Some(cursor))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let limit = match self.remaining {
            Some(0) => {
                self.state = CursorState::Drained;
                return Ok(());
            }
            Some(remaining) => remaining.min(self.page_size),
            None => self.page_size,
        };

        let page = self
            .storage
            .fetch_page(&self.plan, self.next_offset, limit)
            .await?;
        let fetched = page.len() as u64;

        debug!(
            element_type = %self.plan.element_type(),
            offset = self.next_offset,
            limit,
            fetched,
            "Fetched cursor page"
        );

        self.next_offset += fetched;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining = remaining.saturating_sub(fetched);
        }
        if fetched < limit {
            self.state = CursorState::Drained;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element_query::storage::InMemoryStorage;
    use crate::models::ElementType;
    use crate::query_builder::Pagination;
    use futures::StreamExt;

    fn storage(count: i64) -> Arc<InMemoryStorage> {
        Arc::new(InMemoryStorage::new(
            (1..=count)
                .map(|id| Element::new(id, ElementType::Entry))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_pages_through_all_elements() {
        let storage = storage(5);
        let plan = Arc::new(QueryPlan::new(ElementType::Entry));
        let mut cursor = ElementCursor::new(storage.clone(), plan, 2);

        let elements = cursor.collect_remaining().await.unwrap();
        assert_eq!(elements.len(), 5);
        assert_eq!(storage.fetch_count(), 3);
        assert!(cursor.is_finished());
    }

    #[tokio::test]
    async fn test_second_iteration_is_exhausted() {
        let storage = storage(1);
        let plan = Arc::new(QueryPlan::new(ElementType::Entry));
        let mut cursor = ElementCursor::new(storage, plan, 10);

        assert!(cursor.next().await.unwrap().is_some());
        assert!(cursor.next().await.unwrap().is_none());
        let err = cursor.next().await.unwrap_err();
        assert!(matches!(err, QueryError::Exhausted { .. }));
    }

    #[tokio::test]
    async fn test_respects_plan_window() {
        let storage = storage(10);
        let mut plan = QueryPlan::new(ElementType::Entry);
        plan.set_pagination(Pagination {
            limit: Some(3),
            offset: Some(4),
        });
        let mut cursor = ElementCursor::new(storage.clone(), Arc::new(plan), 2);

        let ids: Vec<i64> = cursor
            .collect_remaining()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![5, 6, 7]);
        assert_eq!(storage.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_stream_adapter() {
        let storage = storage(3);
        let plan = Arc::new(QueryPlan::new(ElementType::Entry));
        let stream = ElementCursor::new(storage, plan, 2).into_stream();

        let ids: Vec<i64> = stream.map(|r| r.unwrap().id).collect().await;
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
