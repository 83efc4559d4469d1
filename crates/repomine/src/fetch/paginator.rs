use std::future::Future;

use serde_json::Value;

use crate::api::{ApiClient, ApiError, ListPage, PageRequest, Query};

/// Page size used by every listing.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Turns a page-by-page listing into one ordered collection.
///
/// Page 1 is requested first and its reported page count decides what
/// follows: a count of 0 or 1 means page 1 already holds everything,
/// otherwise pages `2..=last` are fetched one after another and appended in
/// page order. Errors are returned unchanged; retrying is the caller's job.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Fetch every page through `fetch_page`.
    pub async fn fetch_all<T, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>, ApiError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<ListPage<T>, ApiError>>,
    {
        let first = fetch_page(PageRequest::new(1, self.per_page)).await?;
        let last_page = first.last_page;
        if last_page <= 1 {
            return Ok(first.items);
        }

        tracing::debug!(last_page, per_page = self.per_page, "Fetching remaining pages");

        let mut items = first.items;
        for page in 2..=last_page {
            let next = fetch_page(PageRequest::new(page, self.per_page)).await?;
            tracing::trace!(page, count = next.items.len(), "Fetched page");
            items.extend(next.items);
        }
        Ok(items)
    }

    /// Fetch every page of `route`.
    pub async fn fetch_route(
        &self,
        api: &dyn ApiClient,
        route: &str,
        query: &Query,
    ) -> Result<Vec<Value>, ApiError> {
        self.fetch_all(move |page| api.list_page(route, query, page))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FailureKind;
    use crate::testing::{FakeApi, page};
    use serde_json::json;

    /// Script `pages` pages of `size` items each, with a partial last page.
    fn script_listing(api: &FakeApi, route: &str, pages: u32, size: u32, remainder: u32) {
        let mut next = 0;
        for p in 1..=pages {
            let count = if p == pages { remainder } else { size };
            let items = (0..count)
                .map(|_| {
                    next += 1;
                    json!(next)
                })
                .collect();
            api.push_page(route, p, Ok(page(items, pages)));
        }
    }

    #[tokio::test]
    async fn test_fetch_route_is_complete_and_ordered() {
        let api = FakeApi::new();
        script_listing(&api, "/repos/o/r/commits", 4, 3, 2);

        let items = Paginator::new(3)
            .fetch_route(&api, "/repos/o/r/commits", &Query::new())
            .await
            .unwrap();

        // (P-1)*S + remainder, in page order, without duplicates.
        let expected: Vec<Value> = (1..=11).map(|n| json!(n)).collect();
        assert_eq!(items, expected);
        assert_eq!(
            api.calls(),
            vec![
                "/repos/o/r/commits#1",
                "/repos/o/r/commits#2",
                "/repos/o/r/commits#3",
                "/repos/o/r/commits#4"
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_pages_returns_first_page_items() {
        let api = FakeApi::new();
        api.push_page("/users/u/repos", 1, Ok(page(vec![json!("a"), json!("b")], 0)));

        let items = Paginator::default()
            .fetch_route(&api, "/users/u/repos", &Query::new())
            .await
            .unwrap();

        assert_eq!(items, vec![json!("a"), json!("b")]);
        assert_eq!(api.calls(), vec!["/users/u/repos#1"]);
    }

    #[tokio::test]
    async fn test_single_page_issues_one_request() {
        let api = FakeApi::new();
        api.push_page("/x", 1, Ok(page(vec![json!(1)], 1)));

        let items = Paginator::default()
            .fetch_route(&api, "/x", &Query::new())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_error_mid_listing_is_propagated_unchanged() {
        let api = FakeApi::new();
        api.push_page("/x", 1, Ok(page(vec![json!(1)], 3)));
        api.push_page("/x", 2, Err(ApiError::status(403, "rate limited")));

        let err = Paginator::default()
            .fetch_route(&api, "/x", &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(403));
        assert_eq!(err.kind(), FailureKind::QuotaExhausted);
        // Page 3 is never requested.
        assert_eq!(api.calls(), vec!["/x#1", "/x#2"]);
    }

    #[tokio::test]
    async fn test_huge_reported_page_count_fails_on_first_bad_page() {
        let api = FakeApi::new();
        api.push_page("/x", 1, Ok(page(vec![json!(1)], u32::MAX)));
        api.push_page("/x", 2, Err(ApiError::status(500, "server error")));

        let err = Paginator::default()
            .fetch_route(&api, "/x", &Query::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(500));
        assert_eq!(api.calls(), vec!["/x#1", "/x#2"]);
    }

    #[tokio::test]
    async fn test_fetch_all_passes_page_size() {
        let mut seen = Vec::new();
        let items: Vec<u32> = Paginator::new(50)
            .fetch_all(|req| {
                seen.push(req);
                async move {
                    Ok(ListPage {
                        items: vec![req.page],
                        last_page: 2,
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(items, vec![1, 2]);
        assert_eq!(seen, vec![PageRequest::new(1, 50), PageRequest::new(2, 50)]);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        assert_eq!(Paginator::new(0).per_page(), 1);
    }
}
