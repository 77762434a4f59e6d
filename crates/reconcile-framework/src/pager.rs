//! # Pager
//!
//! Drives a page-numbered list endpoint as a lazy [`Stream`] of records.
//!
//! Traversal: request page 1, yield its items, stop when
//! `current_page >= total_pages`, otherwise request `next_page`. Pages are only
//! fetched when the consumer polls past the items already yielded, so stopping early
//! (e.g. on the first match) issues no further requests; dropping the stream is all
//! the cleanup there is. Every call to [`search`] starts again from page 1.
//!
//! An error aborts the stream after it is yielded. Items yielded before it stay valid.
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//!
//! let names: Vec<_> = pager::search(client.as_ref(), &ctx, "agent_pools", query)
//!     .map_ok(|record| record.id)
//!     .try_collect()
//!     .await?;
//! ```

use crate::cancel::CallContext;
use crate::client::{ApiClient, ListQuery, WireRecord};
use crate::error::ApiError;
use futures::future;
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

/// Lazily walks every page of `kind` matching `query`.
pub fn search<'a, C>(
    client: &'a C,
    ctx: &'a CallContext,
    kind: &'a str,
    query: ListQuery,
) -> impl Stream<Item = Result<WireRecord, ApiError>> + Send + 'a
where
    C: ApiClient + ?Sized,
{
    stream::try_unfold((Some(1u32), query), move |(next, query)| async move {
        let Some(page_number) = next else {
            return Ok(None);
        };
        debug!(kind, page = page_number, organization = %query.organization, "List page");
        let page = ctx.run(client.list(kind, &query, page_number)).await?;

        let next = if page.is_last() {
            None
        } else {
            match page.next_page {
                Some(n) if n > page.current_page => Some(n),
                other => {
                    return Err(ApiError::Transient(format!(
                        "page cursor did not advance past page {} (next page {:?})",
                        page.current_page, other
                    )))
                }
            }
        };
        Ok(Some((page.items, (next, query))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
    .try_flatten()
}

/// Returns the first record whose `name_attribute` equals `name` exactly.
///
/// The name is also sent as the server-side search hint to keep the walk short.
pub async fn find_by_name<C>(
    client: &C,
    ctx: &CallContext,
    kind: &str,
    query: ListQuery,
    name_attribute: &str,
    name: &str,
) -> Result<Option<WireRecord>, ApiError>
where
    C: ApiClient + ?Sized,
{
    let query = query.with_search(name);
    let matches = search(client, ctx, kind, query)
        .try_filter(|record| future::ready(record.attributes.get_str(name_attribute) == Some(name)));
    let mut matches = std::pin::pin!(matches);
    matches.try_next().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Page;
    use crate::mock::{MockApiClient, RecordedCall};
    use crate::record::Attributes;

    fn named(id: &str, name: &str) -> WireRecord {
        WireRecord::new(id, Attributes::new().with("name", name))
    }

    fn page(items: Vec<WireRecord>, current: u32, total: u32) -> Page<WireRecord> {
        Page {
            items,
            current_page: current,
            total_pages: total,
            next_page: (current < total).then_some(current + 1),
        }
    }

    fn requested_pages(mock: &MockApiClient) -> Vec<u32> {
        mock.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::List { page, .. } => Some(page),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_yields_all_pages_in_order_without_extra_request() {
        let mock = MockApiClient::new();
        mock.expect_list(1).return_ok(page(vec![named("a-1", "one"), named("a-2", "two")], 1, 3));
        mock.expect_list(2).return_ok(page(vec![named("a-3", "three"), named("a-4", "four")], 2, 3));
        mock.expect_list(3).return_ok(page(vec![named("a-5", "five")], 3, 3));

        let ctx = CallContext::new();
        let ids: Vec<String> = search(&mock, &ctx, "agent_pools", ListQuery::new("acme"))
            .map_ok(|r| r.id.to_string())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ids, vec!["a-1", "a-2", "a-3", "a-4", "a-5"]);
        assert_eq!(requested_pages(&mock), vec![1, 2, 3]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_early_stop_does_not_fetch_remaining_pages() {
        let mock = MockApiClient::new();
        mock.expect_list(1).return_ok(page(vec![named("a-1", "one")], 1, 2));
        mock.expect_list(2).return_ok(page(vec![named("a-2", "wanted")], 2, 2));

        let ctx = CallContext::new();
        let found = find_by_name(&mock, &ctx, "agent_pools", ListQuery::new("acme"), "name", "wanted")
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.id.to_string()), Some("a-2".to_string()));
        mock.verify();

        // A match on page 1 leaves page 2 untouched.
        let mock = MockApiClient::new();
        mock.expect_list(1).return_ok(page(vec![named("a-1", "wanted")], 1, 2));
        let found = find_by_name(&mock, &ctx, "agent_pools", ListQuery::new("acme"), "name", "wanted")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(requested_pages(&mock), vec![1]);
        mock.verify();
    }

    #[tokio::test]
    async fn test_error_mid_traversal_keeps_earlier_items() {
        let mock = MockApiClient::new();
        mock.expect_list(1).return_ok(page(vec![named("a-1", "one")], 1, 2));
        mock.expect_list(2).return_err(ApiError::Transient("503".into()));

        let ctx = CallContext::new();
        let stream = search(&mock, &ctx, "agent_pools", ListQuery::new("acme"));
        let mut stream = std::pin::pin!(stream);

        let first = stream.try_next().await.unwrap();
        assert_eq!(first.map(|r| r.id.to_string()), Some("a-1".to_string()));
        assert_eq!(stream.try_next().await, Err(ApiError::Transient("503".into())));
        mock.verify();
    }

    #[tokio::test]
    async fn test_fresh_search_restarts_from_first_page() {
        let mock = MockApiClient::new();
        for _ in 0..2 {
            mock.expect_list(1).return_ok(page(vec![named("a-1", "one")], 1, 1));
        }
        let ctx = CallContext::new();
        for _ in 0..2 {
            let items: Vec<WireRecord> = search(&mock, &ctx, "agent_pools", ListQuery::new("acme"))
                .try_collect()
                .await
                .unwrap();
            assert_eq!(items.len(), 1);
        }
        assert_eq!(requested_pages(&mock), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_stalled_cursor_is_an_error() {
        let mock = MockApiClient::new();
        mock.expect_list(1).return_ok(Page {
            items: vec![],
            current_page: 1,
            total_pages: 4,
            next_page: Some(1),
        });
        let ctx = CallContext::new();
        let result: Result<Vec<WireRecord>, ApiError> =
            search(&mock, &ctx, "agent_pools", ListQuery::new("acme")).try_collect().await;
        assert!(matches!(result, Err(ApiError::Transient(_))));
    }
}
