//! Cursor-based traversal of the service's paged collections.
//!
//! Every collection endpoint answers with `{"items": [...], "links": {"next": ...}}`.
//! [`PageCursor`] flattens that into one lazy stream of items: a page is only
//! requested once every item of the previous page has been handed out, so a
//! consumer that stops early never pays for the pages it did not read.
//!
//! There is no cycle detection. A server that keeps returning a `next` link
//! keeps the cursor going.

use std::collections::VecDeque;

use serde::Deserialize;
use serde_json::Value;

use crate::api::{ApiError, PageSource};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

pub struct PageCursor<'a, S: PageSource + ?Sized> {
    source: &'a S,
    next_path: Option<String>,
    buffered: VecDeque<Value>,
}

impl<'a, S: PageSource + ?Sized> PageCursor<'a, S> {
    pub fn new(source: &'a S, start_path: impl Into<String>) -> Self {
        Self {
            source,
            next_path: Some(start_path.into()),
            buffered: VecDeque::new(),
        }
    }
}

impl<S: PageSource + ?Sized> Iterator for PageCursor<'_, S> {
    type Item = Result<Value, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Some(Ok(item));
            }
            let path = self.next_path.take()?;
            tracing::debug!(%path, "fetching page");
            match self.source.fetch_page(&path) {
                Ok(page) => {
                    self.buffered.extend(page.items);
                    self.next_path = page.links.next.filter(|next| !next.is_empty());
                }
                Err(error) => return Some(Err(error)),
            }
        }
    }
}

pub fn traverse<'a, S: PageSource + ?Sized>(
    source: &'a S,
    start_path: impl Into<String>,
) -> PageCursor<'a, S> {
    PageCursor::new(source, start_path)
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use serde_json::Value;

    use super::Page;
    use crate::api::{ApiError, PageSource};

    /// Serves canned JSON bodies by path and records every request.
    #[derive(Default)]
    pub struct MockSource {
        pages: HashMap<String, Value>,
        pub fetched: RefCell<Vec<String>>,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, path: &str, body: Value) -> Self {
            self.pages.insert(path.to_string(), body);
            self
        }

        pub fn fetch_count(&self) -> usize {
            self.fetched.borrow().len()
        }
    }

    impl PageSource for MockSource {
        fn fetch_page(&self, path: &str) -> Result<Page, ApiError> {
            self.fetched.borrow_mut().push(path.to_string());
            match self.pages.get(path) {
                Some(body) => Ok(serde_json::from_value(body.clone())?),
                None => Err(ApiError::RequestFailed {
                    status: 404,
                    path: path.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockSource;
    use super::*;
    use serde_json::json;

    fn two_pages() -> MockSource {
        MockSource::new()
            .with(
                "room",
                json!({"items": ["a", "b"], "links": {"next": "https://x/v2/room?start-index=2"}}),
            )
            .with("https://x/v2/room?start-index=2", json!({"items": ["c"], "links": {}}))
    }

    #[test]
    fn yields_every_item_across_pages_in_order() {
        let source = two_pages();
        let items: Vec<Value> = traverse(&source, "room")
            .collect::<Result<_, _>>()
            .expect("items");
        assert_eq!(items, vec![json!("a"), json!("b"), json!("c")]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn next_page_is_not_fetched_until_needed() {
        let source = two_pages();
        let mut cursor = traverse(&source, "room");
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_some());
        assert_eq!(source.fetch_count(), 1);
        assert!(cursor.next().is_some());
        assert_eq!(source.fetch_count(), 2);
        assert!(cursor.next().is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn bounded_chain_completes_in_exactly_n_fetches() {
        let mut source = MockSource::new();
        let n = 5;
        for i in 0..n {
            let next = if i + 1 < n { json!(format!("p{}", i + 1)) } else { Value::Null };
            source = source.with(&format!("p{i}"), json!({"items": [i], "links": {"next": next}}));
        }
        let count = traverse(&source, "p0").filter(Result::is_ok).count();
        assert_eq!(count, n);
        assert_eq!(source.fetch_count(), n);
    }

    #[test]
    fn empty_page_with_next_link_is_followed() {
        let source = MockSource::new()
            .with("p0", json!({"items": [], "links": {"next": "p1"}}))
            .with("p1", json!({"items": [1]}));
        let items: Vec<Value> = traverse(&source, "p0").map(|item| item.expect("item")).collect();
        assert_eq!(items, vec![json!(1)]);
    }

    #[test]
    fn error_ends_the_traversal() {
        let source = MockSource::new().with("p0", json!({"items": [1], "links": {"next": "missing"}}));
        let mut cursor = traverse(&source, "p0");
        assert!(matches!(cursor.next(), Some(Ok(_))));
        assert!(matches!(
            cursor.next(),
            Some(Err(ApiError::RequestFailed { status: 404, .. }))
        ));
        assert!(cursor.next().is_none());
        assert_eq!(source.fetch_count(), 2);
    }
}
