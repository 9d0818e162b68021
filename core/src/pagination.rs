//! Fetch-all pagination.
//!
//! # Design
//! OZmap list endpoints answer with a `Page` envelope. Two ways of walking
//! it are supported:
//!
//! - `Cursor`: keep following the server's `nextUrl` while `hasNextPage`.
//! - `PageIncrement`: ask for page 1, 2, 3... until a page comes back empty.
//!
//! `Accumulator` holds the decision logic and the collected rows so the
//! client loop only performs I/O. A page cap protects against a server that
//! never signals the end.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// How fetch-all walks the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStrategy {
    #[default]
    Cursor,
    PageIncrement,
}

impl FromStr for PaginationStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cursor" | "next_url" => Ok(PaginationStrategy::Cursor),
            "page" | "page_increment" => Ok(PaginationStrategy::PageIncrement),
            other => Err(Error::Configuration(format!("unknown pagination strategy: {other}"))),
        }
    }
}

/// Pagination envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub rows: Vec<T>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub next_url: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Every row collected by a fetch-all, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAll<T> {
    pub rows: Vec<T>,
}

/// What the fetch-all loop should request next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Follow a server-provided path (relative to the base URL).
    Cursor(String),
    /// Request this page number.
    Number(u32),
    Done,
}

/// Collects rows page by page and decides when to stop.
#[derive(Debug)]
pub struct Accumulator<T> {
    strategy: PaginationStrategy,
    max_pages: Option<u32>,
    rows: Vec<T>,
    requests: u32,
    page: u32,
}

impl<T> Accumulator<T> {
    pub fn new(strategy: PaginationStrategy, max_pages: Option<u32>) -> Self {
        Self {
            strategy,
            max_pages,
            rows: Vec::new(),
            requests: 0,
            page: 1,
        }
    }

    /// Page number of the first request, if the strategy numbers pages.
    pub fn first_page(&self) -> Option<u32> {
        match self.strategy {
            PaginationStrategy::Cursor => None,
            PaginationStrategy::PageIncrement => Some(1),
        }
    }

    /// Number of pages absorbed so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Take in one page and decide the next request.
    pub fn absorb(&mut self, page: Page<T>) -> Result<NextPage> {
        self.requests += 1;
        let next = match self.strategy {
            PaginationStrategy::Cursor => {
                self.rows.extend(page.rows);
                match (page.has_next_page, page.next_url) {
                    (true, Some(url)) => NextPage::Cursor(url),
                    (true, None) => {
                        log::warn!("[PAGINATION] Server reported another page without a nextUrl; stopping");
                        NextPage::Done
                    }
                    (false, _) => NextPage::Done,
                }
            }
            PaginationStrategy::PageIncrement => {
                // A short page is not the end; only an empty one is.
                if page.rows.is_empty() {
                    NextPage::Done
                } else {
                    self.rows.extend(page.rows);
                    self.page += 1;
                    NextPage::Number(self.page)
                }
            }
        };

        if let Some(limit) = self.max_pages {
            if next != NextPage::Done && self.requests >= limit {
                return Err(Error::PageLimitExceeded { pages: self.requests });
            }
        }
        Ok(next)
    }

    pub fn finish(self) -> FetchAll<T> {
        FetchAll { rows: self.rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: usize, next: Option<&str>) -> Page<usize> {
        Page {
            rows: (0..rows).collect(),
            has_next_page: next.is_some(),
            next_url: next.map(str::to_string),
        }
    }

    #[test]
    fn page_increment_stops_on_first_empty_page() {
        let mut acc = Accumulator::new(PaginationStrategy::PageIncrement, None);
        assert_eq!(acc.first_page(), Some(1));
        assert_eq!(acc.absorb(page(500, None)).unwrap(), NextPage::Number(2));
        assert_eq!(acc.absorb(page(500, None)).unwrap(), NextPage::Number(3));
        assert_eq!(acc.absorb(page(137, None)).unwrap(), NextPage::Number(4));
        assert_eq!(acc.absorb(page(0, None)).unwrap(), NextPage::Done);
        assert_eq!(acc.requests(), 4);
        assert_eq!(acc.finish().rows.len(), 1137);
    }

    #[test]
    fn cursor_follows_next_url_until_has_next_page_is_false() {
        let mut acc = Accumulator::new(PaginationStrategy::Cursor, None);
        assert_eq!(acc.first_page(), None);
        assert_eq!(
            acc.absorb(page(2, Some("/api/v2/boxes?cursor=1"))).unwrap(),
            NextPage::Cursor("/api/v2/boxes?cursor=1".to_string())
        );
        assert_eq!(
            acc.absorb(page(2, Some("/api/v2/boxes?cursor=2"))).unwrap(),
            NextPage::Cursor("/api/v2/boxes?cursor=2".to_string())
        );
        assert_eq!(acc.absorb(page(1, None)).unwrap(), NextPage::Done);
        assert_eq!(acc.finish().rows, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn cursor_without_next_url_stops() {
        let mut acc = Accumulator::<usize>::new(PaginationStrategy::Cursor, None);
        let broken = Page {
            rows: vec![1],
            has_next_page: true,
            next_url: None,
        };
        assert_eq!(acc.absorb(broken).unwrap(), NextPage::Done);
    }

    #[test]
    fn page_cap_aborts_endless_pagination() {
        let mut acc = Accumulator::new(PaginationStrategy::PageIncrement, Some(2));
        acc.absorb(page(1, None)).unwrap();
        let err = acc.absorb(page(1, None)).unwrap_err();
        assert!(matches!(err, Error::PageLimitExceeded { pages: 2 }));
    }

    #[test]
    fn page_cap_allows_terminating_on_the_last_allowed_page() {
        let mut acc = Accumulator::new(PaginationStrategy::Cursor, Some(1));
        assert_eq!(acc.absorb(page(3, None)).unwrap(), NextPage::Done);
    }

    #[test]
    fn page_envelope_defaults_missing_fields() {
        let page: Page<serde_json::Value> = serde_json::from_str("{}").unwrap();
        assert!(page.rows.is_empty());
        assert!(!page.has_next_page);
        assert!(page.next_url.is_none());

        let page: Page<u32> = serde_json::from_str(r#"{"rows":null}"#).unwrap();
        assert!(page.rows.is_empty());

        let page: Page<u32> =
            serde_json::from_str(r#"{"rows":[1,2],"hasNextPage":true,"nextUrl":"/api/v2/x?page=2"}"#).unwrap();
        assert_eq!(page.rows, vec![1, 2]);
        assert!(page.has_next_page);
        assert_eq!(page.next_url.as_deref(), Some("/api/v2/x?page=2"));
    }

    #[test]
    fn strategy_parses_env_values() {
        assert_eq!("cursor".parse::<PaginationStrategy>().unwrap(), PaginationStrategy::Cursor);
        assert_eq!("page".parse::<PaginationStrategy>().unwrap(), PaginationStrategy::PageIncrement);
        assert!("offset".parse::<PaginationStrategy>().is_err());
    }
}
