//! Pagination helpers shared by list endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const MAX_PER_PAGE: i64 = 100;

/// Raw `page` / `per_page` query parameters.
///
/// Kept as text so malformed values fall back to defaults instead of failing
/// the request.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number, 1-indexed
    pub page: Option<String>,
    /// Items per page (1..=100)
    pub per_page: Option<String>,
}

/// Resolved pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// `None` when the client asked for the full list
    pub fn from_query(query: &PageQuery, default_per_page: i64) -> Option<Self> {
        if query.page.is_none() && query.per_page.is_none() {
            return None;
        }
        let page = query.page.as_deref().map(str::trim).unwrap_or("1").parse::<i64>();
        let per_page = query
            .per_page
            .as_deref()
            .map(str::trim)
            .map(|v| v.parse::<i64>())
            .unwrap_or(Ok(default_per_page));
        Some(match (page, per_page) {
            (Ok(page), Ok(per_page)) => Self::new(page, per_page),
            _ => Self::new(1, default_per_page),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Wrap an already-sliced page
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let total_pages = (total + pagination.per_page - 1) / pagination.per_page;
        Self {
            items,
            page: pagination.page,
            per_page: pagination.per_page,
            total,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }

    /// Slice a page out of a complete list
    pub fn from_vec(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(pagination.per_page as usize)
            .collect();
        Self::new(items, pagination, total)
    }
}

/// Either the full list or a page, depending on the query
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Paged(Page<T>),
}

impl<T> Listing<T> {
    pub fn paginate(all: Vec<T>, pagination: Option<Pagination>) -> Self {
        match pagination {
            Some(p) => Listing::Paged(Page::from_vec(all, p)),
            None => Listing::All(all),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_partial_page() {
        let all: Vec<i32> = (0..25).collect();
        let page = Page::from_vec(all, Pagination::new(3, 10));
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0], 20);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
        assert!(page.has_prev);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(Pagination::new(0, 500), Pagination { page: 1, per_page: 100 });
        assert_eq!(Pagination::new(-4, 0), Pagination { page: 1, per_page: 1 });
    }

    #[test]
    fn test_from_query() {
        let none = PageQuery::default();
        assert_eq!(Pagination::from_query(&none, 9), None);

        let query = PageQuery {
            page: Some("2".into()),
            per_page: None,
        };
        assert_eq!(Pagination::from_query(&query, 9), Some(Pagination::new(2, 9)));

        let bad = PageQuery {
            page: Some("two".into()),
            per_page: Some("5".into()),
        };
        assert_eq!(Pagination::from_query(&bad, 9), Some(Pagination::new(1, 9)));
    }

    #[test]
    fn test_huge_page_number_is_empty() {
        let query = PageQuery {
            page: Some(i64::MAX.to_string()),
            per_page: Some("10".into()),
        };
        let pagination = Pagination::from_query(&query, 9).unwrap();
        assert_eq!(pagination.offset(), i64::MAX);

        let page = Page::from_vec((0..25).collect::<Vec<i32>>(), pagination);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 25);
        assert!(!page.has_next);
    }

    #[test]
    fn test_empty_total() {
        let page: Page<i32> = Page::from_vec(vec![], Pagination::new(1, 10));
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }
}
