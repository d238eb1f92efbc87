use serde::{Deserialize, Serialize};

use crate::{
    constants::{MAX_COUNT_PER_PAGE, RECIPE_COUNT_PER_PAGE},
    error::{ApiError, FieldErrors},
};

/// `page` / `limit` query parameters, 1-based pages.
#[derive(Deserialize, Debug, Clone, Copy, Default)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64) -> Self {
        Self { page, limit }
    }

    pub fn from_query(query: PageQuery, default_limit: i64) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let page = query.page.unwrap_or(1);
        if page < 1 {
            errors.add("page", "Page must be a positive integer.");
        }

        let limit = query.limit.unwrap_or(default_limit);
        if !(1..=MAX_COUNT_PER_PAGE).contains(&limit) {
            errors.add(
                "limit",
                format!("Limit must be between 1 and {MAX_COUNT_PER_PAGE}."),
            );
        }

        if page >= 1 && errors.is_empty() && (page - 1).checked_mul(limit).is_none() {
            errors.add("page", "Page is out of range.");
        }

        errors.into_result(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// `base_path` may already carry filter parameters.
    fn link(&self, base_path: &str, page: i64) -> String {
        let separator = if base_path.contains('?') { '&' } else { '?' };
        format!("{base_path}{separator}page={page}&limit={}", self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, RECIPE_COUNT_PER_PAGE)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// An empty page past the first one is a 404.
    pub fn from_rows(
        rows: Vec<T>,
        total_rows: i64,
        pagination: Pagination,
        base_path: &str,
    ) -> Result<Self, ApiError> {
        if rows.is_empty() {
            if pagination.page == 1 {
                return Ok(Self::no_rows());
            }
            return Err(ApiError::NotFound(String::from("Invalid page.")));
        }

        let next = (pagination.offset() + (rows.len() as i64) < total_rows)
            .then(|| pagination.link(base_path, pagination.page + 1));
        let previous =
            (pagination.page > 1).then(|| pagination.link(base_path, pagination.page - 1));

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageContext<U> {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_links_both_ways() {
        let page =
            PageContext::from_rows(vec![1, 2], 6, Pagination::new(2, 2), "/api/recipes/").unwrap();

        assert_eq!(page.count, 6);
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?page=3&limit=2"));
        assert_eq!(page.previous.as_deref(), Some("/api/recipes/?page=1&limit=2"));
    }

    #[test]
    fn links_keep_filter_parameters() {
        let page =
            PageContext::from_rows(vec![1], 4, Pagination::new(1, 1), "/api/recipes/?author=3")
                .unwrap();
        assert_eq!(page.next.as_deref(), Some("/api/recipes/?author=3&page=2&limit=1"));
    }

    #[test]
    fn last_page_has_no_next() {
        let page =
            PageContext::from_rows(vec![5], 5, Pagination::new(3, 2), "/api/recipes/").unwrap();
        assert!(page.next.is_none());
        assert!(page.previous.is_some());
    }

    #[test]
    fn empty_first_page() {
        let page: PageContext<i32> =
            PageContext::from_rows(vec![], 0, Pagination::default(), "/api/recipes/").unwrap();
        assert_eq!(page.count, 0);
        assert!(page.next.is_none() && page.previous.is_none());
    }

    #[test]
    fn empty_page_past_the_end_is_not_found() {
        let result: Result<PageContext<i32>, ApiError> =
            PageContext::from_rows(vec![], 0, Pagination::new(4, 6), "/api/recipes/");
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(MAX_COUNT_PER_PAGE + 1),
        };
        match Pagination::from_query(query, 6) {
            Err(ApiError::Validation(errors)) => {
                assert!(errors.contains("page"));
                assert!(errors.contains("limit"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_pages_past_the_offset_range() {
        let query = PageQuery {
            page: Some(i64::MAX),
            limit: None,
        };
        match Pagination::from_query(query, 6) {
            Err(ApiError::Validation(errors)) => assert!(errors.contains("page")),
            other => panic!("unexpected {other:?}"),
        }

        let last = i64::MAX / 6 + 1;
        let pagination = Pagination::from_query(
            PageQuery {
                page: Some(last),
                limit: Some(6),
            },
            6,
        )
        .unwrap();
        assert_eq!(pagination.offset(), (last - 1) * 6);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Pagination::new(1, 6).offset(), 0);
        assert_eq!(Pagination::new(3, 6).offset(), 12);
    }
}
