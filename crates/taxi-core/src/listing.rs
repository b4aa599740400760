//! # Search and Pagination
//!
//! List views filter on a single text field and then paginate.
//!
//! Filtering is a case-insensitive substring match; an absent or blank
//! query matches everything. Pages are 1-based. An empty collection still
//! has one (empty) page, but any page past the last is an error.

use serde::Serialize;

use crate::error::ValidationError;

/// A record that list views can filter by one text field.
pub trait Searchable {
    /// The text the list view's search parameter is matched against.
    fn search_key(&self) -> &str;
}

/// Whether `haystack` contains `query`, ignoring case.
///
/// Blank queries match everything.
pub fn matches_query(haystack: &str, query: Option<&str>) -> bool {
    match query.map(str::trim) {
        None | Some("") => true,
        Some(q) => haystack.to_lowercase().contains(&q.to_lowercase()),
    }
}

/// Keep the records whose search key matches `query`, ordered by search key
/// ignoring case.
pub fn filter_sorted<T: Searchable>(records: Vec<T>, query: Option<&str>) -> Vec<T> {
    let mut matched: Vec<T> = records
        .into_iter()
        .filter(|r| matches_query(r.search_key(), query))
        .collect();
    matched.sort_by_cached_key(|r| (r.search_key().to_lowercase(), r.search_key().to_string()));
    matched
}

/// One page of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Records on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    /// Number of pages, at least 1.
    pub num_pages: usize,
    /// Number of records across all pages.
    pub total: usize,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Slice `items` into pages of `per_page` and return page `page`.
    ///
    /// A `per_page` of zero is treated as one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PageOutOfRange`] for page 0 or a page
    /// past the last.
    pub fn paginate(items: Vec<T>, page: usize, per_page: usize) -> Result<Self, ValidationError> {
        let per_page = per_page.max(1);
        let total = items.len();
        let num_pages = total.div_ceil(per_page).max(1);

        if page == 0 || page > num_pages {
            return Err(ValidationError::PageOutOfRange { page, num_pages });
        }

        let start = (page - 1) * per_page;
        let items: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

        Ok(Self {
            items,
            page,
            num_pages,
            total,
            has_next: page < num_pages,
            has_previous: page > 1,
        })
    }

    /// Transform every item on the page.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            num_pages: self.num_pages,
            total: self.total,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}
