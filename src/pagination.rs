use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const QUESTIONS_PER_PAGE: u32 = 10;
pub const ANSWERS_PER_PAGE: u32 = 10;
pub const USERS_PER_PAGE: u32 = 8;
pub const TAGS_PER_PAGE: u32 = 10;
pub const CATEGORIES_PER_PAGE: u32 = 10;

/// Pagination
///
/// The `?page=` query parameter accepted by every listing endpoint.
/// Missing, zero or negative values all mean the first page.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number.
    pub page: Option<i64>,
}

impl Pagination {
    pub fn page(&self) -> u32 {
        self.page
            .map(|p| p.clamp(1, u32::MAX as i64) as u32)
            .unwrap_or(1)
    }
}

/// PageRequest
///
/// A resolved page number plus the fixed page size of the entity being listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    /// Cuts one page out of an already ordered, complete collection.
    pub fn slice<T>(&self, all: Vec<T>) -> Page<T> {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.per_page as usize)
            .collect();
        Page::new(items, *self, total)
    }
}

/// Page
///
/// Listing envelope. An out-of-range page carries an empty `items` list with the
/// real totals.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(request.per_page as u64) as u32;
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total,
            total_pages,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_below_one_is_first_page() {
        assert_eq!(Pagination { page: None }.page(), 1);
        assert_eq!(Pagination { page: Some(0) }.page(), 1);
        assert_eq!(Pagination { page: Some(-4) }.page(), 1);
        assert_eq!(Pagination { page: Some(3) }.page(), 3);
    }

    #[test]
    fn offset_follows_page_size() {
        let req = PageRequest::new(3, 8);
        assert_eq!(req.offset(), 16);
        assert_eq!(req.limit(), 8);
    }

    #[test]
    fn slice_past_the_end_is_empty() {
        let page = PageRequest::new(4, 10).slice((0..25).collect::<Vec<_>>());
        assert!(page.is_empty());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn slice_of_empty_collection() {
        let page = PageRequest::new(1, 10).slice(Vec::<u8>::new());
        assert!(page.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
