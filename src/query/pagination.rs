use serde::Serialize;

use crate::error::ApiError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_SIZE: i64 = 20;

/// 1-based page request. Constructed through `from_params` so every caller
/// gets the same bounds checks.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: i64,
    pub size: i64,
}

impl Pagination {
    pub fn from_params(page: Option<i64>, size: Option<i64>) -> Result<Self, ApiError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let size = size.unwrap_or(DEFAULT_SIZE);

        let mut errors = Vec::new();
        if page <= 0 {
            errors.push("Page must be greater than 0".to_string());
        }
        if size <= 0 {
            errors.push("Size must be greater than 0".to_string());
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(Self { page, size })
    }

    pub fn skip(&self) -> i64 {
        (self.page - 1) * self.size
    }
}

/// Uniform paginated envelope: `size` is the actual count returned, `total`
/// the full filtered count before pagination.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub page: i64,
    pub size: usize,
    pub total: i64,
    pub list: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(page: i64, total: i64, list: Vec<T>) -> Self {
        Self {
            page,
            size: list.len(),
            total,
            list,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            page: self.page,
            size: self.size,
            total: self.total,
            list: self.list.into_iter().map(f).collect(),
        }
    }
}
