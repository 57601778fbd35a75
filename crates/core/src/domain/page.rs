use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, size: DEFAULT_PAGE_SIZE }
    }
}

impl PageRequest {
    /// Builds a request from optional query values, clamping both to at least 1.
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self { page: page.unwrap_or(1).max(1), size: size.unwrap_or(DEFAULT_PAGE_SIZE).max(1) }
    }

    pub fn offset(&self) -> u32 {
        self.size.saturating_mul(self.page.saturating_sub(1))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_pages: u32,
    pub page: u32,
    pub total_results: u64,
    pub page_size: u32,
}

impl PageMeta {
    pub fn new(request: PageRequest, total_results: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = u32::try_from(total_results.div_ceil(size)).unwrap_or(u32::MAX);
        Self { total_pages, page: request.page, total_results, page_size: request.size }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_results: u64) -> Self {
        Self { items, page_meta: PageMeta::new(request, total_results) }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), page_meta: self.page_meta }
    }
}
