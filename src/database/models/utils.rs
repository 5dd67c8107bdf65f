use serde::Serialize;

/// One page of a paginated query
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_num: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_num: u64, page_size: u64, total_items: u64) -> Self {
        Self {
            items,
            page_num,
            page_size,
            total_items,
            total_pages: total_pages(total_items, page_size),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_num: self.page_num,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// Largest page a listing query may ask for
pub const MAX_PAGE_SIZE: u64 = 500;

/// Number of documents to skip for a 1-based page number
pub fn page_offset(page_num: u64, page_size: u64) -> u64 {
    page_num.saturating_sub(1).saturating_mul(page_size)
}

pub fn total_pages(total_items: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_items.div_ceil(page_size)
}
