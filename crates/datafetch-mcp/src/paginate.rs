//! Page slicing over normalized records

use crate::types::{PageRequest, Record};

/// One page of records plus totals
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub total_records: usize,
    pub current_page: u32,
    pub total_pages: usize,
}

/// Slice `records` to the requested page.
///
/// Pages past the end yield an empty slice, not an error. `total_pages` is at
/// least 1 even when there are no records.
#[must_use]
pub fn paginate(records: Vec<Record>, request: PageRequest) -> Page {
    let total_records = records.len();
    let page_size = request.page_size() as usize;
    let total_pages = total_records.div_ceil(page_size).max(1);

    let start = (request.page() as usize - 1).saturating_mul(page_size);
    let page_records = if start >= total_records {
        Vec::new()
    } else {
        records.into_iter().skip(start).take(page_size).collect()
    };

    Page {
        records: page_records,
        total_records,
        current_page: request.page(),
        total_pages,
    }
}
