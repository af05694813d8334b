use std::ops::Range;

pub const INVENTORY_PAGE_SIZE: usize = 3;
pub const SCAN_RESULTS_PAGE_SIZE: usize = 3;
pub const MANUAL_SELECTION_PAGE_SIZE: usize = 2;
pub const PROJECT_COMPONENTS_PAGE_SIZE: usize = 3;

/// Zero-based page cursor over a list whose length may change between draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn reset(&mut self) {
        self.page = 0;
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Index range for the current page, clamped if the list shrank.
    pub fn range(&self, total: usize) -> Range<usize> {
        let page = self.page.min(self.total_pages(total) - 1);
        let start = (page * self.page_size).min(total);
        let end = (start + self.page_size).min(total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }

    pub fn shows_controls(&self, total: usize) -> bool {
        total > self.page_size
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self, total: usize) -> bool {
        (self.page + 1) * self.page_size < total
    }

    pub fn next(&mut self, total: usize) -> bool {
        if !self.has_next(total) {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// `Page 2 / 5`.
    pub fn label(&self, total: usize) -> String {
        format!(
            "Page {} / {}",
            self.page.min(self.total_pages(total) - 1) + 1,
            self.total_pages(total)
        )
    }
}
