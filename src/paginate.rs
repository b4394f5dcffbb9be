pub const DEFAULT_PER_PAGE: usize = 50;

/// One-based page cursor. Out-of-range pages are corrected, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: usize,
    per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(current_page: usize, per_page: usize) -> Self {
        let mut pagination = Self::default();
        pagination.set_per_page(per_page);
        pagination.set_page(current_page);
        pagination
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// `ceil(count / per_page)`; zero for an empty sequence.
    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.per_page)
    }

    /// Page count for display, never below one.
    pub fn display_pages(&self, count: usize) -> usize {
        self.total_pages(count).max(1)
    }

    /// Sets the requested page; it is clamped against the count on the next `clamp`/`slice`.
    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Zero falls back to the default page size.
    pub fn set_per_page(&mut self, per_page: usize) {
        self.per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
    }

    pub fn clamp(&mut self, count: usize) {
        self.current_page = self.current_page.clamp(1, self.display_pages(count));
    }

    pub fn next_page(&mut self, count: usize) {
        self.clamp(count);
        if self.current_page < self.display_pages(count) {
            self.current_page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        if self.current_page > 1 {
            self.current_page -= 1;
        }
    }

    /// Clamps the cursor against `items`, then returns that page.
    pub fn slice<'s, T>(&mut self, items: &'s [T]) -> &'s [T] {
        self.clamp(items.len());
        let start = (self.current_page - 1) * self.per_page;
        let end = (start + self.per_page).min(items.len());
        items.get(start..end).unwrap_or(&[])
    }

    /// Index range of the current page, for "showing x–y of n" footers.
    pub fn bounds(&self, count: usize) -> (usize, usize) {
        if count == 0 {
            return (0, 0);
        }
        let start = (self.current_page - 1) * self.per_page;
        (start.min(count), (start + self.per_page).min(count))
    }
}
