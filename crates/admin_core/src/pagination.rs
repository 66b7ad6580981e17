//! Fixed-size client-side pages over the derived view.

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page_number: usize,
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// `ceil(count / page_size)`, never less than one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Slices page `page_number` (1-based). Does not clamp: an out-of-range page
/// yields no items and callers are expected to bounds-check.
pub fn paginate<T>(items: &[T], page_size: usize, page_number: usize) -> Page<'_, T> {
    let page_size = page_size.max(1);
    let start = page_number
        .saturating_sub(1)
        .saturating_mul(page_size)
        .min(items.len());
    let end = if page_number == 0 {
        start
    } else {
        start.saturating_add(page_size).min(items.len())
    };
    Page {
        items: &items[start..end],
        page_number,
        total_pages: total_pages(items.len(), page_size),
    }
}

/// Current page cursor. Navigation is bounds-checked here, not in `paginate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
    current: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// Returns whether the page changed; a no-op on the last page.
    pub fn next(&mut self, count: usize) -> bool {
        if self.current < total_pages(count, self.page_size) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Returns whether the page changed; a no-op on page 1.
    pub fn previous(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Rejects pages outside `[1, total_pages]`.
    pub fn go_to(&mut self, page_number: usize, count: usize) -> bool {
        if (1..=total_pages(count, self.page_size)).contains(&page_number) {
            self.current = page_number;
            true
        } else {
            false
        }
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> Page<'a, T> {
        paginate(items, self.page_size, self.current)
    }
}
