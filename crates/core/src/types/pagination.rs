//! Page windows over ordered collections.
//!
//! Pages are 1-based. A request for page 0 is treated as page 1, and a page
//! past the end is valid but empty: callers render "no products" rather than
//! an error.

use serde::{Deserialize, Serialize};

/// A request for one page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Build a request, clamping `page` and `per_page` to at least 1.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of items per page.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Number of items to skip: `(page - 1) * per_page`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Maximum number of items on this page.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// Navigation metadata for one page, as shown under a product grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub current_page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub next_page: u32,
    pub previous_page: u32,
    /// `ceil(total_items / per_page)`; 0 for an empty collection.
    pub last_page: u32,
}

impl PageWindow {
    /// Compute the window for `request` over a collection of `total_items`.
    #[must_use]
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let page = request.page();
        let per_page = u64::from(request.per_page());
        let last_page = u32::try_from(total_items.div_ceil(per_page)).unwrap_or(u32::MAX);

        Self {
            current_page: page,
            per_page: request.per_page(),
            total_items,
            has_next_page: per_page * u64::from(page) < total_items,
            has_previous_page: page > 1,
            next_page: page.saturating_add(1),
            previous_page: page - 1,
            last_page,
        }
    }
}

/// One page of items plus its navigation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    /// Assemble a page from already-sliced items.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            window: PageWindow::new(request, total_items),
        }
    }

    /// Slice an in-memory, already ordered collection.
    #[must_use]
    pub fn from_slice(all: &[T], request: PageRequest) -> Self
    where
        T: Clone,
    {
        let total = all.len() as u64;
        let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(request.limit()).unwrap_or(usize::MAX);
        let items = all.iter().skip(start).take(take).cloned().collect();
        Self::new(items, request, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn five() -> Vec<u32> {
        vec![1, 2, 3, 4, 5]
    }

    #[test]
    fn test_first_page() {
        let page = Page::from_slice(&five(), PageRequest::new(1, 2));
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.window.has_next_page);
        assert!(!page.window.has_previous_page);
        assert_eq!(page.window.last_page, 3);
        assert_eq!(page.window.next_page, 2);
    }

    #[test]
    fn test_last_partial_page() {
        let page = Page::from_slice(&five(), PageRequest::new(3, 2));
        assert_eq!(page.items, vec![5]);
        assert!(!page.window.has_next_page);
        assert!(page.window.has_previous_page);
        assert_eq!(page.window.previous_page, 2);
        assert_eq!(page.window.last_page, 3);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let page = Page::from_slice(&five(), PageRequest::new(9, 2));
        assert!(page.items.is_empty());
        assert!(!page.window.has_next_page);
        assert_eq!(page.window.total_items, 5);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let request = PageRequest::new(0, 2);
        assert_eq!(request.page(), 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_exact_multiple() {
        let window = PageWindow::new(PageRequest::new(2, 2), 4);
        assert_eq!(window.last_page, 2);
        assert!(!window.has_next_page);
    }

    #[test]
    fn test_empty_collection() {
        let window = PageWindow::new(PageRequest::new(1, 2), 0);
        assert_eq!(window.last_page, 0);
        assert!(!window.has_next_page);
        assert!(!window.has_previous_page);
    }

    proptest! {
        /// Walking every page from 1 to `last_page` visits each item exactly once.
        #[test]
        fn pages_partition_the_collection(total in 0usize..60, per_page in 1u32..7) {
            let all: Vec<usize> = (0..total).collect();
            let last = PageWindow::new(PageRequest::new(1, per_page), total as u64).last_page;

            let mut seen = Vec::new();
            for page in 1..=last {
                let slice = Page::from_slice(&all, PageRequest::new(page, per_page));
                prop_assert!(!slice.items.is_empty());
                prop_assert_eq!(slice.window.has_next_page, page < last);
                seen.extend(slice.items);
            }
            prop_assert_eq!(seen, all);
        }
    }
}
