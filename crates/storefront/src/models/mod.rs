//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row
//! types in [`crate::db`].

pub mod cart;
pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartLine};
pub use catalog::{Category, NewProduct, NewReview, Product, ProductFilter, Review};
pub use order::{NewOrder, NewOrderItem, Order, OrderDetail, OrderLine, OrderTotals};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User, UserFilter, UserSummary};

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    /// Page size used for the query.
    pub per_page: u32,
    /// Total number of matching items across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages needed to show `total` items (at least 1).
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 1;
        }
        let pages = self.total.div_ceil(u64::from(self.per_page));
        u32::try_from(pages).unwrap_or(u32::MAX).max(1)
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Row offset of the first item for a 1-based page number.
    #[must_use]
    pub fn offset(page: u32, per_page: u32) -> u64 {
        u64::from(page.max(1) - 1) * u64::from(per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total: u64) -> Page<()> {
        Page {
            items: Vec::new(),
            page,
            per_page: 10,
            total,
        }
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(page(1, 0).total_pages(), 1);
        assert_eq!(page(1, 10).total_pages(), 1);
        assert_eq!(page(1, 11).total_pages(), 2);
    }

    #[test]
    fn test_navigation_flags() {
        assert!(page(1, 25).has_next());
        assert!(!page(1, 25).has_prev());
        assert!(!page(3, 25).has_next());
        assert!(page(3, 25).has_prev());
    }

    #[test]
    fn test_offset_treats_zero_as_first_page() {
        assert_eq!(Page::<()>::offset(0, 12), 0);
        assert_eq!(Page::<()>::offset(3, 12), 24);
    }
}
