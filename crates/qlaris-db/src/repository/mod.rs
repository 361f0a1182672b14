//! # Repository Module
//!
//! Database repository implementations for Qlaris.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Units of Work                       │
//! │                                                                         │
//! │  Service                                                                │
//! │       │                                                                 │
//! │       ├── db.categories().list_by_business(b)     pooled, one statement │
//! │       │                                                                 │
//! │       └── let mut uow = db.begin()                one connection        │
//! │             transaction::claim(uow.conn(), ..)                          │
//! │             product::increase_stock(uow.conn(), ..)                     │
//! │             uow.commit()                                                │
//! │                                                                         │
//! │  Every query filters on business_id. An id alone never selects a row.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`TransactionRepository`](transaction::TransactionRepository) - Checkout transactions and items
//! - [`CategoryRepository`](category::CategoryRepository) - Categories and bulk reordering
//! - [`DashboardRepository`](dashboard::DashboardRepository) - Sales figures for a period

pub mod category;
pub mod dashboard;
pub mod product;
pub mod transaction;

/// Row offset of a 1-based page. Saturates instead of wrapping so an
/// absurd page number reads past the end and returns nothing.
pub(crate) fn page_offset(page: i64, page_size: i64) -> i64 {
    page.saturating_sub(1).max(0).saturating_mul(page_size.max(0))
}

/// Turns a user search term into a `LIKE ... ESCAPE '\'` pattern that
/// matches the term literally anywhere in the column.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
