//! # Validation Module
//!
//! Input validation run before any storage is touched.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer (outside this workspace)                           │
//! │  └── Deserialization into LineItemRequest etc.                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Line count, quantity range, id format                              │
//! │  └── Pagination bounds, search length                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK (stock_qty >= 0), CHECK (quantity > 0)                       │
//! │  └── UNIQUE (business_id, sort_order)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use qlaris_core::validation::{validate_line_items, validate_pagination};
//! use qlaris_core::LineItemRequest;
//!
//! let lines = vec![LineItemRequest::new("550e8400-e29b-41d4-a716-446655440000", 2)];
//! validate_line_items(&lines).unwrap();
//! validate_pagination(1, 20).unwrap();
//! ```

use crate::error::ValidationError;
use crate::types::LineItemRequest;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_PAGE_SIZE};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name (1-200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 200)
}

/// Validates a category name (1-100 characters after trimming).
///
/// ```rust
/// use qlaris_core::validation::validate_category_name;
///
/// assert!(validate_category_name("Drinks").is_ok());
/// assert!(validate_category_name("   ").is_err());
/// ```
pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    validate_name("name", name, 100)
}

/// Validates a free-text search query.
///
/// ## Returns
/// The trimmed query, or `None` if it was blank.
pub fn validate_search_query(query: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(query) = query.map(str::trim) else {
        return Ok(None);
    };

    if query.is_empty() {
        return Ok(None);
    }

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(Some(query.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (free items).
///
/// ```rust
/// use qlaris_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a cash amount handed over by the customer.
///
/// Zero is accepted here so a free cart can be settled; whether the amount
/// covers the total is decided by [`crate::pricing::settle_cash`].
pub fn validate_received_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "received amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates pagination parameters.
///
/// ## Rules
/// - `page` starts at 1
/// - `page_size` between 1 and MAX_PAGE_SIZE (100)
/// - the row offset `(page - 1) * page_size` fits in an i64
pub fn validate_pagination(page: i64, page_size: i64) -> ValidationResult<()> {
    if page < 1 {
        return Err(ValidationError::MustBePositive {
            field: "page".to_string(),
        });
    }

    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ValidationError::OutOfRange {
            field: "page_size".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE,
        });
    }

    if (page - 1).checked_mul(page_size).is_none() {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::MAX / page_size + 1,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the line items of a checkout request.
///
/// ## Rules
/// - At least one line, at most MAX_CART_ITEMS (100)
/// - Every product id is a UUID
/// - Every quantity passes [`validate_quantity`]
///
/// The same product may appear on several lines; pricing aggregates demand.
pub fn validate_line_items(items: &[LineItemRequest]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_CART_ITEMS as i64,
        });
    }

    for item in items {
        validate_uuid("product_id", &item.product_id)?;
        validate_quantity(item.quantity)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use qlaris_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
