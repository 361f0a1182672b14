//! # Category Ordering
//!
//! Computes the sort_order assignment for a category reorder request.
//!
//! ## Assignment Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  existing (by sort_order):   A(3)  B(7)  C(8)  D(12)                    │
//! │  requested:                  [C, A]                                     │
//! │                                                                         │
//! │  listed first, in request order      C → 0   A → 1                      │
//! │  then the rest, in existing order    B → 2   D → 3                      │
//! │                                                                         │
//! │  Result is always a permutation of 0..n-1, so it cannot collide with    │
//! │  itself under UNIQUE(business_id, sort_order).                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Category;

/// Plans the new sort_order of every category in `existing`.
///
/// `existing` must be the business's full category set; its order is taken
/// from `sort_order`, not from slice position.
///
/// ## Returns
/// `(category_id, new_sort_order)` for every existing category, ordered by
/// the new position. Empty if `requested` is empty.
///
/// ## Errors
/// * `Validation(Duplicate)` - an id appears twice in `requested`
/// * `CategoryNotFound` - an id isn't one of `existing`
pub fn plan_category_order(
    existing: &[Category],
    requested: &[String],
) -> CoreResult<Vec<(String, i64)>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let known: HashMap<&str, &Category> = existing.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut listed: HashSet<&str> = HashSet::with_capacity(requested.len());
    for id in requested {
        if !listed.insert(id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "category_ids".to_string(),
                value: id.clone(),
            }
            .into());
        }
        if !known.contains_key(id.as_str()) {
            return Err(CoreError::CategoryNotFound(id.clone()));
        }
    }

    let mut rest: Vec<&Category> = existing
        .iter()
        .filter(|c| !listed.contains(c.id.as_str()))
        .collect();
    rest.sort_by_key(|c| c.sort_order);

    let plan = requested
        .iter()
        .map(String::as_str)
        .chain(rest.into_iter().map(|c| c.id.as_str()))
        .enumerate()
        .map(|(position, id)| (id.to_string(), position as i64))
        .collect();

    Ok(plan)
}

// =============================================================================
// Unit Tests
// =============================================================================
