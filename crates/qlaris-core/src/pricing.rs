//! # Pricing Module
//!
//! Turns requested checkout lines into priced line snapshots.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Pricing                                     │
//! │                                                                         │
//! │  [(P1, 2), (P2, 1), (P1, 1)]        products: {P1: .., P2: ..}          │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  1. Aggregate demand per product    P1 → 3, P2 → 1                      │
//! │  2. Per line, in request order:                                         │
//! │       exists? ─► active? ─► same business? ─► enough stock?             │
//! │  3. Snapshot name + price, subtotal = price × qty                       │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  PricedCart { total: Σ subtotal, lines: [...] }                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check here is advisory: it fails fast with a precise message.
//! The authoritative check is the conditional decrement in the database.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItemRequest, Product};

// =============================================================================
// Priced Cart
// =============================================================================

/// A line after pricing. These values, not the live product, become the
/// stored transaction item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub subtotal: Money,
    /// Whether the product's stock must be decremented.
    pub stock_managed: bool,
}

/// Result of pricing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedCart {
    pub total: Money,
    pub lines: Vec<PricedLine>,
}

impl PricedCart {
    /// Quantity to take from stock per stock-managed product, in order of
    /// first appearance. Lines for the same product are merged.
    pub fn stock_demand(&self) -> Vec<(String, i64)> {
        let mut demand: Vec<(String, i64)> = Vec::new();

        for line in self.lines.iter().filter(|l| l.stock_managed) {
            match demand.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => demand.push((line.product_id.clone(), line.quantity)),
            }
        }

        demand
    }
}

// =============================================================================
// Pricing Calculator
// =============================================================================

/// Prices a cart for one business.
///
/// ## Example
/// ```rust,ignore
/// let calculator = PricingCalculator::new(&business_id);
/// let cart = calculator.price(&request.items, &products_by_id)?;
/// assert_eq!(cart.lines.len(), request.items.len());
/// ```
#[derive(Debug, Clone)]
pub struct PricingCalculator<'a> {
    business_id: &'a str,
}

impl<'a> PricingCalculator<'a> {
    pub fn new(business_id: &'a str) -> Self {
        PricingCalculator { business_id }
    }

    /// Prices `lines` against a snapshot of products keyed by id.
    ///
    /// ## Errors
    /// The first offending line, in request order, decides the error:
    /// - `ProductNotFound` - id missing from the snapshot
    /// - `ProductInactive` - product deactivated
    /// - `ProductNotOwned` - product belongs to another business
    /// - `InsufficientStock` - total demand for a stock-managed product
    ///   exceeds its stock
    ///
    /// A subtotal or total that overflows is `Validation(AmountTooLarge)`.
    pub fn price(
        &self,
        lines: &[LineItemRequest],
        products: &HashMap<String, Product>,
    ) -> CoreResult<PricedCart> {
        let mut demand: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            *demand.entry(line.product_id.as_str()).or_insert(0) += line.quantity;
        }

        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if !product.is_active {
                return Err(CoreError::ProductInactive {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                });
            }

            if product.business_id != self.business_id {
                return Err(CoreError::ProductNotOwned(product.id.clone()));
            }

            let requested = demand
                .get(line.product_id.as_str())
                .copied()
                .unwrap_or(line.quantity);
            if !product.can_sell(requested) {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    available: product.available_stock(),
                    requested,
                });
            }

            let unit_price = product.price();
            let subtotal = unit_price
                .checked_mul_quantity(line.quantity)
                .ok_or_else(|| too_large("subtotal"))?;
            priced.push(PricedLine {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                unit_price,
                quantity: line.quantity,
                subtotal,
                stock_managed: product.enable_stock,
            });
        }

        let total = priced
            .iter()
            .try_fold(Money::zero(), |acc, l| acc.checked_add(l.subtotal))
            .ok_or_else(|| too_large("total"))?;

        Ok(PricedCart {
            total,
            lines: priced,
        })
    }
}

fn too_large(field: &str) -> CoreError {
    ValidationError::AmountTooLarge {
        field: field.to_string(),
    }
    .into()
}

// =============================================================================
// Cash Settlement
// =============================================================================

/// Amounts recorded when a transaction is paid in cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSettlement {
    pub received: Money,
    pub change: Money,
}

/// Computes change for a cash payment.
///
/// ## Rules
/// - `received < total` → `InsufficientPayment` naming both amounts
/// - otherwise `change = received - total`, exact to the cent
///
/// ```rust
/// use qlaris_core::{settle_cash, Money};
///
/// let s = settle_cash(Money::from_cents(3000), Money::from_cents(5000)).unwrap();
/// assert_eq!(s.change.cents(), 2000);
/// assert!(settle_cash(Money::from_cents(3000), Money::from_cents(2999)).is_err());
/// ```
pub fn settle_cash(total: Money, received: Money) -> CoreResult<CashSettlement> {
    if received < total {
        return Err(CoreError::InsufficientPayment {
            required: total,
            received,
        });
    }

    Ok(CashSettlement {
        received,
        change: received - total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
