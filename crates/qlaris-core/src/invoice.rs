//! # Invoice Numbers
//!
//! Human-readable invoice numbers printed on receipts.
//!
//! ## Format
//! ```text
//! 190226QXR
//! ──┬─── ─┬─
//!   │     └── 3 random uppercase letters
//!   └──────── DDMMYY of the checkout date (UTC)
//! ```
//!
//! Numbers are not guaranteed unique; the transaction id is the identity.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Length of the random suffix.
pub const INVOICE_SUFFIX_LEN: usize = 3;

/// Produces invoice numbers for new transactions.
pub trait InvoiceNumberGenerator: Send + Sync {
    fn generate(&self, at: DateTime<Utc>) -> String;
}

/// `DDMMYY` + random uppercase suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInvoiceNumbers;

impl InvoiceNumberGenerator for RandomInvoiceNumbers {
    fn generate(&self, at: DateTime<Utc>) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..INVOICE_SUFFIX_LEN)
            .map(|_| char::from(rng.gen_range(b'A'..=b'Z')))
            .collect();

        format!("{}{}", at.format("%d%m%y"), suffix)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
