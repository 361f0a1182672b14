//! # Reporting Module
//!
//! Period boundaries and figures behind the business dashboard.
//!
//! ## Periods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  now = Thu 2026-02-19 09:00 UTC                                         │
//! │                                                                         │
//! │  yesterday   [Wed 00:00, Thu 00:00)                                     │
//! │  today       [Thu 00:00, Fri 00:00)                                     │
//! │  last_week   [Mon 02-09 00:00, Mon 02-16 00:00)                         │
//! │  this_week   [Mon 02-16 00:00, Mon 02-23 00:00)                         │
//! │                                                                         │
//! │  Weeks start on Monday. Days are UTC days.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only paid transactions count. Profit is the paid total minus the current
//! cost of every sold unit whose product still exists; a product without a
//! cost contributes its full price.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TransactionDetail;

/// Latest transactions shown on the dashboard.
pub const DASHBOARD_LATEST_TRANSACTIONS: i64 = 5;

/// Best-selling products shown on the dashboard.
pub const DASHBOARD_TOP_PRODUCTS: i64 = 5;

// =============================================================================
// Periods
// =============================================================================

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// The four periods the dashboard compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPeriods {
    pub today: Period,
    pub yesterday: Period,
    pub this_week: Period,
    pub last_week: Period,
}

impl ReportingPeriods {
    /// Periods around `now`.
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use qlaris_core::reporting::ReportingPeriods;
    ///
    /// // Sunday belongs to the week that started the Monday before
    /// let sunday = Utc.with_ymd_and_hms(2026, 2, 22, 23, 59, 0).unwrap();
    /// let periods = ReportingPeriods::around(sunday);
    /// assert_eq!(periods.this_week.start, Utc.with_ymd_and_hms(2026, 2, 16, 0, 0, 0).unwrap());
    /// ```
    pub fn around(now: DateTime<Utc>) -> Self {
        let today_start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        let day = Duration::days(1);
        let week = Duration::days(7);

        let monday =
            today_start - Duration::days(i64::from(now.weekday().num_days_from_monday()));

        ReportingPeriods {
            today: Period {
                start: today_start,
                end: today_start + day,
            },
            yesterday: Period {
                start: today_start - day,
                end: today_start,
            },
            this_week: Period {
                start: monday,
                end: monday + week,
            },
            last_week: Period {
                start: monday - week,
                end: monday,
            },
        }
    }
}

// =============================================================================
// Figures
// =============================================================================

/// Paid sales in one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PeriodStats {
    pub sales_cents: i64,
    pub transactions: i64,
    pub profit_cents: i64,
}

impl PeriodStats {
    #[inline]
    pub fn sales(&self) -> Money {
        Money::from_cents(self.sales_cents)
    }

    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

/// Percent change of each figure against the previous period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodComparison {
    pub sales_percent: f64,
    pub transactions_percent: f64,
    pub profit_percent: f64,
}

impl PeriodComparison {
    pub fn between(previous: &PeriodStats, current: &PeriodStats) -> Self {
        PeriodComparison {
            sales_percent: percent_change(previous.sales_cents, current.sales_cents),
            transactions_percent: percent_change(previous.transactions, current.transactions),
            profit_percent: percent_change(previous.profit_cents, current.profit_cents),
        }
    }
}

/// A period's figures next to the comparison with the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodSummary {
    pub current: PeriodStats,
    pub previous: PeriodStats,
    pub change: PeriodComparison,
}

impl PeriodSummary {
    pub fn new(current: PeriodStats, previous: PeriodStats) -> Self {
        PeriodSummary {
            change: PeriodComparison::between(&previous, &current),
            current,
            previous,
        }
    }
}

/// Units and revenue of one product across all paid transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    /// Current catalog name.
    pub product_name: String,
    pub quantity_sold: i64,
    pub sales_cents: i64,
}

/// Everything the dashboard shows for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardSummary {
    /// Today against yesterday.
    pub today: PeriodSummary,
    /// This week against last week.
    pub this_week: PeriodSummary,
    /// Most recent transactions of any status, newest first.
    pub latest_transactions: Vec<TransactionDetail>,
    /// Best sellers by units sold.
    pub top_products: Vec<ProductSales>,
}

/// Percent change from `previous` to `current`.
///
/// ## Rules
/// - both zero → 0
/// - previous zero → 100
/// - otherwise `(current - previous) / previous * 100`
///
/// ```rust
/// use qlaris_core::reporting::percent_change;
///
/// assert_eq!(percent_change(200, 300), 50.0);
/// assert_eq!(percent_change(0, 300), 100.0);
/// ```
pub fn percent_change(previous: i64, current: i64) -> f64 {
    if previous == 0 {
        return if current == 0 { 0.0 } else { 100.0 };
    }

    let previous = previous as f64;
    (current as f64 - previous) / previous * 100.0
}

// =============================================================================
// Unit Tests
// =============================================================================
