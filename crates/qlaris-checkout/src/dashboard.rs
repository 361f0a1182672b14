//! # Dashboard Service
//!
//! Today and this week at a glance, each compared with the period before,
//! plus the latest transactions and best sellers.

use std::sync::Arc;

use tracing::debug;

use qlaris_core::reporting::{Period, DASHBOARD_LATEST_TRANSACTIONS, DASHBOARD_TOP_PRODUCTS};
use qlaris_core::{Clock, DashboardSummary, PeriodSummary, ReportingPeriods, SystemClock};
use qlaris_db::Database;

use crate::error::ServiceResult;

/// Dashboard service.
#[derive(Clone)]
pub struct DashboardService {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(db: Database) -> Self {
        DashboardService {
            db,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the dashboard for a business as of now.
    pub async fn summary(&self, business_id: &str) -> ServiceResult<DashboardSummary> {
        let periods = ReportingPeriods::around(self.clock.now());
        let dashboard = self.db.dashboard();
        let stats = |period: Period| dashboard.period_stats(business_id, period.start, period.end);

        let today = stats(periods.today).await?;
        let yesterday = stats(periods.yesterday).await?;
        let this_week = stats(periods.this_week).await?;
        let last_week = stats(periods.last_week).await?;

        let (latest_transactions, _) = self
            .db
            .transactions()
            .list_by_business(business_id, None, 1, DASHBOARD_LATEST_TRANSACTIONS)
            .await?;
        let top_products = dashboard
            .top_products(business_id, DASHBOARD_TOP_PRODUCTS)
            .await?;

        debug!(
            business_id = %business_id,
            today_sales = %today.sales(),
            today_profit = %today.profit(),
            week_sales = %this_week.sales(),
            "Dashboard built"
        );

        Ok(DashboardSummary {
            today: PeriodSummary::new(today, yesterday),
            this_week: PeriodSummary::new(this_week, last_week),
            latest_transactions,
            top_products,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
