//! # Page Commands
//!
//! Navigation guards, header/search state and the read-only projections the
//! pages render.
//!
//! ```text
//! ┌──────────────┬───────────────────────────────────────────────────────┐
//! │ Page         │ Projection                                            │
//! ├──────────────┼───────────────────────────────────────────────────────┤
//! │ Dashboard    │ dashboard_stats, inventory_signals                    │
//! │ POS          │ inventory_with_status (search), get_cart              │
//! │ Inventory    │ inventory_with_status (search + category), categories │
//! │ Finance      │ finance_report over the selected range                │
//! │ Settings     │ get_settings, staff list                              │
//! └──────────────┴───────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::controller::{today, AppController};
use crate::error::{ApiError, ApiResult};
use novacare_core::cart::CartTotals;
use novacare_core::permissions::PageKey;
use novacare_core::reports::{
    category_options, dashboard_stats, filter_medicines, finance_preset, finance_report,
    inventory_signals, DashboardStats, DateRange, FinanceReport, InventorySignals,
    ALL_CATEGORIES,
};
use novacare_core::types::{MedicineWithStatus, PaymentMethod};

impl AppController {
    // =========================================================================
    // Access
    // =========================================================================

    pub async fn can_access(&self, page: PageKey) -> bool {
        self.state.read().await.can_access(page)
    }

    /// Pages in navigation order that the operator may open.
    pub async fn visible_pages(&self) -> Vec<PageKey> {
        let state = self.state.read().await;
        PageKey::ALL
            .into_iter()
            .filter(|page| state.can_access(*page))
            .collect()
    }

    pub async fn set_active_page(&self, page: PageKey) -> ApiResult<()> {
        let allowed = {
            let mut state = self.state.write().await;
            let allowed = state.can_access(page);
            if allowed {
                state.active_page = page;
            }
            allowed
        };

        if allowed {
            Ok(())
        } else {
            Err(self
                .fail(ApiError::unauthorized(format!("No access to {}.", page.title())))
                .await)
        }
    }

    /// Whether the operator may still see the active page. Permissions can
    /// change underneath it.
    pub async fn page_allowed(&self) -> bool {
        let state = self.state.read().await;
        state.can_access(state.active_page)
    }

    // =========================================================================
    // Header State
    // =========================================================================

    pub async fn set_search(&self, query: &str) {
        self.state.write().await.search = query.to_string();
    }

    pub async fn set_payment_method(&self, method: PaymentMethod) {
        self.state.write().await.payment_method = method;
    }

    pub async fn set_finance_range(&self, from: &str, to: &str) {
        self.state.write().await.finance_range = DateRange::custom(from, to);
    }

    /// Selects the last `days` days ending today.
    pub async fn set_finance_preset(&self, days: u32) {
        self.state.write().await.finance_range = finance_preset(days, today());
    }

    // =========================================================================
    // Projections
    // =========================================================================

    /// Medicines matching the header search and `category`, each with its
    /// stock status.
    pub async fn inventory_with_status(
        &self,
        category: Option<&str>,
        today: NaiveDate,
    ) -> Vec<MedicineWithStatus> {
        let state = self.state.read().await;
        filter_medicines(&state.medicines, &state.search, category.unwrap_or(ALL_CATEGORIES))
            .into_iter()
            .map(|m| MedicineWithStatus::new(m.clone(), today))
            .collect()
    }

    pub async fn category_options(&self) -> Vec<String> {
        category_options(&self.state.read().await.medicines)
    }

    pub async fn inventory_signals(&self, today: NaiveDate) -> InventorySignals {
        inventory_signals(&self.state.read().await.medicines, today)
    }

    pub async fn cart_totals(&self) -> CartTotals {
        let state = self.state.read().await;
        state.cart.price(&state.settings)
    }

    pub async fn dashboard_stats(&self, today: NaiveDate) -> DashboardStats {
        let state = self.state.read().await;
        dashboard_stats(&state.medicines, &state.transactions, today)
    }

    /// Finance page over the selected range.
    pub async fn finance_report(&self) -> FinanceReport {
        let state = self.state.read().await;
        finance_report(&state.transactions, &state.finance_range)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
