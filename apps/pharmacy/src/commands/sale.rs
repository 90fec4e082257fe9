//! # Sale Commands
//!
//! Checkout and the transaction history.
//!
//! ## Checkout Flow
//! ```text
//! complete_sale()
//!      │
//!      ├── already in flight? ──► SaleInProgress (nothing touched)
//!      │
//!      ├── cart empty / line over stock? ──► Validation notice
//!      │
//!      ▼
//! SaleProcedure::complete_sale(user, {payment_method, items})
//!      │                       (atomic: every line or nothing)
//!      ├── Err ──► notice with the procedure's message
//!      │
//!      ▼
//! session changed meanwhile? ──► return the result, leave state alone
//!      │
//! clear cart, payment method ──► cash
//! reload medicines ║ reload transactions
//! "Sale completed successfully."
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::controller::AppController;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::session::PROFILE_MISSING_MESSAGE;
use crate::state::Notice;
use novacare_core::types::PaymentMethod;

/// Clears the in-flight flag when the sale attempt ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AppController {
    /// Submits the cart as one sale. Returns the new transaction ID.
    pub async fn complete_sale(&self) -> ApiResult<String> {
        let Some(_in_flight) = InFlight::acquire(&self.sale_in_flight) else {
            debug!("complete_sale ignored: a sale is already in flight");
            return Err(ApiError::new(
                ErrorCode::SaleInProgress,
                "A sale is already being processed.",
            ));
        };

        let prepared = {
            let state = self.state.read().await;
            match &state.profile {
                Some(profile) => state
                    .cart
                    .to_sale_request(state.payment_method)
                    .map(|request| (profile.id.clone(), request))
                    .map_err(ApiError::from),
                None => Err(ApiError::new(ErrorCode::ProfileMissing, PROFILE_MISSING_MESSAGE)),
            }
        };
        let (user_id, request) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.fail(e).await),
        };

        let generation = self.generation();
        debug!(lines = request.items.len(), method = request.payment_method.as_str(), "Submitting sale");
        self.state.write().await.sale_submitting = true;
        let result = self
            .collaborators
            .sales
            .complete_sale(Some(&user_id), &request)
            .await;

        if !self.is_current(generation) {
            // The session changed while the sale was in flight. The new
            // operator's cart, payment method and notices stay untouched.
            return match result {
                Ok(transaction_id) => {
                    info!(transaction_id = %transaction_id, "Sale completed for a previous session");
                    Ok(transaction_id)
                }
                Err(e) => {
                    warn!(error = %e, "Sale for a previous session failed");
                    Err(ApiError::from(e).with_fallback("Failed to complete sale."))
                }
            };
        }
        self.state.write().await.sale_submitting = false;

        let transaction_id = match result {
            Ok(id) => id,
            Err(e) => {
                return Err(self
                    .fail(ApiError::from(e).with_fallback("Failed to complete sale."))
                    .await)
            }
        };

        {
            let mut state = self.state.write().await;
            state.cart.clear();
            state.payment_method = PaymentMethod::Cash;
        }

        // Reload failures are already posted as notices.
        let _ = tokio::join!(
            self.refresh_medicines(generation),
            self.refresh_transactions(generation),
        );

        info!(transaction_id = %transaction_id, "Sale completed");
        self.notify(Notice::success("Sale completed successfully.")).await;
        Ok(transaction_id)
    }

    /// Reloads the transaction history.
    pub async fn load_transactions(&self) -> ApiResult<()> {
        self.refresh_transactions(self.generation()).await
    }

    pub(crate) async fn refresh_transactions(&self, generation: u64) -> ApiResult<()> {
        match self.collaborators.transactions.list_transactions().await {
            Ok(transactions) => {
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    state.transactions = transactions;
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ports::SaleProcedure;
    use crate::state::NoticeKind;
    use crate::testing::{self, GatedSaleProcedure, Harness};

    #[tokio::test]
    async fn test_complete_sale_happy_path() {
        let harness = testing::harness().await;
        harness.sign_in_staff().await;
        let medicine = harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 10).await;
        let controller = &harness.controller;

        controller.add_to_cart(&medicine.id).await.unwrap();
        controller.update_cart_qty(&medicine.id, 3).await;
        controller.set_payment_method(PaymentMethod::Card).await;

        let id = controller.complete_sale().await.unwrap();

        let state = controller.snapshot().await;
        assert!(state.cart.is_empty());
        assert_eq!(state.payment_method, PaymentMethod::Cash);
        assert!(!state.sale_submitting);
        assert_eq!(state.medicines[0].stock, 7);
        assert_eq!(state.transactions[0].id, id);
        assert_eq!(state.transactions[0].payment_method, PaymentMethod::Card);
        assert_eq!(state.transactions[0].user_id.as_deref(), Some(harness.staff_id.as_str()));
        let notice = state.notice.unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.message, "Sale completed successfully.");
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused() {
        let harness = testing::harness().await;
        harness.sign_in_staff().await;

        let err = harness.controller.complete_sale().await.unwrap_err();
        assert_eq!(err.message, "Add medicines to complete a sale.");
        assert!(harness.controller.snapshot().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_stock_check_before_submission() {
        let harness = testing::harness().await;
        harness.sign_in_staff().await;
        let medicine = harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 3).await;
        let controller = &harness.controller;
        controller.add_to_cart(&medicine.id).await.unwrap();
        controller.update_cart_qty(&medicine.id, 3).await;

        // Stock drops behind the counter's back; the cart keeps its stale ceiling.
        harness
            .db
            .medicines()
            .update(&novacare_core::types::MedicineUpdate {
                id: medicine.id.clone(),
                name: medicine.name.clone(),
                category: medicine.category.clone(),
                price_cents: medicine.price_cents,
                stock: 1,
                expiry: medicine.expiry,
            })
            .await
            .unwrap();

        let err = controller.complete_sale().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StockConflict);
        assert_eq!(err.message, "Insufficient stock for Paracetamol 500mg.");

        let state = controller.snapshot().await;
        assert_eq!(state.cart.quantity_of(&medicine.id), 3);
        assert!(state.transactions.is_empty());
    }

    async fn gated_harness() -> (Harness, Arc<GatedSaleProcedure>) {
        let gate = Arc::new(std::sync::OnceLock::<Arc<GatedSaleProcedure>>::new());
        let slot = gate.clone();
        let harness = testing::harness_with(move |collaborators| {
            let gated = Arc::new(GatedSaleProcedure::new(collaborators.sales.clone()));
            let _ = slot.set(gated.clone());
            collaborators.sales = gated as Arc<dyn SaleProcedure>;
        })
        .await;
        let gated = gate.get().unwrap().clone();
        (harness, gated)
    }

    #[tokio::test]
    async fn test_reentrant_call_is_rejected() {
        let (harness, gated) = gated_harness().await;

        harness.sign_in_staff().await;
        let medicine = harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 10).await;
        harness.controller.add_to_cart(&medicine.id).await.unwrap();

        let controller = harness.controller.clone();
        let first = tokio::spawn(async move { controller.complete_sale().await });
        gated.wait_entered().await;
        assert!(harness.controller.snapshot().await.sale_submitting);

        let err = harness.controller.complete_sale().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SaleInProgress);
        assert!(harness.controller.notice().await.is_none());

        gated.release();
        first.await.unwrap().unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.transactions.len(), 1);
        assert!(!harness.controller.sale_in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_sale_requires_profile() {
        let harness = testing::harness().await;
        let err = harness.controller.complete_sale().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProfileMissing);
    }

    #[tokio::test]
    async fn test_late_sale_leaves_next_session_alone() {
        let (harness, gated) = gated_harness().await;
        let medicine = harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 10).await;

        harness.sign_in_staff().await;
        harness.controller.add_to_cart(&medicine.id).await.unwrap();
        let controller = harness.controller.clone();
        let staff_sale = tokio::spawn(async move { controller.complete_sale().await });
        gated.wait_entered().await;

        harness.controller.sign_out().await.unwrap();
        harness.sign_in_admin().await;
        harness.controller.add_to_cart(&medicine.id).await.unwrap();
        harness
            .controller
            .set_payment_method(PaymentMethod::Insurance)
            .await;
        harness.controller.dismiss_notice().await;

        gated.release();
        staff_sale.await.unwrap().unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.cart.item_count(), 1);
        assert_eq!(state.cart.quantity_of(&medicine.id), 1);
        assert_eq!(state.payment_method, PaymentMethod::Insurance);
        assert!(!state.sale_submitting);
        assert!(state.notice.is_none());

        // The staff sale itself went through.
        let stored = harness.db.medicines().get_by_id(&medicine.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 9);
    }
}
