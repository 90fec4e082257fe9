//! # Cart Commands
//!
//! Counter cart intents. The cart only changes here, in
//! [`complete_sale`](crate::controller::AppController::complete_sale) and
//! when the medicine list reloads.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Payment  │────►│ Completed│       │
//! │  │  Cart    │     │          │     │ Method   │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │                        │                                 │              │
//! │                   add_to_cart                     complete_sale         │
//! │                   update_cart_qty                 (sale.rs)             │
//! │                   remove_from_cart                       │              │
//! │                        │                                 │              │
//! │                        ▼                                 ▼              │
//! │                   clear_cart ─────────────────► (back to empty)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;

use crate::controller::{today, AppController};
use crate::error::ApiResult;
use crate::state::AppState;
use novacare_core::cart::{CartLine, CartTotals};
use novacare_core::CoreError;

/// Cart lines plus totals priced with the current settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

impl From<&AppState> for CartResponse {
    fn from(state: &AppState) -> Self {
        CartResponse {
            lines: state.cart.lines().to_vec(),
            totals: state.cart.price(&state.settings),
        }
    }
}

impl AppController {
    pub async fn get_cart(&self) -> CartResponse {
        CartResponse::from(&*self.state.read().await)
    }

    /// Adds one unit of a listed medicine.
    ///
    /// ## Rules
    /// - Expired medicines are refused
    /// - The cart never holds more units than the listed stock
    pub async fn add_to_cart(&self, medicine_id: &str) -> ApiResult<CartResponse> {
        debug!(medicine_id = %medicine_id, "add_to_cart");

        let result = {
            let mut state = self.state.write().await;
            match state.medicine(medicine_id).cloned() {
                Some(medicine) => state
                    .cart
                    .add(&medicine, today())
                    .map(|()| CartResponse::from(&*state)),
                None => Err(CoreError::MedicineNotFound(medicine_id.to_string())),
            }
        };

        match result {
            Ok(cart) => Ok(cart),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Sets a line's quantity, capped at the listed stock. Zero or less
    /// removes the line.
    pub async fn update_cart_qty(&self, medicine_id: &str, quantity: i64) -> CartResponse {
        let mut state = self.state.write().await;
        state.cart.update_qty(medicine_id, quantity);
        CartResponse::from(&*state)
    }

    pub async fn remove_from_cart(&self, medicine_id: &str) -> CartResponse {
        let mut state = self.state.write().await;
        state.cart.remove(medicine_id);
        CartResponse::from(&*state)
    }

    pub async fn clear_cart(&self) -> CartResponse {
        let mut state = self.state.write().await;
        state.cart.clear();
        CartResponse::from(&*state)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
