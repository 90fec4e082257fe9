//! # Inventory Commands
//!
//! Medicine catalogue maintenance. Every write is admin only and reloads the
//! medicine list afterwards, which also reconciles the cart.

use tracing::{debug, info};

use crate::controller::AppController;
use crate::error::{ApiError, ApiResult};
use crate::state::Notice;
use novacare_core::types::{Medicine, MedicineUpdate, NewMedicine};
use novacare_core::validation::{validate_medicine_update, validate_new_medicine};

impl AppController {
    /// Reloads the medicine list and reconciles the cart against it.
    pub async fn load_medicines(&self) -> ApiResult<()> {
        self.refresh_medicines(self.generation()).await
    }

    pub(crate) async fn refresh_medicines(&self, generation: u64) -> ApiResult<()> {
        match self.collaborators.inventory.list_medicines().await {
            Ok(medicines) => {
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    debug!(count = medicines.len(), "Medicines loaded");
                    state.set_medicines(medicines);
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    pub async fn add_medicine(&self, input: NewMedicine) -> ApiResult<Medicine> {
        self.require_admin("Only admins can add medicines.").await?;
        let input = match validate_new_medicine(&input) {
            Ok(input) => input,
            Err(e) => return Err(self.fail(e).await),
        };

        let medicine = match self.collaborators.inventory.insert_medicine(&input).await {
            Ok(medicine) => medicine,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(id = %medicine.id, sku = %medicine.sku, "Medicine added");

        let _ = self.load_medicines().await;
        self.notify(Notice::success(format!("{} added to inventory.", medicine.name)))
            .await;
        Ok(medicine)
    }

    /// Updates everything but the SKU.
    pub async fn update_medicine(&self, input: MedicineUpdate) -> ApiResult<Medicine> {
        self.require_admin("Only admins can edit medicines.").await?;
        let input = match validate_medicine_update(&input) {
            Ok(input) => input,
            Err(e) => return Err(self.fail(e).await),
        };

        let medicine = match self.collaborators.inventory.update_medicine(&input).await {
            Ok(medicine) => medicine,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(id = %medicine.id, "Medicine updated");

        let _ = self.load_medicines().await;
        self.notify(Notice::success(format!("{} updated.", medicine.name)))
            .await;
        Ok(medicine)
    }

    /// Deletes a medicine and drops its cart line. `name` is only used for
    /// the confirmation notice.
    pub async fn delete_medicine(&self, id: &str, name: Option<&str>) -> ApiResult<()> {
        self.require_admin("Only admins can delete medicines.").await?;
        let id = id.trim();
        if id.is_empty() {
            return Err(self
                .fail(ApiError::validation("Medicine id is required."))
                .await);
        }

        if let Err(e) = self.collaborators.inventory.delete_medicine(id).await {
            return Err(self.fail(e).await);
        }
        info!(id = %id, "Medicine deleted");

        self.state.write().await.cart.remove(id);
        let _ = self.load_medicines().await;

        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("Medicine");
        self.notify(Notice::success(format!("{} deleted.", name))).await;
        Ok(())
    }

    /// Deletes every medicine and empties the cart. Returns the number of
    /// rows removed.
    pub async fn clear_inventory(&self) -> ApiResult<u64> {
        self.require_admin("Only admins can delete all medicines.").await?;

        let removed = match self.collaborators.inventory.delete_all_medicines().await {
            Ok(removed) => removed,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(removed, "Inventory cleared");

        self.state.write().await.cart.clear();
        let _ = self.load_medicines().await;
        self.notify(Notice::success("All medicines deleted from inventory."))
            .await;
        Ok(removed)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
