//! # Settings Commands
//!
//! Store-wide settings: name, currency, tax rate and contact details.

use chrono::Utc;
use tracing::{debug, info};

use crate::controller::AppController;
use crate::error::ApiResult;
use crate::state::Notice;
use novacare_core::types::Settings;
use novacare_core::validation::{validate_currency_code, validate_tax_rate_bps};

impl AppController {
    pub async fn get_settings(&self) -> Settings {
        self.state.read().await.settings.clone()
    }

    /// Reloads the most recently updated settings row. No row means defaults.
    pub async fn load_settings(&self) -> ApiResult<()> {
        self.refresh_settings(self.generation()).await
    }

    pub(crate) async fn refresh_settings(&self, generation: u64) -> ApiResult<()> {
        match self.collaborators.settings.latest_settings().await {
            Ok(row) => {
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    debug!(stored = row.is_some(), "Settings loaded");
                    state.settings = row.unwrap_or_default();
                }
                Ok(())
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Saves the settings form.
    ///
    /// ## Flow
    /// ```text
    /// id present? ──yes──► update by id ──row returned──► done
    ///      │                     │
    ///      no                no such row
    ///      │                     │
    ///      └─────────► insert ◄──┘
    /// ```
    pub async fn save_settings(&self, settings: Settings) -> ApiResult<Settings> {
        self.require_admin("Only admins can update settings.").await?;

        let mut settings = settings;
        if let Err(e) = validate_tax_rate_bps(settings.tax_rate.bps()) {
            return Err(self.fail(e).await);
        }
        settings.currency = match validate_currency_code(&settings.currency) {
            Ok(code) => code,
            Err(e) => return Err(self.fail(e).await),
        };
        settings.updated_at = Some(Utc::now());

        let updated = match settings.id {
            Some(_) => match self.collaborators.settings.update_settings(&settings).await {
                Ok(row) => row,
                Err(e) => return Err(self.fail(e).await),
            },
            None => None,
        };

        let saved = match updated {
            Some(row) => row,
            None => match self.collaborators.settings.insert_settings(&settings).await {
                Ok(row) => row,
                Err(e) => return Err(self.fail(e).await),
            },
        };
        info!(id = ?saved.id, "Settings saved");

        self.state.write().await.settings = saved.clone();
        self.notify(Notice::success("Settings saved.")).await;
        Ok(saved)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
