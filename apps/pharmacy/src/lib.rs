//! # NovaCare Pharmacy Library
//!
//! Application layer of the NovaCare pharmacy POS: the session bridge, the
//! permission resolver and every operator intent, wired to the SQLite stores
//! of `novacare-db`.
//!
//! ## Module Organization
//! ```text
//! novacare_pharmacy/
//! ├── lib.rs          ◄─── You are here (startup wiring)
//! ├── config.rs       ◄─── pharmacy.toml + environment overrides
//! ├── error.rs        ◄─── ApiError returned by every intent
//! ├── ports.rs        ◄─── Collaborator traits (auth, stores, sale procedure)
//! ├── backend/
//! │   ├── sqlite.rs   ◄─── Store traits over novacare-db repositories
//! │   └── auth.rs     ◄─── Local email/password auth with event broadcast
//! ├── permissions.rs  ◄─── Backend mode detection, load/persist permissions
//! ├── controller.rs   ◄─── AppController (state + collaborators)
//! ├── session.rs      ◄─── Sign-in/out, profile loading, auth listener
//! ├── state/          ◄─── AppState snapshot and notices
//! └── commands/       ◄─── Cart, sale, inventory, settings, staff, pages
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. AppConfig::load ──► defaults, pharmacy.toml, NOVACARE_* env         │
//! │  2. init_tracing ─────► RUST_LOG wins over logging.filter               │
//! │  3. Database::new ────► SQLite (WAL) + migrations                       │
//! │  4. Collaborators::sqlite ──► stores, local auth, sale procedure        │
//! │  5. AppController::new + spawn_auth_listener                            │
//! │  6. controller.bootstrap() ──► restores a persisted session, if any     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod permissions;
pub mod ports;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use novacare_db::{Database, DbError};

pub use config::{AppConfig, ConfigError};
pub use controller::{AppController, Collaborators};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use session::SessionPhase;
pub use state::{AppState, Notice, NoticeKind};

/// Failure while bringing the application up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database startup failed: {0}")]
    Database(#[from] DbError),
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over `filter`. Calling this twice is
/// harmless; the second subscriber is simply not installed.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Connects the database, wires the SQLite collaborators and starts the
/// auth listener. The caller still runs [`AppController::bootstrap`] to
/// restore any persisted session.
pub async fn start(config: &AppConfig) -> Result<Arc<AppController>, StartupError> {
    let db_config = config.db_config()?;
    info!(path = ?db_config.database_path, "Opening pharmacy database");

    let db = Database::new(db_config).await?;
    info!("Database connected and migrations applied");

    let controller = Arc::new(AppController::new(
        Collaborators::sqlite(db),
        config.session.clone(),
    ));
    controller.spawn_auth_listener();

    Ok(controller)
}

// =============================================================================
// Unit Tests
// =============================================================================
