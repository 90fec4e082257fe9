//! # State Module
//!
//! Everything the view layer renders, owned by one `AppState` behind the
//! controller's `RwLock`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  AppController                                                  │   │
//! │  │    state: RwLock<AppState>   ◄── intents write, projections read│   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                              │                                          │
//! │          ┌──────────────────┼──────────────────┐                       │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐              │
//! │  │ Session      │  │ Data         │  │ Counter          │              │
//! │  │              │  │              │  │                  │              │
//! │  │ phase        │  │ medicines    │  │ cart             │              │
//! │  │ session      │  │ transactions │  │ payment_method   │              │
//! │  │ profile      │  │ staff        │  │ sale_submitting  │              │
//! │  │ permissions  │  │ settings     │  │ active_page ...  │              │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘              │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Single writer: every mutation takes the write lock                  │
//! │  • Medicines are replaced and the cart reconciled in one critical      │
//! │    section, so no reader sees a cart line for a deleted medicine       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use crate::ports::Session;
use crate::session::SessionPhase;
use novacare_core::cart::Cart;
use novacare_core::permissions::{PageKey, Permissions, STAFF_DEFAULT};
use novacare_core::reports::{finance_preset, DateRange, DEFAULT_FINANCE_PRESET_DAYS};
use novacare_core::types::{Medicine, PaymentMethod, Profile, Settings, StaffMember, Transaction};

// =============================================================================
// Notice
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Banner message. A new notice replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

// =============================================================================
// App State
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub phase: SessionPhase,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub permissions: Permissions,

    pub medicines: Vec<Medicine>,
    pub transactions: Vec<Transaction>,
    pub staff: Vec<StaffMember>,
    pub settings: Settings,

    pub cart: Cart,
    pub payment_method: PaymentMethod,
    pub sale_submitting: bool,

    /// A role-scoped data load is running.
    pub loading: bool,
    pub notice: Option<Notice>,
    pub active_page: PageKey,
    pub finance_range: DateRange,
    /// Header search box (inventory and POS pages).
    pub search: String,
}

impl AppState {
    pub fn new(today: NaiveDate) -> Self {
        AppState {
            phase: SessionPhase::SignedOut,
            session: None,
            profile: None,
            permissions: STAFF_DEFAULT,
            medicines: Vec::new(),
            transactions: Vec::new(),
            staff: Vec::new(),
            settings: Settings::default(),
            cart: Cart::new(),
            payment_method: PaymentMethod::default(),
            sale_submitting: false,
            loading: false,
            notice: None,
            active_page: PageKey::Dashboard,
            finance_range: finance_preset(DEFAULT_FINANCE_PRESET_DAYS, today),
            search: String::new(),
        }
    }

    /// Drops everything tied to the signed-in identity. The notice, active
    /// page and finance range survive.
    pub fn clear_session(&mut self) {
        self.phase = SessionPhase::SignedOut;
        self.session = None;
        self.profile = None;
        self.permissions = STAFF_DEFAULT;
        self.medicines.clear();
        self.transactions.clear();
        self.staff.clear();
        self.settings = Settings::default();
        self.cart.clear();
        self.payment_method = PaymentMethod::default();
        self.sale_submitting = false;
        self.loading = false;
        self.search.clear();
    }

    /// Replaces the medicine list and reconciles the cart against it.
    pub fn set_medicines(&mut self, medicines: Vec<Medicine>) {
        self.medicines = medicines;
        self.cart.reconcile(&self.medicines);
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }

    /// Admins see every page; staff see what their flags allow.
    pub fn can_access(&self, page: PageKey) -> bool {
        self.is_admin() || self.permissions.allows(page)
    }

    pub fn medicine(&self, id: &str) -> Option<&Medicine> {
        self.medicines.iter().find(|m| m.id == id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
