//! # Operator Intents
//!
//! Every action the pharmacy UI can trigger, grouped by page concern. Each
//! file adds methods to [`AppController`](crate::controller::AppController).
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── cart.rs       ◄─── Cart manipulation
//! ├── sale.rs       ◄─── Checkout and transaction history
//! ├── inventory.rs  ◄─── Medicine CRUD (admin)
//! ├── settings.rs   ◄─── Store settings (admin)
//! ├── staff.rs      ◄─── Staff onboarding and permissions (admin)
//! └── pages.rs      ◄─── Navigation guards and read projections
//! ```
//!
//! ## How an Intent Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UI                                                                     │
//! │   │  controller.add_to_cart("med-1")                                    │
//! │   ▼                                                                     │
//! │  AppController                                                          │
//! │   1. Guard (role, in-flight flag, input validation)                     │
//! │   2. Call a collaborator through its port trait                         │
//! │   3. Apply the result to AppState under the write lock                  │
//! │   4. Post a Notice (success or error)                                   │
//! │   │                                                                     │
//! │   ▼                                                                     │
//! │  ApiResult<T> back to the caller                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod inventory;
pub mod pages;
pub mod sale;
pub mod settings;
pub mod staff;

pub use cart::CartResponse;
pub use staff::StaffSaved;
