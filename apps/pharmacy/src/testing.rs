//! Test support: scripted collaborators and a controller over in-memory
//! SQLite with one admin and one staff account.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::config::SessionSettings;
use crate::controller::{AppController, Collaborators};
use crate::ports::{PermissionStore, ProfileStore, SaleProcedure, StoreError, StoreResult};
use crate::session::SessionPhase;
use novacare_core::permissions::Permissions;
use novacare_core::types::{Medicine, NewMedicine, Profile, Role, SaleRequest};
use novacare_db::{Database, DbConfig};

pub const ADMIN_EMAIL: &str = "admin@novacare.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const STAFF_EMAIL: &str = "cashier@novacare.test";
pub const STAFF_PASSWORD: &str = "cashier-password";

pub fn profile(id: &str, role: Role) -> Profile {
    Profile {
        id: id.to_string(),
        email: format!("{}@novacare.test", id),
        full_name: format!("User {}", id),
        role,
        created_at: Utc::now(),
    }
}

// =============================================================================
// Scripted Permission Store
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Table,
    Column,
    Neither,
}

struct Script {
    probe_table: StoreResult<()>,
    probe_column: StoreResult<()>,
    probe_count: usize,
    rows: HashMap<String, Value>,
    read_error: Option<StoreError>,
    write_error: Option<StoreError>,
}

/// In-memory permission storage in a fixed shape. Operations on the absent
/// shape fail with the matching schema error.
pub struct ScriptedPermissionStore {
    shape: Shape,
    script: Mutex<Script>,
}

impl ScriptedPermissionStore {
    fn with_shape(shape: Shape) -> Self {
        let probe_table = match shape {
            Shape::Table => Ok(()),
            Shape::Column | Shape::Neither => Err(missing_relation()),
        };
        let probe_column = match shape {
            Shape::Table | Shape::Column => Ok(()),
            Shape::Neither => Err(missing_column()),
        };
        ScriptedPermissionStore {
            shape,
            script: Mutex::new(Script {
                probe_table,
                probe_column,
                probe_count: 0,
                rows: HashMap::new(),
                read_error: None,
                write_error: None,
            }),
        }
    }

    pub fn table() -> Self {
        Self::with_shape(Shape::Table)
    }

    pub fn column() -> Self {
        Self::with_shape(Shape::Column)
    }

    pub fn unsupported() -> Self {
        Self::with_shape(Shape::Neither)
    }

    pub fn set_probe_table(&self, result: StoreResult<()>) {
        self.script.lock().unwrap().probe_table = result;
    }

    pub fn set_probe_column(&self, result: StoreResult<()>) {
        self.script.lock().unwrap().probe_column = result;
    }

    /// Number of table probes seen.
    pub fn probe_count(&self) -> usize {
        self.script.lock().unwrap().probe_count
    }

    pub fn insert_row(&self, user_id: &str, raw: Value) {
        self.script
            .lock()
            .unwrap()
            .rows
            .insert(user_id.to_string(), raw);
    }

    pub fn row(&self, user_id: &str) -> Option<Value> {
        self.script.lock().unwrap().rows.get(user_id).cloned()
    }

    pub fn fail_reads(&self, err: StoreError) {
        self.script.lock().unwrap().read_error = Some(err);
    }

    pub fn fail_writes(&self, err: StoreError) {
        self.script.lock().unwrap().write_error = Some(err);
    }

    fn table_access(&self) -> StoreResult<()> {
        match self.shape {
            Shape::Table => Ok(()),
            Shape::Column | Shape::Neither => Err(missing_relation()),
        }
    }

    fn column_access(&self) -> StoreResult<()> {
        match self.shape {
            Shape::Table | Shape::Column => Ok(()),
            Shape::Neither => Err(missing_column()),
        }
    }

    fn read(&self, user_id: &str) -> StoreResult<Option<Value>> {
        let script = self.script.lock().unwrap();
        match &script.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(script.rows.get(user_id).cloned()),
        }
    }

    fn read_all(&self) -> StoreResult<HashMap<String, Value>> {
        let script = self.script.lock().unwrap();
        match &script.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(script.rows.clone()),
        }
    }

    fn write(&self, user_id: &str, permissions: Option<&Permissions>) -> StoreResult<()> {
        let mut script = self.script.lock().unwrap();
        if let Some(err) = &script.write_error {
            return Err(err.clone());
        }
        match permissions {
            Some(permissions) => {
                script.rows.insert(user_id.to_string(), permissions.to_raw());
            }
            None => {
                script.rows.remove(user_id);
            }
        }
        Ok(())
    }
}

fn missing_relation() -> StoreError {
    StoreError::UndefinedRelation("no such table: staff_permissions".to_string())
}

fn missing_column() -> StoreError {
    StoreError::UndefinedColumn("no such column: permissions".to_string())
}

#[async_trait]
impl PermissionStore for ScriptedPermissionStore {
    async fn probe_table(&self) -> StoreResult<()> {
        let mut script = self.script.lock().unwrap();
        script.probe_count += 1;
        script.probe_table.clone()
    }

    async fn probe_column(&self) -> StoreResult<()> {
        self.script.lock().unwrap().probe_column.clone()
    }

    async fn table_get(&self, user_id: &str) -> StoreResult<Option<Value>> {
        self.table_access()?;
        self.read(user_id)
    }

    async fn table_all(&self) -> StoreResult<HashMap<String, Value>> {
        self.table_access()?;
        self.read_all()
    }

    async fn table_upsert(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()> {
        self.table_access()?;
        self.write(user_id, Some(permissions))
    }

    async fn table_delete(&self, user_id: &str) -> StoreResult<()> {
        self.table_access()?;
        self.write(user_id, None)
    }

    async fn column_get(&self, user_id: &str) -> StoreResult<Option<Value>> {
        self.column_access()?;
        self.read(user_id)
    }

    async fn column_all(&self) -> StoreResult<HashMap<String, Value>> {
        self.column_access()?;
        self.read_all()
    }

    async fn column_update(&self, user_id: &str, permissions: &Permissions) -> StoreResult<()> {
        self.column_access()?;
        self.write(user_id, Some(permissions))
    }
}

// =============================================================================
// Scripted Profile Store
// =============================================================================

/// Profile store that reports "no profile yet" for the next `misses` reads,
/// then serves `appears` (or the wrapped store when `appears` is unset).
pub struct ScriptedProfileStore {
    inner: Arc<dyn ProfileStore>,
    misses: AtomicUsize,
    reads: AtomicUsize,
    appears: Mutex<Option<Profile>>,
}

impl ScriptedProfileStore {
    pub fn new(inner: Arc<dyn ProfileStore>) -> Self {
        ScriptedProfileStore {
            inner,
            misses: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            appears: Mutex::new(None),
        }
    }

    pub fn miss_next(&self, misses: usize) {
        self.misses.store(misses, Ordering::SeqCst);
    }

    /// Serves `profile` once the misses run out, without touching the
    /// wrapped store.
    pub fn appear_as(&self, profile: Profile) {
        *self.appears.lock().unwrap() = Some(profile);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for ScriptedProfileStore {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<Profile>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let missed = self
            .misses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if missed {
            return Ok(None);
        }
        let appears = self.appears.lock().unwrap().clone();
        match appears {
            Some(profile) => Ok(Some(profile)),
            None => self.inner.get_profile(id).await,
        }
    }

    async fn update_profile(
        &self,
        id: &str,
        full_name: &str,
        role: Role,
        email: Option<&str>,
    ) -> StoreResult<Profile> {
        self.inner.update_profile(id, full_name, role, email).await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        self.inner.list_profiles().await
    }

    async fn delete_profile(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_profile(id).await
    }
}

/// Builds a harness whose profile store is scripted, returning both.
pub async fn harness_with_scripted_profiles(
    settings: SessionSettings,
) -> (Harness, Arc<ScriptedProfileStore>) {
    let slot = Arc::new(OnceLock::<Arc<ScriptedProfileStore>>::new());
    let fill = slot.clone();
    let harness = harness_with_settings(settings, move |collaborators| {
        let scripted = Arc::new(ScriptedProfileStore::new(collaborators.profiles.clone()));
        let _ = fill.set(scripted.clone());
        collaborators.profiles = scripted as Arc<dyn ProfileStore>;
    })
    .await;
    let scripted = slot.get().unwrap().clone();
    (harness, scripted)
}

// =============================================================================
// Gated Sale Procedure
// =============================================================================

/// Wraps a sale procedure and parks every call until [`release`] is called.
///
/// [`release`]: GatedSaleProcedure::release
pub struct GatedSaleProcedure {
    inner: Arc<dyn SaleProcedure>,
    entered: Notify,
    gate: Notify,
}

impl GatedSaleProcedure {
    pub fn new(inner: Arc<dyn SaleProcedure>) -> Self {
        GatedSaleProcedure {
            inner,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Resolves once a call is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl SaleProcedure for GatedSaleProcedure {
    async fn complete_sale(
        &self,
        user_id: Option<&str>,
        request: &SaleRequest,
    ) -> StoreResult<String> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.complete_sale(user_id, request).await
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub controller: Arc<AppController>,
    pub db: Database,
    pub admin_id: String,
    pub staff_id: String,
}

pub async fn harness() -> Harness {
    harness_with(|_| {}).await
}

pub async fn harness_with_retry(attempts: u32, delay: Duration) -> Harness {
    let settings = SessionSettings {
        profile_retry_attempts: attempts,
        profile_retry_delay_ms: delay.as_millis() as u64,
        ..quick_settings()
    };
    harness_with_settings(settings, |_| {}).await
}

/// Harness whose collaborators can be swapped before the controller is built.
pub async fn harness_with(configure: impl FnOnce(&mut Collaborators)) -> Harness {
    harness_with_settings(quick_settings(), configure).await
}

pub async fn harness_with_settings(
    settings: SessionSettings,
    configure: impl FnOnce(&mut Collaborators),
) -> Harness {
    let db = seeded_db().await;
    build(
        db,
        |db| {
            let mut collaborators = Collaborators::sqlite(db);
            configure(&mut collaborators);
            collaborators
        },
        settings,
    )
    .await
}

pub fn quick_settings() -> SessionSettings {
    SessionSettings {
        profile_retry_attempts: 2,
        profile_retry_delay_ms: 1,
        onboarding_retry_attempts: 3,
        onboarding_retry_delay_ms: 1,
    }
}

async fn seeded_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn build(
    db: Database,
    collaborators: impl FnOnce(Database) -> Collaborators,
    settings: SessionSettings,
) -> Harness {
    let admin = db
        .auth()
        .create_account(ADMIN_EMAIL, ADMIN_PASSWORD, "Store Admin")
        .await
        .unwrap();
    db.profiles()
        .update(&admin.id, "Store Admin", Role::Admin, None)
        .await
        .unwrap();
    let staff = db
        .auth()
        .create_account(STAFF_EMAIL, STAFF_PASSWORD, "Counter Staff")
        .await
        .unwrap();

    let controller = Arc::new(AppController::new(collaborators(db.clone()), settings));
    Harness {
        controller,
        db,
        admin_id: admin.id,
        staff_id: staff.id,
    }
}

impl Harness {
    pub async fn sign_in_admin(&self) {
        self.controller
            .sign_in(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();
    }

    pub async fn sign_in_staff(&self) {
        self.controller
            .sign_in(STAFF_EMAIL, STAFF_PASSWORD)
            .await
            .unwrap();
    }

    /// Inserts a medicine expiring far in the future. Reloads the medicine
    /// list when a session is active.
    pub async fn seed_medicine(&self, sku: &str, name: &str, price_cents: i64, stock: i64) -> Medicine {
        self.insert_medicine(sku, name, price_cents, stock, NaiveDate::from_ymd_opt(2099, 12, 31))
            .await
    }

    /// Inserts a medicine that expired yesterday.
    pub async fn seed_expired_medicine(&self, sku: &str, name: &str, stock: i64) -> Medicine {
        let yesterday = Utc::now().date_naive().checked_sub_days(Days::new(1));
        self.insert_medicine(sku, name, 300, stock, yesterday).await
    }

    async fn insert_medicine(
        &self,
        sku: &str,
        name: &str,
        price_cents: i64,
        stock: i64,
        expiry: Option<NaiveDate>,
    ) -> Medicine {
        let medicine = self
            .db
            .medicines()
            .insert(&NewMedicine {
                sku: sku.to_string(),
                name: name.to_string(),
                category: "Analgesic".to_string(),
                price_cents,
                stock,
                expiry,
            })
            .await
            .unwrap();

        if self.controller.snapshot().await.phase == SessionPhase::Ready {
            self.controller.load_medicines().await.unwrap();
        }
        medicine
    }
}
