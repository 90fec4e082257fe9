//! # Permission Model
//!
//! Page-level access flags and the normalization applied to whatever raw
//! shape storage hands back.
//!
//! ## Normalization
//! ```text
//! role = admin ─────────────────────────────► all true
//!
//! role = staff
//!   raw not an object (null, missing, text) ─► staff defaults
//!   raw object
//!     for each page key:
//!       key missing ─────────────────────────► staff default for that key
//!       key present ─────────────────────────► truthiness of the value
//!     unknown keys ──────────────────────────► ignored
//! ```
//!
//! Truthiness follows the loose rules JSON producers expect: `null`, `false`,
//! `0`, `NaN`-like non-finite numbers and `""` are false; everything else,
//! including empty arrays and objects, is true.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::types::Role;

// =============================================================================
// Page Key
// =============================================================================

/// A page that can be granted or withheld.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PageKey {
    Dashboard,
    Pos,
    Inventory,
    Finance,
    Settings,
}

impl PageKey {
    /// Every page, in navigation order.
    pub const ALL: [PageKey; 5] = [
        PageKey::Dashboard,
        PageKey::Pos,
        PageKey::Inventory,
        PageKey::Finance,
        PageKey::Settings,
    ];

    /// Key used in the raw permission object.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKey::Dashboard => "dashboard",
            PageKey::Pos => "pos",
            PageKey::Inventory => "inventory",
            PageKey::Finance => "finance",
            PageKey::Settings => "settings",
        }
    }

    /// Navigation title.
    pub fn title(&self) -> &'static str {
        match self {
            PageKey::Dashboard => "Dashboard",
            PageKey::Pos => "Point of Sale",
            PageKey::Inventory => "Inventory",
            PageKey::Finance => "Finance",
            PageKey::Settings => "Settings",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        PageKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
    }
}

// =============================================================================
// Permissions
// =============================================================================

/// Resolved page access for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Permissions {
    pub dashboard: bool,
    pub pos: bool,
    pub inventory: bool,
    pub finance: bool,
    pub settings: bool,
}

/// Defaults for staff without an override.
pub const STAFF_DEFAULT: Permissions = Permissions {
    dashboard: true,
    pos: true,
    inventory: true,
    finance: true,
    settings: false,
};

impl Permissions {
    /// Full access, used for admins.
    pub const fn all() -> Self {
        Permissions {
            dashboard: true,
            pos: true,
            inventory: true,
            finance: true,
            settings: true,
        }
    }

    /// Staff defaults.
    pub const fn staff_default() -> Self {
        STAFF_DEFAULT
    }

    /// Role default: all true for admins, [`STAFF_DEFAULT`] otherwise.
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::all(),
            Role::Staff => STAFF_DEFAULT,
        }
    }

    /// Whether the flag for `page` is set.
    pub fn allows(&self, page: PageKey) -> bool {
        match page {
            PageKey::Dashboard => self.dashboard,
            PageKey::Pos => self.pos,
            PageKey::Inventory => self.inventory,
            PageKey::Finance => self.finance,
            PageKey::Settings => self.settings,
        }
    }

    pub fn set(&mut self, page: PageKey, allowed: bool) {
        match page {
            PageKey::Dashboard => self.dashboard = allowed,
            PageKey::Pos => self.pos = allowed,
            PageKey::Inventory => self.inventory = allowed,
            PageKey::Finance => self.finance = allowed,
            PageKey::Settings => self.settings = allowed,
        }
    }

    /// Raw JSON object form, as written to storage.
    ///
    /// `normalize_permissions(Some(&p.to_raw()), Role::Staff) == p` for every `p`.
    pub fn to_raw(&self) -> Value {
        let map: Map<String, Value> = PageKey::ALL
            .into_iter()
            .map(|key| (key.as_str().to_string(), Value::Bool(self.allows(key))))
            .collect();
        Value::Object(map)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        STAFF_DEFAULT
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Turns a raw stored value into a full permission set.
///
/// Total: never fails, whatever `raw` holds.
///
/// ## Example
/// ```rust
/// use novacare_core::permissions::{normalize_permissions, PageKey};
/// use novacare_core::types::Role;
/// use serde_json::json;
///
/// let raw = json!({ "finance": 0, "settings": "yes" });
/// let perms = normalize_permissions(Some(&raw), Role::Staff);
/// assert!(!perms.allows(PageKey::Finance));
/// assert!(perms.allows(PageKey::Settings));
/// assert!(perms.allows(PageKey::Pos)); // default
/// ```
pub fn normalize_permissions(raw: Option<&Value>, role: Role) -> Permissions {
    if role.is_admin() {
        return Permissions::all();
    }

    let Some(Value::Object(map)) = raw else {
        return STAFF_DEFAULT;
    };

    let mut permissions = STAFF_DEFAULT;
    for key in PageKey::ALL {
        if let Some(value) = map.get(key.as_str()) {
            permissions.set(key, is_truthy(value));
        }
    }
    permissions
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_is_always_all_true() {
        let raw = json!({ "dashboard": false, "settings": false });
        assert_eq!(
            normalize_permissions(Some(&raw), Role::Admin),
            Permissions::all()
        );
        assert_eq!(normalize_permissions(None, Role::Admin), Permissions::all());
    }

    #[test]
    fn test_missing_or_non_object_raw_uses_staff_defaults() {
        assert_eq!(normalize_permissions(None, Role::Staff), STAFF_DEFAULT);
        assert_eq!(
            normalize_permissions(Some(&Value::Null), Role::Staff),
            STAFF_DEFAULT
        );
        assert_eq!(
            normalize_permissions(Some(&json!("all")), Role::Staff),
            STAFF_DEFAULT
        );
        assert_eq!(
            normalize_permissions(Some(&json!([true, false])), Role::Staff),
            STAFF_DEFAULT
        );
    }

    #[test]
    fn test_present_keys_override_defaults() {
        let raw = json!({ "settings": true, "finance": false });
        let perms = normalize_permissions(Some(&raw), Role::Staff);

        assert!(perms.dashboard);
        assert!(perms.pos);
        assert!(perms.inventory);
        assert!(!perms.finance);
        assert!(perms.settings);
    }

    #[test]
    fn test_truthiness_coercion() {
        let raw = json!({
            "dashboard": 0,
            "pos": "",
            "inventory": null,
            "finance": 1,
            "settings": "false"
        });
        let perms = normalize_permissions(Some(&raw), Role::Staff);

        assert!(!perms.dashboard);
        assert!(!perms.pos);
        assert!(!perms.inventory);
        assert!(perms.finance);
        // Non-empty string is truthy, whatever it says.
        assert!(perms.settings);

        let raw = json!({ "dashboard": [], "pos": {} });
        let perms = normalize_permissions(Some(&raw), Role::Staff);
        assert!(perms.dashboard);
        assert!(perms.pos);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let raw = json!({ "reports": false, "admin": true });
        assert_eq!(normalize_permissions(Some(&raw), Role::Staff), STAFF_DEFAULT);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            json!({ "settings": true }),
            json!({ "dashboard": 0, "pos": "x" }),
            Value::Null,
        ];
        for raw in inputs {
            let once = normalize_permissions(Some(&raw), Role::Staff);
            let twice = normalize_permissions(Some(&once.to_raw()), Role::Staff);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_to_raw_has_every_key() {
        let raw = STAFF_DEFAULT.to_raw();
        let map = raw.as_object().unwrap();
        assert_eq!(map.len(), 5);
        assert_eq!(map["settings"], json!(false));
        assert_eq!(map["pos"], json!(true));
    }

    #[test]
    fn test_page_key_parse() {
        assert_eq!(PageKey::parse("pos"), Some(PageKey::Pos));
        assert_eq!(PageKey::parse("reports"), None);
    }
}
