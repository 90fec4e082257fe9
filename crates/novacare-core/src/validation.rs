//! # Validation Module
//!
//! Input validation for the admin forms and the login form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Controller intent (novacare-pharmacy)                        │
//! │  ├── Role check (admin only)                                           │
//! │  └── THIS MODULE: trimming and business rule validation                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (sku, email)                                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators return the cleaned value so callers never use the raw input
//! after validation.
//!
//! ## Usage
//! ```rust
//! use novacare_core::validation::{validate_sku, validate_credentials};
//!
//! validate_sku("AMOX-500").unwrap();
//! let (email, _) = validate_credentials(" Admin@Pharmacy.test ", "secret").unwrap();
//! assert_eq!(email, "admin@pharmacy.test");
//! ```

use crate::error::ValidationError;
use crate::types::{MedicineUpdate, NewMedicine, StaffRegistration, StaffUpdate, TaxRate};
use crate::{MIN_PASSWORD_LENGTH, MIN_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use novacare_core::validation::validate_sku;
///
/// assert!(validate_sku("AMOX-500").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "SKU".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "SKU".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "SKU".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Normalizes an email address: trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Light shape check on an already normalized email.
fn validate_email_shape(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "Email".to_string(),
        reason: "must look like name@domain".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || email.contains(' ') {
        return Err(invalid());
    }
    Ok(())
}

// =============================================================================
// Medicine Forms
// =============================================================================

fn validate_price_and_stock(price_cents: i64, stock: i64) -> ValidationResult<()> {
    if price_cents < MIN_PRICE_CENTS {
        return Err(ValidationError::BelowMinimum {
            field: "Price".to_string(),
            min: "0.1".to_string(),
        });
    }

    if stock < 0 {
        return Err(ValidationError::Negative {
            field: "Stock".to_string(),
        });
    }

    Ok(())
}

/// Validates the "add medicine" form.
///
/// ## Rules
/// - `sku`, `name`, `category` (after trimming) and `expiry` are required
/// - Price at least 0.10
/// - Stock 0 or greater
///
/// ## User Workflow
/// ```text
/// Admin submits form
///      │
///      ▼
/// validate_new_medicine ← THIS FUNCTION
///      │
///      ├── blank field / no expiry? → "All fields are required."
///      ├── price < 0.10?            → "Price must be at least 0.1."
///      ├── stock < 0?               → "Stock must be 0 or greater."
///      │
///      └── OK → insert, reload inventory
/// ```
pub fn validate_new_medicine(input: &NewMedicine) -> ValidationResult<NewMedicine> {
    let cleaned = NewMedicine {
        sku: input.sku.trim().to_string(),
        name: input.name.trim().to_string(),
        category: input.category.trim().to_string(),
        price_cents: input.price_cents,
        stock: input.stock,
        expiry: input.expiry,
    };

    if cleaned.sku.is_empty()
        || cleaned.name.is_empty()
        || cleaned.category.is_empty()
        || cleaned.expiry.is_none()
    {
        return Err(ValidationError::missing("All fields are required."));
    }

    validate_price_and_stock(cleaned.price_cents, cleaned.stock)?;
    validate_sku(&cleaned.sku)?;

    Ok(cleaned)
}

/// Validates the "edit medicine" form. Expiry may be cleared.
pub fn validate_medicine_update(input: &MedicineUpdate) -> ValidationResult<MedicineUpdate> {
    let cleaned = MedicineUpdate {
        id: input.id.trim().to_string(),
        name: input.name.trim().to_string(),
        category: input.category.trim().to_string(),
        price_cents: input.price_cents,
        stock: input.stock,
        expiry: input.expiry,
    };

    if cleaned.id.is_empty() || cleaned.name.is_empty() || cleaned.category.is_empty() {
        return Err(ValidationError::missing("Name and category are required."));
    }

    validate_price_and_stock(cleaned.price_cents, cleaned.stock)?;

    Ok(cleaned)
}

// =============================================================================
// Settings
// =============================================================================

/// Validates a tax percentage from the settings form.
///
/// ## Rules
/// - Finite, between 0 and 100 inclusive
///
/// ## Example
/// ```rust
/// use novacare_core::validation::validate_tax_percentage;
///
/// assert_eq!(validate_tax_percentage(8.25).unwrap().bps(), 825);
/// assert!(validate_tax_percentage(120.0).is_err());
/// ```
pub fn validate_tax_percentage(pct: f64) -> ValidationResult<TaxRate> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "Tax rate".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(TaxRate::from_percentage(pct))
}

/// Validates a tax rate already in basis points (0 to 10000).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "Tax rate".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates an ISO 4217 currency code: three ASCII letters.
///
/// Returns the upper-cased code.
pub fn validate_currency_code(code: &str) -> ValidationResult<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "Currency".to_string(),
            reason: "must be a 3-letter ISO code".to_string(),
        });
    }
    Ok(code)
}

// =============================================================================
// Auth & Staff Forms
// =============================================================================

/// Validates login input. Returns the normalized email and the password.
pub fn validate_credentials(email: &str, password: &str) -> ValidationResult<(String, String)> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::missing("Email and password are required."));
    }
    Ok((email, password.to_string()))
}

/// Validates the staff registration form.
///
/// ## Rules
/// - Name, email and password required (after trimming name and email)
/// - Password at least 8 characters
/// - Email lower-cased
pub fn validate_staff_registration(
    input: &StaffRegistration,
) -> ValidationResult<StaffRegistration> {
    let full_name = input.full_name.trim().to_string();
    let email = normalize_email(&input.email);

    if full_name.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(ValidationError::missing(
            "Name, email, and password are required.",
        ));
    }

    if input.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "Password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    validate_email_shape(&email)?;

    Ok(StaffRegistration {
        full_name,
        email,
        password: input.password.clone(),
        role: input.role,
        permissions: crate::permissions::normalize_permissions(
            Some(&input.permissions.to_raw()),
            input.role,
        ),
    })
}

/// Validates the staff edit form.
pub fn validate_staff_update(input: &StaffUpdate) -> ValidationResult<StaffUpdate> {
    let profile_id = input.profile_id.trim().to_string();
    if profile_id.is_empty() {
        return Err(ValidationError::missing("Invalid staff account."));
    }

    let full_name = input.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(ValidationError::Required {
            field: "Name".to_string(),
        });
    }

    Ok(StaffUpdate {
        profile_id,
        full_name,
        role: input.role,
        permissions: input.permissions,
    })
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use novacare_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Permissions, STAFF_DEFAULT};
    use crate::types::Role;
    use chrono::NaiveDate;

    fn new_medicine() -> NewMedicine {
        NewMedicine {
            sku: "  AMOX-500 ".to_string(),
            name: " Amoxicillin 500mg ".to_string(),
            category: "Antibiotic".to_string(),
            price_cents: 1250,
            stock: 40,
            expiry: NaiveDate::from_ymd_opt(2027, 3, 1),
        }
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("AMOX-500").is_ok());
        assert!(validate_sku("vit_c").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_new_medicine_is_trimmed() {
        let cleaned = validate_new_medicine(&new_medicine()).unwrap();
        assert_eq!(cleaned.sku, "AMOX-500");
        assert_eq!(cleaned.name, "Amoxicillin 500mg");
    }

    #[test]
    fn test_new_medicine_requires_every_field() {
        for mutate in [
            (|m: &mut NewMedicine| m.sku = " ".to_string()) as fn(&mut NewMedicine),
            |m| m.name.clear(),
            |m| m.category = "\t".to_string(),
            |m| m.expiry = None,
        ] {
            let mut input = new_medicine();
            mutate(&mut input);
            let err = validate_new_medicine(&input).unwrap_err();
            assert_eq!(err.to_string(), "All fields are required.");
        }
    }

    #[test]
    fn test_new_medicine_price_and_stock_bounds() {
        let mut input = new_medicine();
        input.price_cents = 9;
        assert_eq!(
            validate_new_medicine(&input).unwrap_err().to_string(),
            "Price must be at least 0.1."
        );

        input.price_cents = 10;
        assert!(validate_new_medicine(&input).is_ok());

        input.stock = -1;
        assert_eq!(
            validate_new_medicine(&input).unwrap_err().to_string(),
            "Stock must be 0 or greater."
        );

        input.stock = 0;
        assert!(validate_new_medicine(&input).is_ok());
    }

    #[test]
    fn test_medicine_update() {
        let input = MedicineUpdate {
            id: "m1".to_string(),
            name: "Cetirizine".to_string(),
            category: " ".to_string(),
            price_cents: 300,
            stock: 5,
            expiry: None,
        };
        assert_eq!(
            validate_medicine_update(&input).unwrap_err().to_string(),
            "Name and category are required."
        );

        let input = MedicineUpdate {
            category: "Antihistamine".to_string(),
            ..input
        };
        let cleaned = validate_medicine_update(&input).unwrap();
        assert!(cleaned.expiry.is_none());
    }

    #[test]
    fn test_validate_tax_percentage() {
        assert_eq!(validate_tax_percentage(0.0).unwrap().bps(), 0);
        assert_eq!(validate_tax_percentage(100.0).unwrap().bps(), 10000);
        assert!(validate_tax_percentage(-0.5).is_err());
        assert!(validate_tax_percentage(100.01).is_err());
        assert!(validate_tax_percentage(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(825).is_ok());
        assert!(validate_tax_rate_bps(10000).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_currency_code() {
        assert_eq!(validate_currency_code(" eur ").unwrap(), "EUR");
        assert!(validate_currency_code("EURO").is_err());
        assert!(validate_currency_code("U$D").is_err());
    }

    #[test]
    fn test_validate_credentials() {
        let (email, password) = validate_credentials("  Staff@Shop.Test ", "pw").unwrap();
        assert_eq!(email, "staff@shop.test");
        assert_eq!(password, "pw");

        assert_eq!(
            validate_credentials("   ", "pw").unwrap_err().to_string(),
            "Email and password are required."
        );
        assert!(validate_credentials("a@b.c", "").is_err());
    }

    #[test]
    fn test_staff_registration() {
        let input = StaffRegistration {
            full_name: " Sam Lee ".to_string(),
            email: " SAM@Pharmacy.Test".to_string(),
            password: "longenough".to_string(),
            role: Role::Staff,
            permissions: STAFF_DEFAULT,
        };
        let cleaned = validate_staff_registration(&input).unwrap();
        assert_eq!(cleaned.full_name, "Sam Lee");
        assert_eq!(cleaned.email, "sam@pharmacy.test");

        let short = StaffRegistration {
            password: "short".to_string(),
            ..input.clone()
        };
        assert_eq!(
            validate_staff_registration(&short).unwrap_err().to_string(),
            "Password must be at least 8 characters."
        );

        let blank = StaffRegistration {
            email: "  ".to_string(),
            ..input.clone()
        };
        assert_eq!(
            validate_staff_registration(&blank).unwrap_err().to_string(),
            "Name, email, and password are required."
        );

        let admin = StaffRegistration {
            role: Role::Admin,
            permissions: STAFF_DEFAULT,
            ..input
        };
        assert_eq!(
            validate_staff_registration(&admin).unwrap().permissions,
            Permissions::all()
        );
    }

    #[test]
    fn test_staff_update() {
        let input = StaffUpdate {
            profile_id: "p1".to_string(),
            full_name: "   ".to_string(),
            role: Role::Staff,
            permissions: STAFF_DEFAULT,
        };
        assert_eq!(
            validate_staff_update(&input).unwrap_err().to_string(),
            "Name is required."
        );

        let input = StaffUpdate {
            profile_id: " ".to_string(),
            full_name: "Sam".to_string(),
            ..input
        };
        assert_eq!(
            validate_staff_update(&input).unwrap_err().to_string(),
            "Invalid staff account."
        );
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
