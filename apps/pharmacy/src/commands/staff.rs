//! # Staff Commands
//!
//! Admin-only management of operator accounts and their page permissions.
//!
//! ## Registration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Staff Onboarding                                     │
//! │                                                                         │
//! │  validate form ──► isolated auth client ──► sign_up(email, password)    │
//! │                    (admin session untouched)        │                   │
//! │                                                     ▼                   │
//! │                                   poll profiles for the new id          │
//! │                                   (row is created by a trigger)         │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │             update role/name/email ──► persist permissions              │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │                            reload staff list ──► success notice         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::{debug, info};

use crate::controller::AppController;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::permissions::PersistOutcome;
use crate::state::Notice;
use novacare_core::permissions::Permissions;
use novacare_core::types::{Profile, StaffMember, StaffRegistration, StaffUpdate};
use novacare_core::validation::{validate_staff_registration, validate_staff_update};

/// A saved staff account with the permissions that apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffSaved {
    pub profile: Profile,
    pub permissions: Permissions,
    /// `false` when the deployment has nowhere to store permissions.
    pub persisted: bool,
    pub message: Option<String>,
}

impl StaffSaved {
    fn new(profile: Profile, outcome: PersistOutcome) -> Self {
        StaffSaved {
            profile,
            permissions: outcome.permissions,
            persisted: outcome.persisted,
            message: outcome.message,
        }
    }

    /// `"{prefix} {message}"` when permissions were not stored.
    fn notice(&self, stored: &str, prefix: &str) -> String {
        match (&self.message, self.persisted) {
            (Some(message), false) => format!("{} {}", prefix, message),
            _ => stored.to_string(),
        }
    }
}

impl AppController {
    /// Reloads every profile with its permissions.
    pub async fn load_staff(&self, show_success: bool) -> ApiResult<Vec<StaffMember>> {
        self.require_admin("Only admins can view staff users.").await?;
        let staff = self.refresh_staff(self.generation(), false).await?;
        if show_success {
            self.notify(Notice::success("Staff list refreshed.")).await;
        }
        Ok(staff)
    }

    /// Fetches profiles (newest first) and their permissions. Failures are
    /// posted as notices unless `silent`.
    pub(crate) async fn refresh_staff(
        &self,
        generation: u64,
        silent: bool,
    ) -> ApiResult<Vec<StaffMember>> {
        let loaded = match self.collaborators.profiles.list_profiles().await {
            Ok(profiles) => self.resolver.load_staff_permissions(profiles).await,
            Err(e) => Err(e),
        };

        match loaded {
            Ok(staff) => {
                let mut state = self.state.write().await;
                if self.is_current(generation) {
                    debug!(count = staff.len(), "Staff loaded");
                    state.staff = staff.clone();
                }
                Ok(staff)
            }
            Err(e) if silent => {
                debug!(error = %e, "Silent staff reload failed");
                Err(ApiError::from(e))
            }
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Creates a login and profile for a new operator.
    pub async fn register_staff(&self, input: StaffRegistration) -> ApiResult<StaffSaved> {
        self.require_admin("Only admins can register staff.").await?;
        let input = match validate_staff_registration(&input) {
            Ok(input) => input,
            Err(e) => return Err(self.fail(e).await),
        };

        let onboarding = self.collaborators.auth.create_isolated_client();
        let user_id = match onboarding
            .sign_up(&input.email, &input.password, &input.full_name)
            .await
        {
            Ok(id) if !id.trim().is_empty() => id,
            Ok(_) => {
                return Err(self
                    .fail(ApiError::validation("Unable to create staff account."))
                    .await)
            }
            Err(e) => return Err(self.fail(e).await),
        };
        debug!(user_id = %user_id, "Staff identity created");

        if let Err(e) = self.wait_for_profile(&user_id).await {
            return Err(self.fail(e).await);
        }

        let profile = match self
            .collaborators
            .profiles
            .update_profile(&user_id, &input.full_name, input.role, Some(&input.email))
            .await
        {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(e).await),
        };

        let outcome = match self
            .resolver
            .persist_permissions(&user_id, input.role, &input.permissions)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(user_id = %user_id, role = input.role.as_str(), "Staff registered");

        let _ = self.refresh_staff(self.generation(), true).await;
        let saved = StaffSaved::new(profile, outcome);
        self.notify(Notice::success(
            saved.notice("Staff account registered.", "Staff account registered."),
        ))
        .await;
        Ok(saved)
    }

    /// Polls for the trigger-created profile of a new identity.
    async fn wait_for_profile(&self, user_id: &str) -> ApiResult<()> {
        let attempts = self.session_settings.onboarding_retry_attempts.max(1);
        let delay = self.session_settings.onboarding_retry_delay();

        for attempt in 1..=attempts {
            if self.collaborators.profiles.get_profile(user_id).await?.is_some() {
                return Ok(());
            }
            debug!(user_id = %user_id, attempt, "Staff profile not created yet");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }

        Err(ApiError::new(
            ErrorCode::Backend,
            "Staff profile was not created yet. Please try again.",
        ))
    }

    /// Updates name, role and permissions. The email is left alone.
    pub async fn update_staff(&self, input: StaffUpdate) -> ApiResult<StaffSaved> {
        let admin = self.require_admin("Only admins can update staff users.").await?;
        let input = match validate_staff_update(&input) {
            Ok(input) => input,
            Err(e) => return Err(self.fail(e).await),
        };

        let profile = match self
            .collaborators
            .profiles
            .update_profile(&input.profile_id, &input.full_name, input.role, None)
            .await
        {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(e).await),
        };

        let outcome = match self
            .resolver
            .persist_permissions(&input.profile_id, input.role, &input.permissions)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e).await),
        };
        info!(profile_id = %input.profile_id, role = input.role.as_str(), "Staff updated");

        if admin.id == input.profile_id {
            let mut state = self.state.write().await;
            state.profile = Some(profile.clone());
            state.permissions = outcome.permissions;
        }

        let _ = self.refresh_staff(self.generation(), true).await;
        let saved = StaffSaved::new(profile, outcome);
        self.notify(Notice::success(
            saved.notice("Staff account updated.", "Staff updated."),
        ))
        .await;
        Ok(saved)
    }

    /// Deletes a profile and, when permissions live in their own table, its
    /// permission row. The auth identity is kept. `label` is only used for
    /// the confirmation notice.
    pub async fn delete_staff(&self, profile_id: &str, label: Option<&str>) -> ApiResult<()> {
        let admin = self.require_admin("Only admins can delete staff users.").await?;
        let profile_id = profile_id.trim();
        if profile_id.is_empty() {
            return Err(self
                .fail(ApiError::validation("Invalid staff account."))
                .await);
        }
        if profile_id == admin.id {
            return Err(self
                .fail(ApiError::validation("You cannot delete your own account."))
                .await);
        }

        if let Err(e) = self.resolver.delete_permissions(profile_id).await {
            return Err(self.fail(e).await);
        }
        if let Err(e) = self.collaborators.profiles.delete_profile(profile_id).await {
            return Err(self.fail(e).await);
        }
        info!(profile_id = %profile_id, "Staff deleted");

        let _ = self.refresh_staff(self.generation(), true).await;
        let label = label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("Staff account");
        self.notify(Notice::success(format!("{} deleted.", label)))
            .await;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::permissions::PERMISSION_BACKEND_NONE_MESSAGE;
    use crate::ports::PermissionStore;
    use crate::state::NoticeKind;
    use crate::testing::{self, ScriptedPermissionStore, ADMIN_EMAIL};
    use novacare_core::permissions::{PageKey, STAFF_DEFAULT};
    use novacare_core::types::Role;

    fn registration(email: &str) -> StaffRegistration {
        let mut permissions = STAFF_DEFAULT;
        permissions.finance = false;
        StaffRegistration {
            full_name: "  Night Shift ".to_string(),
            email: email.to_string(),
            password: "night-shift-pass".to_string(),
            role: Role::Staff,
            permissions,
        }
    }

    #[tokio::test]
    async fn test_staff_cannot_manage_staff() {
        let harness = testing::harness().await;
        harness.sign_in_staff().await;
        let controller = &harness.controller;

        let err = controller
            .register_staff(registration("night@novacare.test"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "Only admins can register staff.");

        let err = controller.delete_staff(&harness.admin_id, None).await.unwrap_err();
        assert_eq!(err.message, "Only admins can delete staff users.");
    }

    #[tokio::test]
    async fn test_load_staff_with_success_notice() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;

        let staff = harness.controller.load_staff(true).await.unwrap();
        assert_eq!(staff.len(), 2);
        assert_eq!(
            harness.controller.notice().await.unwrap().message,
            "Staff list refreshed."
        );
    }

    #[tokio::test]
    async fn test_register_staff_keeps_admin_session() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;
        let controller = &harness.controller;

        let saved = controller
            .register_staff(registration(" Night@NovaCare.test "))
            .await
            .unwrap();

        assert!(saved.persisted);
        assert_eq!(saved.profile.email, "night@novacare.test");
        assert_eq!(saved.profile.full_name, "Night Shift");
        assert!(!saved.permissions.allows(PageKey::Finance));

        let state = controller.snapshot().await;
        assert_eq!(state.profile.as_ref().unwrap().email, ADMIN_EMAIL);
        assert_eq!(state.session.as_ref().unwrap().email, ADMIN_EMAIL);
        assert_eq!(state.staff.len(), 3);
        let member = state
            .staff
            .iter()
            .find(|m| m.profile.id == saved.profile.id)
            .unwrap();
        assert!(!member.permissions.finance);
        assert_eq!(state.notice.unwrap().message, "Staff account registered.");
    }

    #[tokio::test]
    async fn test_register_staff_waits_for_lagging_profile() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(testing::quick_settings()).await;
        harness.sign_in_admin().await;
        let reads_before = profiles.reads();
        profiles.miss_next(2);

        let saved = harness
            .controller
            .register_staff(registration("late@novacare.test"))
            .await
            .unwrap();

        assert_eq!(saved.profile.email, "late@novacare.test");
        assert!(profiles.reads() - reads_before >= 3);
        assert_eq!(
            harness.controller.notice().await.unwrap().message,
            "Staff account registered."
        );
    }

    #[tokio::test]
    async fn test_register_staff_gives_up_when_profile_never_appears() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(testing::quick_settings()).await;
        harness.sign_in_admin().await;
        profiles.miss_next(5);

        let err = harness
            .controller
            .register_staff(registration("ghost@novacare.test"))
            .await
            .unwrap_err();

        assert_eq!(
            err.message,
            "Staff profile was not created yet. Please try again."
        );
        let state = harness.controller.snapshot().await;
        assert_eq!(state.profile.unwrap().email, ADMIN_EMAIL);
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;
        let controller = &harness.controller;

        let mut input = registration("short@novacare.test");
        input.password = "short".to_string();
        let err = controller.register_staff(input).await.unwrap_err();
        assert_eq!(err.message, "Password must be at least 8 characters.");

        let mut input = registration("");
        input.email = " ".to_string();
        let err = controller.register_staff(input).await.unwrap_err();
        assert_eq!(err.message, "Name, email, and password are required.");

        let err = controller
            .register_staff(registration(ADMIN_EMAIL))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Auth);
        assert_eq!(err.message, "User already registered");
    }

    #[tokio::test]
    async fn test_register_without_permission_storage() {
        let harness = testing::harness_with(|collaborators| {
            collaborators.permissions =
                Arc::new(ScriptedPermissionStore::unsupported()) as Arc<dyn PermissionStore>;
        })
        .await;
        harness.sign_in_admin().await;

        let saved = harness
            .controller
            .register_staff(registration("night@novacare.test"))
            .await
            .unwrap();

        assert!(!saved.persisted);
        let notice = harness.controller.notice().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(
            notice.message,
            format!("Staff account registered. {}", PERMISSION_BACKEND_NONE_MESSAGE)
        );
    }

    #[tokio::test]
    async fn test_update_staff() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;
        let controller = &harness.controller;

        let mut permissions = STAFF_DEFAULT;
        permissions.settings = true;
        let saved = controller
            .update_staff(StaffUpdate {
                profile_id: harness.staff_id.clone(),
                full_name: "Lead Cashier".to_string(),
                role: Role::Staff,
                permissions,
            })
            .await
            .unwrap();

        assert_eq!(saved.profile.full_name, "Lead Cashier");
        assert!(saved.permissions.settings);
        assert_eq!(
            controller.notice().await.unwrap().message,
            "Staff account updated."
        );

        let err = controller
            .update_staff(StaffUpdate {
                profile_id: harness.staff_id.clone(),
                full_name: "  ".to_string(),
                role: Role::Staff,
                permissions,
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "Name is required.");

        let err = controller
            .update_staff(StaffUpdate {
                profile_id: String::new(),
                full_name: "Someone".to_string(),
                role: Role::Staff,
                permissions,
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid staff account.");
    }

    #[tokio::test]
    async fn test_update_self_refreshes_own_profile() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;

        harness
            .controller
            .update_staff(StaffUpdate {
                profile_id: harness.admin_id.clone(),
                full_name: "Head Pharmacist".to_string(),
                role: Role::Admin,
                permissions: STAFF_DEFAULT,
            })
            .await
            .unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.profile.unwrap().full_name, "Head Pharmacist");
        assert!(state.permissions.settings);
    }

    #[tokio::test]
    async fn test_delete_staff() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;
        let controller = &harness.controller;

        let err = controller.delete_staff(&harness.admin_id, None).await.unwrap_err();
        assert_eq!(err.message, "You cannot delete your own account.");

        let err = controller.delete_staff("", None).await.unwrap_err();
        assert_eq!(err.message, "Invalid staff account.");

        controller
            .delete_staff(&harness.staff_id, Some("Counter Staff"))
            .await
            .unwrap();

        let state = controller.snapshot().await;
        assert_eq!(state.staff.len(), 1);
        assert_eq!(state.notice.unwrap().message, "Counter Staff deleted.");
        assert!(harness.db.profiles().get(&harness.staff_id).await.unwrap().is_none());
    }
}
