//! # Session Bridge
//!
//! Turns auth state changes into application state: resolves the profile,
//! loads role-scoped data and tears everything down on sign-out.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                                  │
//! │                                                                         │
//! │  SignedOut ──sign_in()──► Authenticating                                │
//! │      ▲                         │ provider ok                            │
//! │      │                         ▼                                        │
//! │      │                   ProfileLoading ── profile missing ──┐          │
//! │      │                         │ profile found (with retry)   │          │
//! │      │                         ▼                              │          │
//! │      │                       Ready ── load_all() (role scoped)│          │
//! │      │                         │                              │          │
//! │      └──── sign_out() / SIGNED_OUT ◄──────────────────────────┘          │
//! │                                                                         │
//! │  GENERATION GUARD                                                       │
//! │  Every session change bumps the controller generation. Async results    │
//! │  fetched under an older generation are dropped, so a slow load from    │
//! │  user A never lands in user B's session.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::controller::AppController;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::ports::{AuthEvent, AuthEventKind, Session};
use crate::state::Notice;
use novacare_core::types::Profile;
use novacare_core::validation::validate_credentials;

pub const PROFILE_MISSING_MESSAGE: &str = "Account profile is missing or disabled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    SignedOut,
    Authenticating,
    ProfileLoading,
    Ready,
}

impl AppController {
    // =========================================================================
    // Intents
    // =========================================================================

    /// Password sign-in.
    ///
    /// The email is normalized first. Provider errors are shown verbatim.
    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<()> {
        let (email, password) = match validate_credentials(email, password) {
            Ok(credentials) => credentials,
            Err(e) => return Err(self.fail(e).await),
        };

        {
            let mut state = self.state.write().await;
            if state.phase == SessionPhase::SignedOut {
                state.phase = SessionPhase::Authenticating;
            }
        }

        match self.collaborators.auth.sign_in(&email, &password).await {
            Ok(session) => self.apply_session(Some(session)).await,
            Err(e) => {
                {
                    let mut state = self.state.write().await;
                    if state.phase == SessionPhase::Authenticating {
                        state.phase = SessionPhase::SignedOut;
                    }
                }
                Err(self
                    .fail(ApiError::from(e).with_fallback("Authentication failed."))
                    .await)
            }
        }
    }

    /// Ends the session and clears search, cart, payment method and
    /// permissions. Local state is cleared even when the provider fails.
    pub async fn sign_out(&self) -> ApiResult<()> {
        let result = self.collaborators.auth.sign_out().await;

        self.next_generation();
        self.state.write().await.clear_session();
        self.session_settled.notify_waiters();
        info!("Session cleared");

        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e).await),
        }
    }

    /// Picks up an existing provider session at startup.
    pub async fn bootstrap(&self) -> ApiResult<()> {
        match self.collaborators.auth.current_session().await {
            Ok(session) => {
                self.handle_auth_event(AuthEvent::new(AuthEventKind::InitialSession, session))
                    .await
            }
            Err(e) => {
                self.next_generation();
                self.state.write().await.clear_session();
                self.session_settled.notify_waiters();
                Err(self
                    .fail(ApiError::from(e).with_fallback("Authentication failed."))
                    .await)
            }
        }
    }

    /// Applies one auth state change.
    pub async fn handle_auth_event(&self, event: AuthEvent) -> ApiResult<()> {
        debug!(kind = ?event.kind, "Auth event");
        self.apply_session(event.session).await
    }

    /// Forwards provider auth events to [`handle_auth_event`] until the
    /// provider's channel closes or the controller is dropped.
    ///
    /// [`handle_auth_event`]: AppController::handle_auth_event
    pub fn spawn_auth_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.collaborators.auth.subscribe();
        let controller = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(controller) = controller.upgrade() else {
                            break;
                        };
                        if let Err(e) = controller.handle_auth_event(event).await {
                            debug!(error = %e, "Auth event handling failed");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth listener lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Auth listener stopped");
        })
    }

    // =========================================================================
    // Session Application
    // =========================================================================

    async fn apply_session(&self, session: Option<Session>) -> ApiResult<()> {
        let Some(session) = session else {
            self.next_generation();
            self.state.write().await.clear_session();
            self.session_settled.notify_waiters();
            return Ok(());
        };

        let generation = {
            let mut state = self.state.write().await;
            let same_identity = state.phase != SessionPhase::SignedOut
                && state
                    .session
                    .as_ref()
                    .is_some_and(|current| current.user_id == session.user_id);
            if same_identity {
                // Token refresh or a repeated sign-in for the active identity.
                let settled = state.phase == SessionPhase::Ready && !state.loading;
                state.session = Some(session.clone());
                drop(state);
                if settled {
                    return Ok(());
                }
                return self.wait_until_settled().await;
            }

            let generation = self.next_generation();
            state.clear_session();
            state.session = Some(session.clone());
            state.phase = SessionPhase::ProfileLoading;
            generation
        };

        let profile = self.load_profile(&session.user_id, generation).await;
        if !self.is_current(generation) {
            debug!(user_id = %session.user_id, "Session superseded while loading profile");
            return Ok(());
        }

        match profile {
            Some(profile) => {
                {
                    let mut state = self.state.write().await;
                    state.profile = Some(profile.clone());
                    state.phase = SessionPhase::Ready;
                    state.loading = true;
                }
                info!(user_id = %profile.id, role = profile.role.as_str(), "Session ready");
                self.load_all(&profile, generation).await;
                self.session_settled.notify_waiters();
                Ok(())
            }
            None => {
                warn!(user_id = %session.user_id, "No profile for session; signing out");
                if let Err(e) = self.collaborators.auth.sign_out().await {
                    warn!(error = %e, "Sign-out after missing profile failed");
                }
                self.next_generation();
                self.state.write().await.clear_session();
                let err = self
                    .fail(ApiError::new(ErrorCode::ProfileMissing, PROFILE_MISSING_MESSAGE))
                    .await;
                self.session_settled.notify_waiters();
                Err(err)
            }
        }
    }

    /// Waits for a load started by someone else (usually the auth listener
    /// reacting to the same sign-in) to finish, and reports its outcome.
    async fn wait_until_settled(&self) -> ApiResult<()> {
        loop {
            let settled = self.session_settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();

            {
                let state = self.state.read().await;
                match state.phase {
                    SessionPhase::SignedOut => {
                        return Err(ApiError::new(
                            ErrorCode::ProfileMissing,
                            PROFILE_MISSING_MESSAGE,
                        ))
                    }
                    SessionPhase::Ready if !state.loading => return Ok(()),
                    _ => {}
                }
            }

            settled.await;
        }
    }

    /// Reads the profile, retrying while it does not exist yet. A freshly
    /// registered identity gets its profile row asynchronously. A fetch error
    /// is posted as a notice and counts as no profile.
    async fn load_profile(&self, user_id: &str, generation: u64) -> Option<Profile> {
        let attempts = self.session_settings.profile_retry_attempts.max(1);
        let delay = self.session_settings.profile_retry_delay();

        for attempt in 1..=attempts {
            if !self.is_current(generation) {
                return None;
            }
            match self.collaborators.profiles.get_profile(user_id).await {
                Ok(Some(profile)) => return Some(profile),
                Ok(None) if attempt < attempts => {
                    debug!(user_id = %user_id, attempt, "Profile not found yet; retrying");
                    tokio::time::sleep(delay).await;
                }
                Ok(None) => {}
                Err(e) => {
                    self.fail(e).await;
                    return None;
                }
            }
        }
        None
    }

    /// Role-scoped data load.
    ///
    /// ```text
    /// admin: permissions ║ settings ║ medicines ║ transactions ║ staff
    /// staff: permissions ║ settings ║ medicines ║ transactions   (staff list cleared)
    /// ```
    async fn load_all(&self, profile: &Profile, generation: u64) {
        // Failures are posted as notices by each loader.
        if profile.is_admin() {
            let _ = tokio::join!(
                self.apply_permissions(profile, generation),
                self.refresh_settings(generation),
                self.refresh_medicines(generation),
                self.refresh_transactions(generation),
                self.refresh_staff(generation, true),
            );
        } else {
            self.state.write().await.staff.clear();
            let _ = tokio::join!(
                self.apply_permissions(profile, generation),
                self.refresh_settings(generation),
                self.refresh_medicines(generation),
                self.refresh_transactions(generation),
            );
        }

        if self.is_current(generation) {
            self.state.write().await.loading = false;
        }
    }

    async fn apply_permissions(&self, profile: &Profile, generation: u64) {
        let load = self.resolver.load_permissions(profile).await;
        if !self.is_current(generation) {
            return;
        }
        self.state.write().await.permissions = load.permissions;
        if let Some(message) = load.notice {
            self.notify(Notice::error(message)).await;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NoticeKind;
    use crate::config::SessionSettings;
    use crate::testing::{self, ADMIN_EMAIL, ADMIN_PASSWORD, STAFF_EMAIL, STAFF_PASSWORD};
    use novacare_core::permissions::{PageKey, Permissions, STAFF_DEFAULT};
    use novacare_core::types::Role;
    use std::time::Duration;
    use tokio::time::Instant;

    fn retry_settings(attempts: u32, delay_ms: u64) -> SessionSettings {
        SessionSettings {
            profile_retry_attempts: attempts,
            profile_retry_delay_ms: delay_ms,
            ..testing::quick_settings()
        }
    }

    fn staff_session(harness: &testing::Harness) -> Session {
        Session {
            user_id: harness.staff_id.clone(),
            email: STAFF_EMAIL.to_string(),
            access_token: "staff-token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_requires_credentials() {
        let harness = testing::harness().await;
        let err = harness.controller.sign_in("  ", "").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::Validation);
        assert_eq!(err.message, "Email and password are required.");
        assert_eq!(
            harness.controller.snapshot().await.phase,
            SessionPhase::SignedOut
        );
    }

    #[tokio::test]
    async fn test_sign_in_shows_provider_error() {
        let harness = testing::harness().await;
        let err = harness
            .controller
            .sign_in(ADMIN_EMAIL, "wrong-password")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Auth);
        assert_eq!(err.message, "Invalid login credentials");
        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::SignedOut);
        assert_eq!(state.notice.unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_admin_sign_in_loads_everything() {
        let harness = testing::harness().await;
        harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 20).await;

        harness
            .controller
            .sign_in("  Admin@NovaCare.test ", ADMIN_PASSWORD)
            .await
            .unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::Ready);
        assert_eq!(state.profile.as_ref().unwrap().id, harness.admin_id);
        assert_eq!(state.permissions, Permissions::all());
        assert_eq!(state.medicines.len(), 1);
        assert_eq!(state.staff.len(), 2);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_staff_sign_in_skips_staff_list() {
        let harness = testing::harness().await;
        harness
            .controller
            .sign_in(STAFF_EMAIL, STAFF_PASSWORD)
            .await
            .unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::Ready);
        assert!(state.staff.is_empty());
        assert_eq!(state.permissions, STAFF_DEFAULT);
        assert!(!state.can_access(PageKey::Settings));
    }

    #[tokio::test]
    async fn test_sign_out_clears_counter_state() {
        let harness = testing::harness().await;
        let medicine = harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 20).await;
        harness.sign_in_admin().await;
        harness.controller.add_to_cart(&medicine.id).await.unwrap();
        harness.controller.set_search("para").await;

        harness.controller.sign_out().await.unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::SignedOut);
        assert!(state.cart.is_empty());
        assert!(state.search.is_empty());
        assert!(state.profile.is_none());
        assert_eq!(state.permissions, STAFF_DEFAULT);
    }

    #[tokio::test]
    async fn test_missing_profile_signs_out() {
        let harness = testing::harness_with_retry(2, Duration::from_millis(1)).await;
        harness.db.profiles().delete(&harness.staff_id).await.unwrap();

        let err = harness
            .controller
            .sign_in(STAFF_EMAIL, STAFF_PASSWORD)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ProfileMissing);
        assert_eq!(err.message, PROFILE_MISSING_MESSAGE);
        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::SignedOut);
        assert_eq!(state.notice.unwrap().message, PROFILE_MISSING_MESSAGE);
        assert!(harness
            .controller
            .collaborators
            .auth
            .current_session()
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_signed_out_event_clears_state() {
        let harness = testing::harness().await;
        harness.sign_in_admin().await;

        harness
            .controller
            .handle_auth_event(AuthEvent::new(AuthEventKind::SignedOut, None))
            .await
            .unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::SignedOut);
        assert!(state.profile.is_none());
    }

    #[tokio::test]
    async fn test_token_refresh_keeps_loaded_state() {
        let harness = testing::harness().await;
        harness.seed_medicine("ANL-001", "Paracetamol 500mg", 450, 20).await;
        harness.sign_in_admin().await;
        let before = harness.controller.generation();

        let mut session = harness.controller.snapshot().await.session.unwrap();
        session.access_token = "refreshed".to_string();
        harness
            .controller
            .handle_auth_event(AuthEvent::new(AuthEventKind::TokenRefreshed, Some(session)))
            .await
            .unwrap();

        assert_eq!(harness.controller.generation(), before);
        let state = harness.controller.snapshot().await;
        assert_eq!(state.session.unwrap().access_token, "refreshed");
        assert_eq!(state.medicines.len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_without_session() {
        let harness = testing::harness().await;
        harness.controller.bootstrap().await.unwrap();
        assert_eq!(
            harness.controller.snapshot().await.phase,
            SessionPhase::SignedOut
        );
    }

    #[tokio::test]
    async fn test_bootstrap_restores_provider_session() {
        let harness = testing::harness().await;
        harness
            .controller
            .collaborators
            .auth
            .sign_in(STAFF_EMAIL, STAFF_PASSWORD)
            .await
            .unwrap();

        harness.controller.bootstrap().await.unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::Ready);
        assert_eq!(state.profile.unwrap().id, harness.staff_id);
    }

    #[tokio::test]
    async fn test_listener_applies_provider_events() {
        let harness = testing::harness().await;
        let listener = harness.controller.spawn_auth_listener();

        harness
            .controller
            .collaborators
            .auth
            .sign_in(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .unwrap();

        let mut ready = false;
        for _ in 0..100 {
            if harness.controller.snapshot().await.phase == SessionPhase::Ready {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ready);

        listener.abort();
    }

    #[tokio::test]
    async fn test_profile_appearing_on_third_read_reaches_ready() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(retry_settings(5, 1)).await;
        profiles.miss_next(2);

        harness.sign_in_staff().await;

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::Ready);
        assert!(!state.loading);
        assert_eq!(state.profile.unwrap().id, harness.staff_id);
        assert_eq!(profiles.reads(), 3);
        assert!(state.notice.is_none());
    }

    #[tokio::test]
    async fn test_profile_retry_waits_fixed_delay_between_reads() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(retry_settings(5, 200)).await;
        profiles.appear_as(testing::profile("late-joiner", Role::Staff));
        profiles.miss_next(4);
        tokio::time::pause();

        let controller = &harness.controller;
        let started = Instant::now();
        let profile = controller
            .load_profile("late-joiner", controller.generation())
            .await;

        assert_eq!(profile.unwrap().id, "late-joiner");
        assert_eq!(started.elapsed(), Duration::from_millis(800));
        assert_eq!(profiles.reads(), 5);
    }

    #[tokio::test]
    async fn test_sign_out_during_profile_retry_drops_the_load() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(retry_settings(5, 200)).await;
        profiles.appear_as(testing::profile("never-applied", Role::Staff));
        profiles.miss_next(5);
        let session = staff_session(&harness);
        tokio::time::pause();

        let controller = harness.controller.clone();
        let pending = tokio::spawn(async move {
            controller
                .handle_auth_event(AuthEvent::new(AuthEventKind::SignedIn, Some(session)))
                .await
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(
            harness.controller.snapshot().await.phase,
            SessionPhase::ProfileLoading
        );

        harness
            .controller
            .handle_auth_event(AuthEvent::new(AuthEventKind::SignedOut, None))
            .await
            .unwrap();
        pending.await.unwrap().unwrap();

        let state = harness.controller.snapshot().await;
        assert_eq!(state.phase, SessionPhase::SignedOut);
        assert!(state.profile.is_none());
        assert!(state.session.is_none());
        assert!(state.notice.is_none());
        assert_eq!(profiles.reads(), 2);
    }

    #[tokio::test]
    async fn test_repeated_sign_in_event_waits_for_running_load() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(retry_settings(5, 5)).await;
        profiles.miss_next(2);
        let controller = &harness.controller;
        let event = AuthEvent::new(AuthEventKind::SignedIn, Some(staff_session(&harness)));

        let (first, second) = tokio::join!(
            async {
                let result = controller.handle_auth_event(event.clone()).await;
                (result, controller.snapshot().await)
            },
            async {
                let result = controller.handle_auth_event(event.clone()).await;
                (result, controller.snapshot().await)
            },
        );

        for (result, state) in [first, second] {
            result.unwrap();
            assert_eq!(state.phase, SessionPhase::Ready);
            assert!(!state.loading);
            assert_eq!(state.profile.unwrap().id, harness.staff_id);
        }
        assert_eq!(profiles.reads(), 3);
    }

    #[tokio::test]
    async fn test_repeated_sign_in_event_reports_missing_profile() {
        let (harness, profiles) =
            testing::harness_with_scripted_profiles(retry_settings(2, 5)).await;
        profiles.miss_next(10);
        let controller = &harness.controller;
        let event = AuthEvent::new(AuthEventKind::SignedIn, Some(staff_session(&harness)));

        let (first, second) = tokio::join!(
            controller.handle_auth_event(event.clone()),
            controller.handle_auth_event(event.clone()),
        );

        for result in [first, second] {
            let err = result.unwrap_err();
            assert_eq!(err.code, ErrorCode::ProfileMissing);
            assert_eq!(err.message, PROFILE_MISSING_MESSAGE);
        }
        assert_eq!(controller.snapshot().await.phase, SessionPhase::SignedOut);
        assert_eq!(profiles.reads(), 2);
    }
}
