//! # Local Auth Provider
//!
//! Email/password auth over the `auth_users` table, with auth state changes
//! published on a broadcast channel.
//!
//! ## Isolated Clients
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main client                       isolated client                      │
//! │  ───────────                       ───────────────                      │
//! │  session: admin                    session: (own, starts empty)         │
//! │  events ──► session bridge         events ──► nobody subscribed         │
//! │                                                                         │
//! │  register_staff() calls sign_up() on the isolated client, so the new   │
//! │  identity never replaces the admin's session.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ports::{AuthEvent, AuthEventKind, AuthProvider, Session, StoreError, StoreResult};
use novacare_db::{AuthAccount, AuthRepository, DbError};

/// Capacity of the auth event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const ALREADY_REGISTERED: &str = "User already registered";

/// Auth provider backed by [`AuthRepository`].
pub struct LocalAuthProvider {
    accounts: AuthRepository,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl LocalAuthProvider {
    pub fn new(accounts: AuthRepository) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        LocalAuthProvider {
            accounts,
            session: Arc::new(RwLock::new(None)),
            events,
        }
    }

    async fn start_session(&self, account: &AuthAccount) -> Session {
        let session = Session {
            user_id: account.id.clone(),
            email: account.email.clone(),
            access_token: Uuid::new_v4().to_string(),
        };
        *self.session.write().await = Some(session.clone());
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        session
    }

    fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent::new(kind, session));
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session> {
        debug!(email = %email, "Signing in");

        let account = self
            .accounts
            .verify_credentials(email, password)
            .await?
            .ok_or_else(|| StoreError::Auth(INVALID_CREDENTIALS.to_string()))?;

        let session = self.start_session(&account).await;
        info!(user_id = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> StoreResult<()> {
        let previous = self.session.write().await.take();
        if let Some(session) = &previous {
            info!(user_id = %session.user_id, "Signed out");
        }
        self.emit(AuthEventKind::SignedOut, None);
        Ok(())
    }

    async fn current_session(&self) -> StoreResult<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn create_isolated_client(&self) -> Arc<dyn AuthProvider> {
        Arc::new(LocalAuthProvider::new(self.accounts.clone()))
    }

    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> StoreResult<String> {
        debug!(email = %email, "Signing up");

        let account = self
            .accounts
            .create_account(email, password, full_name)
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => StoreError::Auth(ALREADY_REGISTERED.to_string()),
                other => other.into(),
            })?;

        self.start_session(&account).await;
        info!(user_id = %account.id, "Account registered");
        Ok(account.id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use novacare_db::{Database, DbConfig};

    async fn provider() -> LocalAuthProvider {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        LocalAuthProvider::new(db.auth())
    }

    #[tokio::test]
    async fn test_sign_in_emits_event() {
        let auth = provider().await;
        let user_id = auth
            .sign_up("cashier@novacare.test", "counter-pass", "Cashier")
            .await
            .unwrap();
        let mut events = auth.subscribe();

        let session = auth
            .sign_in("cashier@novacare.test", "counter-pass")
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);

        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, AuthEventKind::SignedIn);
        assert_eq!(event.session.map(|s| s.user_id), Some(user_id));
    }

    #[tokio::test]
    async fn test_wrong_password_is_auth_error() {
        let auth = provider().await;
        auth.sign_up("cashier@novacare.test", "counter-pass", "Cashier")
            .await
            .unwrap();

        let err = auth
            .sign_in("cashier@novacare.test", "nope")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Auth(INVALID_CREDENTIALS.to_string()));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let auth = provider().await;
        auth.sign_up("a@novacare.test", "password-a", "A").await.unwrap();
        assert!(auth.current_session().await.unwrap().is_some());

        let mut events = auth.subscribe();
        auth.sign_out().await.unwrap();

        assert!(auth.current_session().await.unwrap().is_none());
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, AuthEventKind::SignedOut);
        assert!(event.session.is_none());
    }

    #[tokio::test]
    async fn test_isolated_sign_up_leaves_main_session() {
        let auth = provider().await;
        auth.sign_up("admin@novacare.test", "admin-pass", "Admin")
            .await
            .unwrap();
        let admin = auth.current_session().await.unwrap().unwrap();
        let mut events = auth.subscribe();

        let isolated = auth.create_isolated_client();
        let new_id = isolated
            .sign_up("new@novacare.test", "new-password", "New Hire")
            .await
            .unwrap();

        assert_ne!(new_id, admin.user_id);
        assert_eq!(auth.current_session().await.unwrap(), Some(admin));
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        let err = isolated
            .sign_up("new@novacare.test", "new-password", "Again")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Auth(ALREADY_REGISTERED.to_string()));
    }
}
