//! End-to-end service scenarios over in-memory storage.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use common::{AppError, AppResult};
use domain::events::USER_ROLE_CHANGED;
use domain::{Email, UserEvent, UserId};
use identity_service_lib::config::IdentityServiceConfig;
use identity_service_lib::events::EventHandler;
use identity_service_lib::service::{ServiceContainer, Services};

const SECRET: &str = "integration-secret-0123456789abcdef";

/// Captures every published event
#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<UserEvent>>,
}

impl RecordingHandler {
    fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(UserEvent::event_type)
            .collect()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn handle(&self, event: &UserEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

async fn setup() -> (Services, Arc<RecordingHandler>) {
    let services = Services::in_memory(&IdentityServiceConfig::ephemeral(SECRET));
    let recorder = Arc::new(RecordingHandler::default());
    services.events().subscribe(recorder.clone()).await;
    (services, recorder)
}

#[tokio::test]
async fn test_register_then_login_returns_session_with_configured_ttl() {
    let (services, recorder) = setup().await;

    let alice = services
        .users()
        .register_user("alice@x.com", "password123")
        .await
        .unwrap();
    assert_eq!(recorder.event_types(), vec!["identity.user.registered"]);

    let (session, user) = services
        .auth()
        .login("alice@x.com", "password123")
        .await
        .unwrap();

    assert_eq!(user.id(), alice.id());
    assert_eq!(session.user_id(), alice.id());
    assert_eq!(session.expires_at() - session.created_at(), Duration::seconds(3600));
    assert!(!session.is_expired());
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
    let (services, _) = setup().await;
    services
        .users()
        .register_user("alice@x.com", "password123")
        .await
        .unwrap();

    let unknown = services.auth().login("bob@x.com", "password123").await.unwrap_err();
    let wrong = services.auth().login("alice@x.com", "password124").await.unwrap_err();

    assert_eq!(unknown.code(), wrong.code());
    assert_eq!(unknown.status(), wrong.status());
    assert_eq!(unknown.user_message(), wrong.user_message());
}

#[tokio::test]
async fn test_deactivate_blocks_login_and_activate_restores_it() {
    let (services, recorder) = setup().await;
    let carol = services
        .users()
        .register_user("carol@x.com", "password123")
        .await
        .unwrap();
    let (session, _) = services.auth().login("carol@x.com", "password123").await.unwrap();

    services.users().set_active(carol.id(), false).await.unwrap();
    let err = services.auth().login("carol@x.com", "password123").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert!(services
        .auth()
        .validate_session(session.id().as_str())
        .await
        .is_err());

    services.users().set_active(carol.id(), true).await.unwrap();
    assert!(services.auth().login("carol@x.com", "password123").await.is_ok());

    assert_eq!(
        recorder.event_types(),
        vec![
            "identity.user.registered",
            "identity.user.deactivated",
            "identity.user.activated",
        ]
    );
}

#[tokio::test]
async fn test_delete_self_is_rejected() {
    let (services, _) = setup().await;
    let alice = services
        .users()
        .register_user("alice@x.com", "password123")
        .await
        .unwrap();

    let err = services
        .users()
        .delete_user(alice.id(), alice.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CannotDeleteSelf));
    assert!(services.users().get_user(alice.id()).await.is_ok());
}

#[tokio::test]
async fn test_change_role_twice_emits_one_event() {
    let (services, recorder) = setup().await;
    let bob = services
        .users()
        .register_user("bob@x.com", "password123")
        .await
        .unwrap();

    services.users().change_role(bob.id(), "admin").await.unwrap();
    assert!(services.users().get_user(bob.id()).await.unwrap().is_admin());

    services.users().change_role(bob.id(), "admin").await.unwrap();
    let role_changes = recorder
        .event_types()
        .into_iter()
        .filter(|t| *t == USER_ROLE_CHANGED)
        .count();
    assert_eq!(role_changes, 1);
}

#[tokio::test]
async fn test_duplicate_email_differing_in_case_conflicts() {
    let (services, _) = setup().await;
    services
        .users()
        .register_user("alice@x.com", "password123")
        .await
        .unwrap();

    let err = services
        .users()
        .register_user("  ALICE@X.COM ", "password456")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_logout_is_idempotent_and_logout_all_ends_every_session() {
    let (services, _) = setup().await;
    let dave = services
        .users()
        .register_user("dave@x.com", "password123")
        .await
        .unwrap();

    let (first, _) = services.auth().login("dave@x.com", "password123").await.unwrap();
    let (second, _) = services.auth().login("dave@x.com", "password123").await.unwrap();
    let (third, _) = services.auth().login("dave@x.com", "password123").await.unwrap();

    services.auth().logout(first.id().as_str()).await.unwrap();
    services.auth().logout(first.id().as_str()).await.unwrap();
    services.auth().logout("never-issued").await.unwrap();

    assert_eq!(services.auth().logout_all(dave.id()).await.unwrap(), 2);
    for session in [&second, &third] {
        let result = services.auth().validate_session(session.id().as_str()).await;
        assert!(matches!(result, Err(AppError::InvalidSession)));
    }
}

#[tokio::test]
async fn test_list_users_pages_with_corrected_inputs() {
    let (services, _) = setup().await;
    for i in 0..3 {
        services
            .users()
            .register_user(&format!("user{i}@x.com"), "password123")
            .await
            .unwrap();
    }

    let page = services.users().list_users(2, -5).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.users.len(), 2);
    assert_eq!(page.offset, 0);

    let page = services.users().list_users(0, 2).await.unwrap();
    assert_eq!(page.limit, 20);
    assert_eq!(page.users.len(), 1);
}

#[tokio::test]
async fn test_password_reset_for_unknown_email_succeeds_silently() {
    let (services, _) = setup().await;
    assert!(services
        .verification()
        .request_password_reset("nobody@x.com")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_get_user_by_email_normalizes() {
    let (services, _) = setup().await;
    let erin = services
        .users()
        .register_user("erin@x.com", "password123")
        .await
        .unwrap();

    let found = services.users().get_user_by_email(" ERIN@x.com").await.unwrap();
    assert_eq!(found.id(), erin.id());
    assert_eq!(found.email(), &Email::new("erin@x.com").unwrap());

    let missing = services.users().get_user(UserId::new(999).unwrap()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}
