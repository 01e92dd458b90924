use chrono::{DateTime, Duration, TimeZone, Utc};
use lazy_static::lazy_static;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chirpy_auth::auth::{Authenticator, FixedClock, Identity, PasswordHasher};
use chirpy_auth::configuration::AuthSettings;
use chirpy_auth::error::{AppError, AuthError, ConfigError, Outcome};
use chirpy_auth::storage::{CredentialStore, InMemoryCredentialStore};
use chirpy_auth::telemetry::{get_subscriber, init_subscriber};

lazy_static! {
    static ref TRACING: () = {
        // TEST_LOG=1 cargo test -- to see the logs
        if std::env::var("TEST_LOG").is_ok() {
            let _ = init_subscriber(get_subscriber("debug", std::io::stdout));
        } else {
            let _ = init_subscriber(get_subscriber("debug", std::io::sink));
        }
    };
}

const EMAIL: &str = "walt@breakingbad.com";
const PASSWORD: &str = "04234";

pub struct TestApp {
    pub store: Arc<InMemoryCredentialStore>,
    pub settings: AuthSettings,
    pub user_id: Identity,
}

impl TestApp {
    /// An authenticator whose clock is stopped at `now`
    fn at(&self, now: DateTime<Utc>) -> Authenticator {
        Authenticator::new(self.store.clone(), &self.settings)
            .expect("Failed to build authenticator")
            .with_hasher(fast_hasher())
            .with_clock(Arc::new(FixedClock(now)))
    }
}

fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(1024, 1, 1)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn spawn_app() -> TestApp {
    lazy_static::initialize(&TRACING);

    let store = Arc::new(InMemoryCredentialStore::new());
    let credential = fast_hasher().hash(PASSWORD).expect("Failed to hash password");
    let user_id = store
        .insert_user(EMAIL, &credential)
        .expect("Failed to create user");

    TestApp {
        store,
        settings: AuthSettings {
            signing_secret: "integration-test-signing-secret".to_string(),
            integration_api_key: "f271c81ff7084ee5b99a5091b42d486e".to_string(),
        },
        user_id,
    }
}

fn auth_error(result: Result<impl std::fmt::Debug, AppError>) -> AuthError {
    match result {
        Err(AppError::Auth(e)) => e,
        other => panic!("Expected an authentication error, got {:?}", other),
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

// --- Login ---

#[tokio::test]
async fn login_returns_session_for_valid_credentials() {
    let app = spawn_app();
    let auth = app.at(t0());

    let session = auth.login(EMAIL, PASSWORD).await.expect("Login failed");

    assert_eq!(session.identity, app.user_id);
    assert_eq!(session.token_type, "Bearer");
    assert_eq!(session.expires_in, 3600);
    assert_eq!(session.refresh_token.len(), 64);
    assert_eq!(
        auth.authenticate_access_token(Some(&bearer(&session.access_token))),
        Ok(app.user_id)
    );

    let record = app
        .store
        .get_refresh_token(&session.refresh_token)
        .await
        .unwrap()
        .expect("Refresh token was not persisted");
    assert_eq!(record.owner, app.user_id);
    assert_eq!(record.expires_at, t0() + Duration::days(60));
}

#[tokio::test]
async fn login_with_wrong_password_stops_before_issuing_tokens() {
    let app = spawn_app();
    let auth = app.at(t0());

    let err = auth_error(auth.login(EMAIL, "wrong-password").await);
    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(err.outcome(), Outcome::Unauthenticated);

    // Nothing was stored for the user
    assert_eq!(auth.revoke_all(app.user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn login_with_unknown_email_is_indistinguishable() {
    let app = spawn_app();
    let auth = app.at(t0());

    assert_eq!(
        auth_error(auth.login("nobody@example.com", PASSWORD).await),
        AuthError::InvalidCredentials
    );
}

#[tokio::test]
async fn unknown_email_costs_as_much_as_wrong_password() {
    let app = spawn_app();
    // Expensive enough that skipping the hash would stand out
    let hasher = PasswordHasher::with_params(16 * 1024, 2, 1);
    let email = "gus@lospolloshermanos.com";
    app.store
        .insert_user(email, &hasher.hash(PASSWORD).unwrap())
        .unwrap();
    let auth = app.at(t0()).with_hasher(hasher);

    let mut wrong_password = StdDuration::MAX;
    let mut unknown_email = StdDuration::MAX;
    for _ in 0..3 {
        let start = Instant::now();
        assert_eq!(
            auth_error(auth.login(email, "wrong-password").await),
            AuthError::InvalidCredentials
        );
        wrong_password = wrong_password.min(start.elapsed());

        let start = Instant::now();
        assert_eq!(
            auth_error(auth.login("nobody@example.com", "wrong-password").await),
            AuthError::InvalidCredentials
        );
        unknown_email = unknown_email.min(start.elapsed());
    }

    assert!(
        unknown_email * 4 >= wrong_password,
        "unknown email took {:?}, wrong password took {:?}",
        unknown_email,
        wrong_password
    );
}

#[test]
fn empty_secrets_are_refused_at_construction() {
    let store = Arc::new(InMemoryCredentialStore::new());
    let test_cases = vec![
        ("", "key", "auth.signing_secret"),
        ("secret", "", "auth.integration_api_key"),
        ("", "", "auth.signing_secret"),
    ];

    for (secret, key, field) in test_cases {
        let result = Authenticator::new(
            store.clone(),
            &AuthSettings {
                signing_secret: secret.to_string(),
                integration_api_key: key.to_string(),
            },
        );

        match result {
            Err(ConfigError::MissingRequired(missing)) => assert_eq!(missing, field),
            Err(other) => panic!("Unexpected error for {}: {}", field, other),
            Ok(_) => panic!("Should refuse empty {}", field),
        }
    }
}

// --- Refresh tokens ---

#[tokio::test]
async fn refresh_token_lifecycle() {
    let app = spawn_app();
    let session = app.at(t0()).login(EMAIL, PASSWORD).await.unwrap();
    let header = bearer(&session.refresh_token);

    let later = app.at(t0() + Duration::days(30));
    assert_eq!(
        later.authenticate_refresh_token(Some(&header)).await.unwrap(),
        app.user_id
    );

    later.revoke(Some(&header)).await.expect("Revoke failed");

    assert_eq!(
        auth_error(later.authenticate_refresh_token(Some(&header)).await),
        AuthError::TokenRevoked
    );
    // Still present and not expired, only revoked
    let record = app
        .store
        .get_refresh_token(&session.refresh_token)
        .await
        .unwrap()
        .unwrap();
    assert!(record.expires_at > t0() + Duration::days(30));
    assert_eq!(record.revoked_at, Some(t0() + Duration::days(30)));
}

#[tokio::test]
async fn refresh_issues_access_token_without_rotating() {
    let app = spawn_app();
    let session = app.at(t0()).login(EMAIL, PASSWORD).await.unwrap();
    let header = bearer(&session.refresh_token);

    let two_hours_later = app.at(t0() + Duration::hours(2));
    // The login access token is dead by now
    assert_eq!(
        two_hours_later.authenticate_access_token(Some(&bearer(&session.access_token))),
        Err(AuthError::TokenExpired)
    );

    let first = two_hours_later.refresh(Some(&header)).await.unwrap();
    let second = two_hours_later.refresh(Some(&header)).await.unwrap();

    assert_eq!(
        two_hours_later.authenticate_access_token(Some(&bearer(&first))),
        Ok(app.user_id)
    );
    assert_eq!(
        two_hours_later.authenticate_access_token(Some(&bearer(&second))),
        Ok(app.user_id)
    );
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_even_if_never_revoked() {
    let app = spawn_app();
    let session = app.at(t0()).login(EMAIL, PASSWORD).await.unwrap();
    let header = bearer(&session.refresh_token);

    let at_expiry = app.at(t0() + Duration::days(60));
    assert_eq!(
        auth_error(at_expiry.authenticate_refresh_token(Some(&header)).await),
        AuthError::TokenExpired
    );
}

#[tokio::test]
async fn unknown_refresh_token_is_not_found() {
    let app = spawn_app();
    let auth = app.at(t0());
    let header = bearer(&"ab".repeat(32));

    assert_eq!(
        auth_error(auth.authenticate_refresh_token(Some(&header)).await),
        AuthError::TokenNotFound
    );
}

#[tokio::test]
async fn malformed_refresh_header_is_rejected() {
    let app = spawn_app();
    let auth = app.at(t0());

    assert_eq!(
        auth_error(auth.authenticate_refresh_token(Some("token-only")).await),
        AuthError::MalformedHeader
    );
    assert_eq!(
        auth_error(auth.revoke(None).await),
        AuthError::MalformedHeader
    );
}

#[tokio::test]
async fn revoke_is_idempotent() {
    let app = spawn_app();
    let auth = app.at(t0());
    let session = auth.login(EMAIL, PASSWORD).await.unwrap();
    let header = bearer(&session.refresh_token);

    auth.revoke(Some(&header)).await.unwrap();
    auth.revoke(Some(&header)).await.unwrap();
    auth.revoke(Some(&bearer("never-issued"))).await.unwrap();
}

#[tokio::test]
async fn sessions_are_independent_until_revoke_all() {
    let app = spawn_app();
    let auth = app.at(t0());
    let laptop = auth.login(EMAIL, PASSWORD).await.unwrap();
    let phone = auth.login(EMAIL, PASSWORD).await.unwrap();
    assert_ne!(laptop.refresh_token, phone.refresh_token);

    auth.revoke(Some(&bearer(&laptop.refresh_token))).await.unwrap();
    assert_eq!(
        auth.authenticate_refresh_token(Some(&bearer(&phone.refresh_token)))
            .await
            .unwrap(),
        app.user_id
    );

    assert_eq!(auth.revoke_all(app.user_id).await.unwrap(), 1);
    assert_eq!(
        auth_error(
            auth.authenticate_refresh_token(Some(&bearer(&phone.refresh_token)))
                .await
        ),
        AuthError::TokenRevoked
    );
}

// --- Authorization ---

#[tokio::test]
async fn ownership_is_forbidden_not_unauthenticated() {
    let app = spawn_app();
    let auth = app.at(t0());
    let session = auth.login(EMAIL, PASSWORD).await.unwrap();
    let actor = auth
        .authenticate_access_token(Some(&bearer(&session.access_token)))
        .unwrap();

    assert_eq!(auth.authorize_ownership(actor, app.user_id), Ok(()));

    let err = auth
        .authorize_ownership(actor, Identity::new())
        .unwrap_err();
    assert_eq!(err, AuthError::PermissionDenied);
    assert_eq!(err.outcome(), Outcome::Forbidden);
}

#[tokio::test]
async fn integration_key_is_checked_against_configuration() {
    let app = spawn_app();
    let auth = app.at(t0());

    assert_eq!(
        auth.authorize_integration_key(Some("ApiKey f271c81ff7084ee5b99a5091b42d486e")),
        Ok(())
    );
    assert_eq!(
        auth.authorize_integration_key(Some("ApiKey 00000000000000000000000000000000")),
        Err(AuthError::InvalidApiKey)
    );
    assert_eq!(
        auth.authorize_integration_key(Some("f271c81ff7084ee5b99a5091b42d486e")),
        Err(AuthError::MalformedHeader)
    );
}

#[tokio::test]
async fn access_tokens_from_another_deployment_are_rejected() {
    let app = spawn_app();
    let session = app.at(t0()).login(EMAIL, PASSWORD).await.unwrap();

    let other = Authenticator::new(
        app.store.clone(),
        &AuthSettings {
            signing_secret: "a-different-secret".to_string(),
            integration_api_key: "k".to_string(),
        },
    )
    .unwrap()
    .with_clock(Arc::new(FixedClock(t0())));

    assert_eq!(
        other.authenticate_access_token(Some(&bearer(&session.access_token))),
        Err(AuthError::SignatureInvalid)
    );
}
