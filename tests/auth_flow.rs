mod common;

use chrono::{Duration, Utc};
use common::harness;
use movie_catalog::{
    auth::jwt::{make_token, new_access_claims, sha256_hex, Keys},
    dto::auth::{LoginRequest, RefreshRequest, RegisterRequest},
    models::refresh_token::RefreshTokenRecord,
    services::auth_service::{authenticate, login, refresh, register, validate_access},
    AppError, CachePolicy, ErrorKind,
};

fn paul() -> RegisterRequest {
    RegisterRequest {
        full_name: "Paul Atreides".into(),
        username: "muaddib".into(),
        password: "kwisatz-haderach".into(),
    }
}

fn login_req(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: username.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn second_registration_with_same_username_conflicts() {
    let h = harness(CachePolicy::Strict);

    let user = register(&h.state, paul()).await.unwrap().user;
    assert_eq!(user.username, "muaddib");

    let err = register(&h.state, paul()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(h.users.len().await, 1);
}

#[tokio::test]
async fn concurrent_registrations_leave_exactly_one_user() {
    let h = harness(CachePolicy::Strict);

    let (a, b) = tokio::join!(register(&h.state, paul()), register(&h.state, paul()));
    let outcomes = [a, b];

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));
    assert_eq!(h.users.len().await, 1);
}

#[tokio::test]
async fn password_is_stored_only_as_a_hash() {
    use movie_catalog::store::CredentialStore;

    let h = harness(CachePolicy::Strict);
    register(&h.state, paul()).await.unwrap();

    let stored = h.users.find_by_username("muaddib").await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2"));
    assert!(!stored.password_hash.contains("kwisatz-haderach"));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let h = harness(CachePolicy::Strict);
    register(&h.state, paul()).await.unwrap();

    let wrong = login(&h.state, login_req("muaddib", "not-the-password"))
        .await
        .unwrap_err();
    let unknown = login(&h.state, login_req("feyd", "kwisatz-haderach"))
        .await
        .unwrap_err();

    assert!(matches!(wrong, AppError::Unauthorized));
    assert!(matches!(unknown, AppError::Unauthorized));
    assert_eq!(wrong.kind(), unknown.kind());
    assert_eq!(wrong.public_message(), unknown.public_message());
    assert!(h.sessions.is_empty().await);
}

#[tokio::test]
async fn login_issues_access_token_for_the_user_and_persists_refresh() {
    let h = harness(CachePolicy::Strict);
    let user = register(&h.state, paul()).await.unwrap().user;

    let tokens = login(&h.state, login_req("muaddib", "kwisatz-haderach"))
        .await
        .unwrap();
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(validate_access(&h.state, &tokens.access_token).unwrap(), user.id);
    assert_eq!(h.sessions.len().await, 1);

    // a second session does not displace the first
    login(&h.state, login_req("muaddib", "kwisatz-haderach"))
        .await
        .unwrap();
    assert_eq!(h.sessions.len().await, 2);
}

#[tokio::test]
async fn refresh_mints_access_for_owner_and_can_be_reused() {
    let h = harness(CachePolicy::Strict);
    let user = register(&h.state, paul()).await.unwrap().user;
    let tokens = login(&h.state, login_req("muaddib", "kwisatz-haderach"))
        .await
        .unwrap();

    for _ in 0..2 {
        let refreshed = refresh(
            &h.state,
            RefreshRequest {
                refresh_token: tokens.refresh_token.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            validate_access(&h.state, &refreshed.access_token).unwrap(),
            user.id
        );
    }
    assert_eq!(h.sessions.len().await, 1);
}

#[tokio::test]
async fn expired_or_unknown_refresh_token_is_rejected() {
    let h = harness(CachePolicy::Strict);
    let now = Utc::now();
    h.sessions
        .insert_record(RefreshTokenRecord {
            id: 1,
            user_id: 1,
            token_hash: sha256_hex("stale-token"),
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::days(30),
        })
        .await;

    for token in ["stale-token", "never-issued"] {
        let err = refresh(
            &h.state,
            RefreshRequest {
                refresh_token: token.into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}

#[tokio::test]
async fn bearer_header_is_parsed_strictly() {
    let h = harness(CachePolicy::Strict);
    let token = make_token(&h.state.keys, &new_access_claims(12, 60)).unwrap();

    assert_eq!(authenticate(&h.state, &format!("Bearer {token}")).unwrap(), 12);
    assert_eq!(authenticate(&h.state, &format!("bearer {token}")).unwrap(), 12);

    for header in [
        format!("Token {token}"),
        "Bearer".to_string(),
        token.clone(),
        String::new(),
    ] {
        assert!(matches!(
            authenticate(&h.state, &header),
            Err(AppError::Unauthorized)
        ));
    }
}

#[tokio::test]
async fn token_signed_with_another_secret_is_unauthorized() {
    let h = harness(CachePolicy::Strict);
    let forged = make_token(&Keys::from_secret(b"guess"), &new_access_claims(1, 60)).unwrap();

    assert_eq!(
        validate_access(&h.state, &forged).unwrap_err().kind(),
        ErrorKind::Unauthorized
    );
}

#[tokio::test]
async fn registration_input_is_validated_before_hashing() {
    let h = harness(CachePolicy::Strict);
    let mut req = paul();
    req.password = "short".into();

    assert_eq!(
        register(&h.state, req).await.unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert!(h.users.is_empty().await);
}
