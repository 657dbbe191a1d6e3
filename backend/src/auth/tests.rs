use super::*;
use axum::http::Request;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::env;

const SECRET: &str = "supersecretjwtsecretforunittesting123";
const USER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

fn set_env_vars() {
    unsafe {
        env::set_var("JWT_SECRET", SECRET);
    }
}

fn token(secret: &str, sub: &str, exp: usize) -> String {
    let claims = AccessClaims {
        sub: sub.to_string(),
        email: Some("test@example.com".to_string()),
        role: Some("authenticated".to_string()),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn extract(authorization: Option<String>) -> Result<AuthUser, (StatusCode, String)> {
    let mut builder = Request::builder().uri("/api/v1/payments");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();
    AuthUser::from_request_parts(&mut parts, &()).await
}

#[test]
fn test_validate_access_token_success() {
    set_env_vars();
    let claims = validate_access_token(&token(SECRET, USER_ID, 9999999999))
        .expect("Valid token should pass");
    assert_eq!(claims.sub, USER_ID);
    assert_eq!(claims.email.as_deref(), Some("test@example.com"));
}

#[test]
fn test_validate_access_token_expired() {
    set_env_vars();
    assert!(validate_access_token(&token(SECRET, USER_ID, 1)).is_err());
}

#[test]
fn test_validate_access_token_invalid_signature() {
    set_env_vars();
    assert!(validate_access_token(&token("wrongsecret", USER_ID, 9999999999)).is_err());
}

#[tokio::test]
async fn extractor_yields_payer_identity() {
    set_env_vars();
    let user = extract(Some(format!("Bearer {}", token(SECRET, USER_ID, 9999999999))))
        .await
        .unwrap();

    let payer = user.payer();
    assert_eq!(payer.user_id.to_string(), USER_ID);
    assert_eq!(payer.email.as_deref(), Some("test@example.com"));
}

#[tokio::test]
async fn extractor_rejects_missing_or_malformed_headers() {
    set_env_vars();
    let missing = extract(None).await.unwrap_err();
    assert_eq!(missing.0, StatusCode::UNAUTHORIZED);

    let wrong_scheme = extract(Some("Basic abc".into())).await.unwrap_err();
    assert_eq!(wrong_scheme.0, StatusCode::UNAUTHORIZED);

    let bad_subject = extract(Some(format!("Bearer {}", token(SECRET, "not-a-uuid", 9999999999))))
        .await
        .unwrap_err();
    assert_eq!(bad_subject.1, "Invalid user ID in token");
}
