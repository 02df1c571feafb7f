use inkpost::{
    auth::{self, Claims},
    models::User,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

const SECRET: &str = "test-signing-secret";

fn sample_user() -> User {
    User {
        id: Uuid::from_u128(42),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        ..User::default()
    }
}

// --- PASSWORD HASHING ---

#[test]
fn test_password_hash_round_trip() {
    let hash = auth::hash_password("hunter2!").unwrap();

    // PHC string form, never the plaintext.
    assert!(hash.starts_with("$argon2"));
    assert!(auth::verify_password("hunter2!", &hash));
    assert!(!auth::verify_password("wrong", &hash));
}

#[test]
fn test_password_hashes_are_salted() {
    let first = auth::hash_password("hunter2!").unwrap();
    let second = auth::hash_password("hunter2!").unwrap();

    // Fresh salt per hash: identical inputs must not produce identical hashes.
    assert_ne!(first, second);
    assert!(auth::verify_password("hunter2!", &first));
    assert!(auth::verify_password("hunter2!", &second));
}

#[test]
fn test_verify_rejects_malformed_stored_hash() {
    assert!(!auth::verify_password("hunter2!", "not-a-phc-string"));
}

// --- SESSION TOKENS ---

#[test]
fn test_issued_token_decodes_with_same_secret() {
    let user = sample_user();
    let token = auth::issue_token(&user, SECRET).unwrap();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(data.claims.sub, user.id);
    assert_eq!(data.claims.username, "alice");
    // Three-day session window.
    assert_eq!(data.claims.exp - data.claims.iat, 72 * 3600);
}

#[test]
fn test_token_rejected_with_wrong_secret() {
    let token = auth::issue_token(&sample_user(), SECRET).unwrap();

    let result = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(b"a-different-secret"),
        &Validation::default(),
    );

    assert!(result.is_err());
}
