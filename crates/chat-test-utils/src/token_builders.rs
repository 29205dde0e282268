//! Hand-crafted chat tokens for negative handshake tests.
//!
//! Valid tokens come from `TestChatServer::issue_token`; these builders
//! produce tokens the server must reject.

use crate::server_harness::TEST_TOKEN_SECRET;
use common::jwt::NICKNAME_CLAIM;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Sign arbitrary claims with HS256.
pub fn sign_claims(claims: &Value, secret: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("HS256 signing should not fail")
}

fn future_exp() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

fn nickname_claims(nickname: Value, exp: i64) -> Value {
    let mut claims = Map::new();
    claims.insert(NICKNAME_CLAIM.to_string(), nickname);
    claims.insert("exp".to_string(), json!(exp));
    Value::Object(claims)
}

/// Well-formed token signed with a key the server does not hold.
pub fn wrong_key_token(nickname: &str) -> String {
    sign_claims(
        &nickname_claims(json!(nickname), future_exp()),
        b"not-the-server-secret",
    )
}

/// Token signed with the server key but past its `exp`.
pub fn expired_token(nickname: &str) -> String {
    let exp = chrono::Utc::now().timestamp() - 3600;
    sign_claims(&nickname_claims(json!(nickname), exp), TEST_TOKEN_SECRET)
}

/// Token signed with the server key that carries no `nickname` claim.
pub fn missing_nickname_token() -> String {
    sign_claims(
        &json!({"sub": "user01", "exp": future_exp()}),
        TEST_TOKEN_SECRET,
    )
}

/// Token signed with the server key whose `nickname` is not a string.
pub fn non_string_nickname_token() -> String {
    sign_claims(
        &nickname_claims(json!(1234), future_exp()),
        TEST_TOKEN_SECRET,
    )
}
