//! Minimal hand-rolled JWT HS256 encode/verify.
//!
//! The Read API only ever issues and checks its own tokens, so there is no
//! need for the full `jsonwebtoken` crate surface (algorithm negotiation,
//! JWKS, etc). This mirrors the three-part `header.payload.signature`
//! structure with base64url-without-padding segments and a constant-time
//! signature comparison.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: now.timestamp() + ttl_seconds,
        }
    }
}

fn sign(secret: &[u8], signing_input: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Issue a signed JWT for `user_id`, valid for `ttl_seconds` from now.
pub fn issue(secret: &[u8], user_id: Uuid, ttl_seconds: i64) -> String {
    let header = Header {
        alg: "HS256",
        typ: "JWT",
    };
    let claims = Claims::new(user_id, ttl_seconds);

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = sign(secret, &signing_input);
    let signature_b64 = URL_SAFE_NO_PAD.encode(signature);

    format!("{signing_input}.{signature_b64}")
}

/// Verify `token` against `secret`, returning its claims if the signature is
/// valid and `exp` has not passed.
pub fn verify(secret: &[u8], token: &str) -> Result<Claims, AppError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AppError::TokenInvalid)?;
    let claims_b64 = parts.next().ok_or(AppError::TokenInvalid)?;
    let signature_b64 = parts.next().ok_or(AppError::TokenInvalid)?;
    if parts.next().is_some() {
        return Err(AppError::TokenInvalid);
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let expected_signature = sign(secret, &signing_input);

    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::TokenInvalid)?;

    if !constant_time_eq(&expected_signature, &provided_signature) {
        return Err(AppError::TokenInvalid);
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| AppError::TokenInvalid)?;
    let claims: Claims =
        serde_json::from_slice(&claims_json).map_err(|_| AppError::TokenInvalid)?;

    let now = Utc::now().timestamp();
    if claims.exp < now {
        return Err(AppError::TokenExpired);
    }

    Ok(claims)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-at-least-32-bytes-long";

    #[test]
    fn round_trip_succeeds() {
        let user_id = Uuid::new_v4();
        let token = issue(SECRET, user_id, 3600);
        let claims = verify(SECRET, &token).expect("valid token should verify");
        assert_eq!(claims.sub, user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue(SECRET, Uuid::new_v4(), 3600);
        let err = verify(b"a-completely-different-secret-value", &token).unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue(SECRET, Uuid::new_v4(), -1);
        let err = verify(SECRET, &token).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let err = verify(SECRET, "not.a.valid.jwt").unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));

        let err = verify(SECRET, "onlyonepart").unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue(SECRET, Uuid::new_v4(), 3600);
        let mut parts: Vec<&str> = token.split('.').collect();
        let tampered_claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"00000000-0000-0000-0000-000000000000","exp":9999999999,"iat":0}"#);
        parts[1] = &tampered_claims;
        let tampered = parts.join(".");
        let err = verify(SECRET, &tampered).unwrap_err();
        assert!(matches!(err, AppError::TokenInvalid));
    }
}
