//! Coinbase Advanced Trade CDP JWT signing (ES256).
//!
//! Every REST call carries a fresh, single-use JWT: header carries
//! `kid`/`nonce`, payload carries `sub`/`iss`/`nbf`/`exp`/`uri`. The token is
//! valid for 120 seconds from `nbf`, matching Coinbase's own clock skew
//! tolerance.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::RngCore;
use serde::Serialize;

use super::error::CoinbaseError;

const JWT_VALIDITY_SECONDS: i64 = 120;

#[derive(Debug, Serialize)]
struct Claims {
    sub: String,
    iss: &'static str,
    nbf: i64,
    exp: i64,
    uri: String,
}

/// Sign a CDP JWT authorizing a single `method path` request.
pub fn build_jwt(
    key_name: &str,
    private_key_pem: &str,
    method: &str,
    host: &str,
    path: &str,
) -> Result<String, CoinbaseError> {
    let now = chrono::Utc::now().timestamp();
    let uri = format!("{} {host}{path}", method.to_uppercase());

    let claims = Claims {
        sub: key_name.to_string(),
        iss: "cdp",
        nbf: now,
        exp: now + JWT_VALIDITY_SECONDS,
        uri,
    };

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(key_name.to_string());
    header
        .other
        .insert("nonce".to_string(), serde_json::Value::String(random_nonce()));

    let key = EncodingKey::from_ec_pem(private_key_pem.as_bytes())
        .map_err(|e| CoinbaseError::InvalidCredentials(e.to_string()))?;

    encode(&header, &claims, &key).map_err(|e| CoinbaseError::JwtSigningFailed(e.to_string()))
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
