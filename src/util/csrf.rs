//! Signed double-submit CSRF tokens
//!
//! A token is `hex(nonce).hex(hmac_sha256(secret, nonce))`. The same value is
//! stored in the `csrf_token` cookie and echoed back in the `x-csrf-token`
//! header; the server checks that both match and that the signature is ours.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

const NONCE_LEN: usize = 32;

/// Generate a fresh signed token
pub fn generate_token(secret: &str) -> String {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let nonce_hex = hex::encode(nonce);
    let signature = sign(secret, nonce_hex.as_bytes());
    format!("{}.{}", nonce_hex, hex::encode(signature))
}

/// Check a submitted header token against the cookie token
pub fn validate(secret: &str, cookie_token: Option<&str>, header_token: Option<&str>) -> bool {
    let (Some(cookie_token), Some(header_token)) = (cookie_token, header_token) else {
        return false;
    };

    if !constant_time_eq(cookie_token.as_bytes(), header_token.as_bytes()) {
        return false;
    }

    verify_signature(secret, header_token)
}

fn verify_signature(secret: &str, token: &str) -> bool {
    let Some((nonce_hex, signature_hex)) = token.split_once('.') else {
        return false;
    };
    if nonce_hex.len() != NONCE_LEN * 2 {
        return false;
    }

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(nonce_hex.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

fn sign(secret: &str, message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
