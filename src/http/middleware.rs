//! Authentication middleware, JWT verification and CSRF guard

use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::http::error::AppError;
use crate::store::supabase::SupabaseError;
use crate::util::csrf::{self, CSRF_COOKIE, CSRF_HEADER};

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the Supabase session for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

const EXPECTED_AUDIENCE: &str = "authenticated";

/// JWT claims from Supabase auth token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// Audience
    #[serde(default)]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: u64,
    /// Email (if available)
    #[serde(default)]
    pub email: Option<String>,
    /// Postgres role, `authenticated` for signed-in users
    #[serde(default)]
    pub role: Option<String>,
    /// Server-controlled metadata; carries the company binding once signup completes
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

/// Verify a JWT token and extract claims
pub fn verify_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::InvalidToken);
    };

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| AuthError::InvalidToken)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_json).map_err(|_| AuthError::InvalidToken)?;
    if header.alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    // Verify signature (HMAC-SHA256)
    let provided_signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AuthError::InvalidToken)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&provided_signature)
        .map_err(|_| AuthError::InvalidToken)?;

    // Decode payload
    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::InvalidToken)?;

    let claims: JwtClaims =
        serde_json::from_slice(&payload_json).map_err(|_| AuthError::InvalidToken)?;

    if claims.exp < chrono::Utc::now().timestamp().max(0) as u64 {
        return Err(AuthError::TokenExpired);
    }

    if let Some(aud) = &claims.aud {
        if aud != EXPECTED_AUDIENCE {
            return Err(AuthError::InvalidAudience);
        }
    }

    Ok(claims)
}

/// Extract JWT from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Role of a user inside their company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    /// Owners and admins may change settings, delete records and import data
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Owner => "Owner",
            Role::Admin => "Admin",
            Role::Member => "Member",
        };
        f.write_str(name)
    }
}

/// Unknown or missing roles get the least privileged role
fn parse_role(raw: Option<&str>) -> Role {
    raw.and_then(|r| r.parse().ok()).unwrap_or(Role::Member)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,

    #[error("Invalid authorization header format")]
    InvalidFormat,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid audience")]
    InvalidAudience,

    #[error("User is not associated with a company")]
    NoCompany,

    #[error("Could not resolve company membership")]
    Lookup(#[from] SupabaseError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidFormat => AppError::BadRequest(message),
            AuthError::NoCompany => AppError::Forbidden(message),
            AuthError::Lookup(e) => AppError::Internal(format!("{}: {}", message, e)),
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::InvalidAudience => AppError::Unauthorized(message),
        }
    }
}

/// Authenticated user extractor result
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    pub email: Option<String>,
    /// Token came from the session cookie rather than the Authorization header
    pub via_cookie: bool,
}

impl AuthenticatedUser {
    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.role.can_manage() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "This action requires the Owner or Admin role".to_string(),
            ))
        }
    }
}

/// Middleware to require authentication
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (token, via_cookie) = match request.headers().get("Authorization") {
        Some(value) => {
            let header = value.to_str().map_err(|_| AuthError::InvalidFormat)?;
            let token = extract_bearer_token(header).ok_or(AuthError::InvalidFormat)?;
            (token.to_string(), false)
        }
        None => {
            let jar = CookieJar::from_headers(request.headers());
            let token = jar
                .get(ACCESS_TOKEN_COOKIE)
                .map(|c| c.value().to_string())
                .ok_or(AuthError::MissingToken)?;
            (token, true)
        }
    };

    let claims = verify_jwt(&token, &state.config.supabase_jwt_secret)?;

    let (company_id, role) = match claims.app_metadata.company_id {
        Some(company_id) => (company_id, parse_role(claims.app_metadata.role.as_deref())),
        None => {
            let membership = state
                .user_store
                .membership(claims.sub)
                .await
                .map_err(AuthError::Lookup)?
                .ok_or(AuthError::NoCompany)?;
            (membership.company_id, parse_role(membership.role.as_deref()))
        }
    };

    debug!(user_id = %claims.sub, company_id = %company_id, "Authenticated request");

    let auth_user = AuthenticatedUser {
        user_id: claims.sub,
        company_id,
        role,
        email: claims.email,
        via_cookie,
    };

    // Insert into request extensions for handlers to access
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Middleware rejecting cookie-authenticated writes without a valid CSRF token.
/// Must run after `require_auth`.
pub async fn csrf_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let safe_method = matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    );
    let via_cookie = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|u| u.via_cookie)
        .unwrap_or(false);

    if safe_method || !via_cookie {
        return Ok(next.run(request).await);
    }

    let jar = CookieJar::from_headers(request.headers());
    let cookie_token = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok());

    if !csrf::validate(&state.config.csrf_secret, cookie_token.as_deref(), header_token) {
        warn!(path = %request.uri().path(), "Rejected request with invalid CSRF token");
        return Err(AppError::Forbidden("Invalid CSRF token".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use super::*;

    /// Sign arbitrary claims with HS256
    pub fn sign(claims: &serde_json::Value, secret: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", header, payload).as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}.{}", header, payload, signature)
    }

    /// Token for a user bound to `company_id` via app_metadata
    pub fn for_company(user_id: Uuid, company_id: Uuid, role: &str, secret: &str) -> String {
        let exp = chrono::Utc::now().timestamp() + 3600;
        sign(
            &serde_json::json!({
                "sub": user_id,
                "aud": "authenticated",
                "exp": exp,
                "email": "owner@example.com",
                "role": "authenticated",
                "app_metadata": { "company_id": company_id, "role": role }
            }),
            secret,
        )
    }
}
