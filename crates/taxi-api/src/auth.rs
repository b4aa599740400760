//! # Authentication
//!
//! Password hashing, login sessions, and the middleware that gates every
//! page except the health probes and the login endpoint.
//!
//! Passwords are stretched with PBKDF2-HMAC-SHA256. The iteration count is
//! stored with each hash, so raising `PASSWORD_ITERATIONS` only affects new
//! hashes. Hashing runs on the blocking pool.
//!
//! ## Flow
//!
//! ```text
//! POST /accounts/login {username, password}  →  {token, driver}
//! GET  /cars  Authorization: Bearer {token}   →  200
//! GET  /cars  (no header / unknown token)     →  401
//! ```
//!
//! Tokens are 32 random bytes, hex encoded. The session store keys sessions
//! by the SHA-256 of the token, so the tokens themselves are never held in
//! memory after they are handed to the client.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pbkdf2::pbkdf2_hmac;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroize;

use crate::error::{AppError, ErrorBody, ErrorDetail};

const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const TOKEN_LEN: usize = 32;
const HASH_SCHEME: &str = "pbkdf2-sha256";

/// PBKDF2 rounds for new hashes unless configured otherwise.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

/// Fewest PBKDF2 rounds a new hash is created with.
pub const MIN_PASSWORD_ITERATIONS: u32 = 1_000;

// ── Hex ─────────────────────────────────────────────────────────────────────

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("hex string has odd length".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex at offset {i}"))
        })
        .collect()
}

// ── Password hashing ────────────────────────────────────────────────────────

/// PBKDF2-HMAC-SHA256 password hash.
///
/// Stored as `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`. `Debug`
/// never prints the digest.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash {
    iterations: u32,
    salt: [u8; SALT_LEN],
    digest: [u8; DIGEST_LEN],
}

impl PasswordHash {
    /// Hash `password` under a fresh random salt.
    ///
    /// `iterations` below [`MIN_PASSWORD_ITERATIONS`] are raised to it.
    pub fn new(password: &str, iterations: u32) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self::derive(password, salt, iterations.max(MIN_PASSWORD_ITERATIONS))
    }

    fn derive(password: &str, salt: [u8; SALT_LEN], iterations: u32) -> Self {
        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut digest);
        Self {
            iterations,
            salt,
            digest,
        }
    }

    /// Constant-time check of `password` against this hash.
    pub fn verify(&self, password: &str) -> bool {
        let mut candidate = Self::derive(password, self.salt, self.iterations);
        let matched: bool = candidate.digest.ct_eq(&self.digest).into();
        candidate.digest.zeroize();
        matched
    }

    /// Spend the same work as [`PasswordHash::verify`] and fail.
    ///
    /// Used when no account matches, so unknown usernames and wrong
    /// passwords take equally long to reject.
    pub fn verify_unknown(password: &str, iterations: u32) -> bool {
        let placeholder = Self {
            iterations: iterations.max(MIN_PASSWORD_ITERATIONS),
            salt: [0u8; SALT_LEN],
            digest: [0u8; DIGEST_LEN],
        };
        std::hint::black_box(placeholder.verify(password));
        false
    }

    /// PBKDF2 rounds this hash was created with.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encode for storage.
    pub fn encode(&self) -> String {
        format!(
            "{HASH_SCHEME}${}${}${}",
            self.iterations,
            hex_encode(&self.salt),
            hex_encode(&self.digest)
        )
    }

    /// Decode a value produced by [`PasswordHash::encode`].
    pub fn decode(encoded: &str) -> Result<Self, String> {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(digest), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err("expected scheme$iterations$salt$digest".to_string());
        };
        if scheme != HASH_SCHEME {
            return Err(format!("unsupported hash scheme: {scheme}"));
        }
        let iterations: u32 = iterations
            .parse()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid iteration count: {iterations}"))?;
        let salt: [u8; SALT_LEN] = hex_decode(salt)?
            .try_into()
            .map_err(|_| "salt has wrong length".to_string())?;
        let digest: [u8; DIGEST_LEN] = hex_decode(digest)?
            .try_into()
            .map_err(|_| "digest has wrong length".to_string())?;
        Ok(Self {
            iterations,
            salt,
            digest,
        })
    }
}

/// Hash a password on the blocking pool.
pub async fn hash_password(password: String, iterations: u32) -> Result<PasswordHash, AppError> {
    tokio::task::spawn_blocking(move || PasswordHash::new(&password, iterations))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))
}

/// Check a password on the blocking pool.
///
/// `None` means no account matched; the check still costs a full
/// derivation at `iterations` rounds and returns `false`.
pub async fn verify_password(
    hash: Option<PasswordHash>,
    password: String,
    iterations: u32,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => hash.verify(&password),
        None => PasswordHash::verify_unknown(&password, iterations),
    })
    .await
    .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

// ── Sessions ────────────────────────────────────────────────────────────────

/// A logged-in driver's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub driver_id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Number of times the index page was viewed in this session.
    pub num_visits: u64,
}

/// Session key: SHA-256 of the bearer token, hex encoded.
fn session_key(token: &str) -> String {
    hex_encode(&Sha256::digest(token.as_bytes()))
}

/// In-memory session registry, cloneable and shared across requests.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("active", &self.sessions.read().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionStore {
    /// Create an empty store whose sessions live for `ttl`.
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Open a session for a driver, returning the bearer token.
    pub fn create(&self, driver_id: Uuid, username: &str) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        let token = hex_encode(&bytes);
        bytes.zeroize();

        let now = Utc::now();
        let session = Session {
            driver_id,
            username: username.to_string(),
            created_at: now,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            num_visits: 0,
        };
        self.sessions.write().insert(session_key(&token), session);
        token
    }

    /// Resolve a token to its session. Expired sessions are dropped.
    pub fn lookup(&self, token: &str) -> Option<(String, Session)> {
        let key = session_key(token);
        let session = self.sessions.read().get(&key).cloned()?;
        if session.expires_at <= Utc::now() {
            self.sessions.write().remove(&key);
            return None;
        }
        Some((key, session))
    }

    /// Count a visit to the index page, returning the new total.
    pub fn record_visit(&self, key: &str) -> Option<u64> {
        self.sessions.write().get_mut(key).map(|s| {
            s.num_visits += 1;
            s.num_visits
        })
    }

    /// End one session.
    pub fn revoke(&self, key: &str) -> bool {
        self.sessions.write().remove(key).is_some()
    }

    /// End every session belonging to `driver_id`.
    pub fn revoke_driver(&self, driver_id: Uuid) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.driver_id != driver_id);
        before - sessions.len()
    }

    /// Drop all expired sessions.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The logged-in driver making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub driver_id: Uuid,
    pub username: String,
    /// Key of the session the request authenticated with.
    pub session_key: String,
}

/// Axum `FromRequestParts` implementation for `CallerIdentity`.
///
/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("login required".into()))
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Require a live session on every request passing through.
///
/// Reads `Authorization: Bearer {token}`, resolves it against the
/// [`SessionStore`] in request extensions, and injects [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(sessions) = request.extensions().get::<SessionStore>().cloned() else {
        tracing::error!("session store missing from request extensions");
        return unauthorized_response("login required");
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => token.trim().to_string(),
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return unauthorized_response("authorization header must use Bearer scheme");
            }
        },
        None => {
            tracing::debug!(path = %request.uri().path(), "unauthenticated request");
            return unauthorized_response("login required");
        }
    };

    match sessions.lookup(&token) {
        Some((session_key, session)) => {
            request.extensions_mut().insert(CallerIdentity {
                driver_id: session.driver_id,
                username: session.username,
                session_key,
            });
            next.run(request).await
        }
        None => {
            tracing::warn!("authentication failed: unknown or expired session");
            unauthorized_response("session is invalid or has expired")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(sessions: SessionStore) -> Router {
        Router::new()
            .route(
                "/test",
                get(|caller: CallerIdentity| async move { caller.username }),
            )
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(sessions))
    }

    fn sessions() -> SessionStore {
        SessionStore::new(chrono::Duration::hours(1))
    }

    // ── Passwords ────────────────────────────────────────────────

    fn hash(password: &str) -> PasswordHash {
        PasswordHash::new(password, MIN_PASSWORD_ITERATIONS)
    }

    #[test]
    fn password_hash_verifies_only_matching_password() {
        let hash = hash("3231qwerty");
        assert!(hash.verify("3231qwerty"));
        assert!(!hash.verify("3231qwertY"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn password_hashes_are_salted() {
        assert_ne!(hash("same"), hash("same"));
    }

    #[test]
    fn iteration_count_changes_the_digest() {
        let salt = [7u8; SALT_LEN];
        let a = PasswordHash::derive("password", salt, 1_000);
        let b = PasswordHash::derive("password", salt, 1_001);
        assert_ne!(a.digest, b.digest);
        assert_eq!(a, PasswordHash::derive("password", salt, 1_000));
    }

    #[test]
    fn password_hash_raises_low_iteration_counts() {
        assert_eq!(PasswordHash::new("x", 1).iterations(), MIN_PASSWORD_ITERATIONS);
        assert_eq!(PasswordHash::new("x", 5_000).iterations(), 5_000);
    }

    #[test]
    fn password_hash_encoding_roundtrips() {
        let hash = PasswordHash::new("secret-pass", 2_000);
        let encoded = hash.encode();
        assert!(encoded.starts_with("pbkdf2-sha256$2000$"));
        let decoded = PasswordHash::decode(&encoded).unwrap();
        assert_eq!(decoded, hash);
        assert!(decoded.verify("secret-pass"));
    }

    #[test]
    fn password_hash_decode_rejects_garbage() {
        let zeros = "00".repeat(SALT_LEN);
        let digest = "00".repeat(DIGEST_LEN);
        assert!(PasswordHash::decode("").is_err());
        assert!(PasswordHash::decode(&format!("sha256${zeros}${digest}")).is_err());
        assert!(PasswordHash::decode(&format!("md5$1000${zeros}${digest}")).is_err());
        assert!(PasswordHash::decode(&format!("pbkdf2-sha256$0${zeros}${digest}")).is_err());
        assert!(PasswordHash::decode(&format!("pbkdf2-sha256$abc${zeros}${digest}")).is_err());
        assert!(PasswordHash::decode(&format!("pbkdf2-sha256$1000$zz${digest}")).is_err());
        assert!(PasswordHash::decode("pbkdf2-sha256$1000$00$00").is_err());
        assert!(PasswordHash::decode(&format!("pbkdf2-sha256$1000${zeros}${digest}")).is_ok());
    }

    #[test]
    fn password_hash_debug_is_redacted() {
        assert_eq!(format!("{:?}", hash("x")), "PasswordHash([REDACTED])");
    }

    #[test]
    fn unknown_account_never_verifies() {
        assert!(!PasswordHash::verify_unknown("", MIN_PASSWORD_ITERATIONS));
        assert!(!PasswordHash::verify_unknown("3231qwerty", MIN_PASSWORD_ITERATIONS));
    }

    #[tokio::test]
    async fn blocking_helpers_hash_and_verify() {
        let hash = hash_password("3231qwerty".into(), MIN_PASSWORD_ITERATIONS)
            .await
            .unwrap();
        assert!(verify_password(Some(hash.clone()), "3231qwerty".into(), MIN_PASSWORD_ITERATIONS)
            .await
            .unwrap());
        assert!(!verify_password(Some(hash), "nope".into(), MIN_PASSWORD_ITERATIONS)
            .await
            .unwrap());
        assert!(!verify_password(None, "3231qwerty".into(), MIN_PASSWORD_ITERATIONS)
            .await
            .unwrap());
    }

    #[test]
    fn hex_decode_valid_and_invalid() {
        assert_eq!(hex_decode("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert!(hex_decode("abc").is_err());
        assert!(hex_decode("zz").is_err());
    }

    // ── Sessions ─────────────────────────────────────────────────

    #[test]
    fn session_lookup_and_revoke() {
        let store = sessions();
        let driver = Uuid::new_v4();
        let token = store.create(driver, "test");
        assert_eq!(token.len(), TOKEN_LEN * 2);

        let (key, session) = store.lookup(&token).unwrap();
        assert_eq!(session.driver_id, driver);
        assert_ne!(key, token);
        assert!(store.revoke(&key));
        assert!(store.lookup(&token).is_none());
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let store = SessionStore::new(chrono::Duration::seconds(-1));
        let token = store.create(Uuid::new_v4(), "test");
        assert!(store.lookup(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn far_future_expiry_saturates() {
        let store = SessionStore::new(chrono::Duration::days(365 * 1_000_000));
        let token = store.create(Uuid::new_v4(), "test");
        let (_, session) = store.lookup(&token).unwrap();
        assert_eq!(session.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn purge_expired_drops_stale_sessions() {
        let store = SessionStore::new(chrono::Duration::seconds(-1));
        store.create(Uuid::new_v4(), "a");
        store.create(Uuid::new_v4(), "b");
        assert_eq!(store.purge_expired(), 2);
    }

    #[test]
    fn visits_are_counted_per_session() {
        let store = sessions();
        let driver = Uuid::new_v4();
        let (a, _) = store.lookup(&store.create(driver, "test")).unwrap();
        let (b, _) = store.lookup(&store.create(driver, "test")).unwrap();
        assert_eq!(store.record_visit(&a), Some(1));
        assert_eq!(store.record_visit(&a), Some(2));
        assert_eq!(store.record_visit(&b), Some(1));
        assert_eq!(store.record_visit("missing"), None);
    }

    #[test]
    fn revoke_driver_ends_all_their_sessions() {
        let store = sessions();
        let driver = Uuid::new_v4();
        store.create(driver, "test");
        store.create(driver, "test");
        store.create(Uuid::new_v4(), "other");
        assert_eq!(store.revoke_driver(driver), 2);
        assert_eq!(store.len(), 1);
    }

    // ── Middleware ───────────────────────────────────────────────

    #[tokio::test]
    async fn valid_session_token_accepted() {
        let store = sessions();
        let token = store.create(Uuid::new_v4(), "test");
        let app = test_app(store);

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"test");
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(sessions());
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let app = test_app(sessions());
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer not-a-session")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(sessions());
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(err["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Bearer scheme"));
    }
}
