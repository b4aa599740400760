//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Architecture
//!
//! - **Stores** hold manufacturers, cars, drivers and password hashes in
//!   memory. Reads never touch the database.
//! - **Sessions** map bearer tokens to logged-in drivers.
//! - **Database pool** is optional. When present, every mutation is written
//!   to Postgres before it is applied in memory, and the stores are hydrated
//!   from Postgres on startup.
//! - **Write gate** serializes mutations so uniqueness checks, the database
//!   write and the in-memory update happen as one step.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use taxi_core::{LicenseNumber, Searchable, Username};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{
    PasswordHash, SessionStore, DEFAULT_PASSWORD_ITERATIONS, MIN_PASSWORD_ITERATIONS,
};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// All operations are synchronous (the RwLock is `parking_lot`, not `tokio::sync`)
/// because we never hold the lock across `.await` points. `parking_lot::RwLock`
/// is non-poisonable.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    /// Retrieve a record by ID.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// List all records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Return the first record matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| predicate(v)).cloned()
    }

    /// Whether any record matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.data.read().values().any(predicate)
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        if let Some(entry) = guard.get_mut(id) {
            f(entry);
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Apply `f` to every record, returning how many it changed.
    pub fn update_all(&self, mut f: impl FnMut(&mut T) -> bool) -> usize {
        self.data
            .write()
            .values_mut()
            .map(|v| f(v))
            .filter(|changed| *changed)
            .count()
    }

    /// Remove a record by ID.
    pub fn remove(&self, id: &Uuid) -> Option<T> {
        self.data.write().remove(id)
    }

    /// Remove every record matching `predicate`, returning them.
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut guard = self.data.write();
        let ids: Vec<Uuid> = guard
            .iter()
            .filter(|(_, v)| predicate(v))
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| guard.remove(id)).collect()
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &Uuid) -> bool {
        self.data.read().contains_key(id)
    }

    /// Return the number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Fleet Records ------------------------------------------------------------

/// A car manufacturer. Names are unique, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ManufacturerRecord {
    pub id: Uuid,
    pub name: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for ManufacturerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Searchable for ManufacturerRecord {
    fn search_key(&self) -> &str {
        &self.name
    }
}

/// A car in the fleet and the drivers assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CarRecord {
    pub id: Uuid,
    pub model: String,
    pub manufacturer_id: Uuid,
    #[schema(value_type = Vec<Uuid>)]
    pub driver_ids: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for CarRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.model)
    }
}

impl Searchable for CarRecord {
    fn search_key(&self) -> &str {
        &self.model
    }
}

/// A driver account. Credentials are kept in [`AppState::credentials`],
/// never on the record, so serializing a driver cannot leak a hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DriverRecord {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[schema(value_type = String, example = "ABC12345")]
    pub license_number: LicenseNumber,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for DriverRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} {})",
            self.username, self.first_name, self.last_name
        )
    }
}

impl Searchable for DriverRecord {
    fn search_key(&self) -> &str {
        self.username.as_str()
    }
}

// -- Application State --------------------------------------------------------

/// Default number of records per list page.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Default session lifetime: two weeks.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 14 * 24 * 60 * 60;

/// Longest accepted session lifetime: ten years.
pub const MAX_SESSION_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Most PBKDF2 rounds accepted from configuration.
pub const MAX_PASSWORD_ITERATIONS: u32 = 10_000_000;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Records per list page.
    pub page_size: usize,
    /// Session lifetime in seconds, clamped to `1..=MAX_SESSION_TTL_SECS`.
    pub session_ttl_secs: i64,
    /// PBKDF2 rounds for newly stored password hashes.
    pub password_iterations: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            page_size: DEFAULT_PAGE_SIZE,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        }
    }
}

impl AppConfig {
    /// Build configuration from `PORT`, `PAGE_SIZE`, `SESSION_TTL_SECS` and
    /// `PASSWORD_ITERATIONS`.
    ///
    /// Unset variables take their defaults. Unparseable values are logged
    /// and also fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_var(&lookup, "PORT", defaults.port),
            page_size: parse_var(&lookup, "PAGE_SIZE", defaults.page_size).max(1),
            session_ttl_secs: parse_var(&lookup, "SESSION_TTL_SECS", defaults.session_ttl_secs)
                .clamp(1, MAX_SESSION_TTL_SECS),
            password_iterations: parse_var(
                &lookup,
                "PASSWORD_ITERATIONS",
                defaults.password_iterations,
            )
            .clamp(MIN_PASSWORD_ITERATIONS, MAX_PASSWORD_ITERATIONS),
        }
    }
}

fn parse_var<T: std::str::FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "ignoring unparseable setting");
            default
        }),
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub manufacturers: Store<ManufacturerRecord>,
    pub cars: Store<CarRecord>,
    pub drivers: Store<DriverRecord>,
    /// Password hashes keyed by driver id.
    pub credentials: Store<PasswordHash>,
    pub sessions: SessionStore,

    /// Serializes mutations across stores and the database.
    pub write_gate: Arc<tokio::sync::Mutex<()>>,

    /// Postgres pool. `None` means in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// Create an in-memory application state with default configuration.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create an application state with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            manufacturers: Store::new(),
            cars: Store::new(),
            drivers: Store::new(),
            credentials: Store::new(),
            sessions: SessionStore::new(chrono::Duration::seconds(
                config.session_ttl_secs.clamp(1, MAX_SESSION_TTL_SECS),
            )),
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
            db_pool,
            config,
        }
    }

    /// Hydrate in-memory stores from the database.
    ///
    /// Called once on startup when a database pool is available.
    pub async fn hydrate_from_db(&self) -> Result<(), sqlx::Error> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let manufacturers = crate::db::manufacturers::load_all(pool).await?;
        let manufacturer_count = manufacturers.len();
        for record in manufacturers {
            self.manufacturers.insert(record.id, record);
        }

        let drivers = crate::db::drivers::load_all(pool).await?;
        let driver_count = drivers.len();
        for (record, hash) in drivers {
            self.credentials.insert(record.id, hash);
            self.drivers.insert(record.id, record);
        }

        let cars = crate::db::cars::load_all(pool).await?;
        let car_count = cars.len();
        for record in cars {
            self.cars.insert(record.id, record);
        }

        tracing::info!(
            manufacturers = manufacturer_count,
            drivers = driver_count,
            cars = car_count,
            "hydrated in-memory stores from database"
        );

        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
