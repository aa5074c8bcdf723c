//! Persistence of enriched trips.
//!
//! [`TripStore`] is the storage seam used by the ingestion cycle and the
//! history endpoint. [`SqliteTripStore`] keeps one row per `trip_id`; the
//! `UNIQUE` constraint on that column is what guarantees a trip is stored
//! once, the existence check in front of it only saves a serialization.
//!
//! SQLite calls are blocking, so every operation runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, ffi, params};
use tracing::{debug, info};

use crate::model::{EnrichedStop, EnrichedTrip, StoredTrip};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trips (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    trip_id     TEXT    NOT NULL UNIQUE,
    start_time  TEXT    NOT NULL,
    start_date  TEXT    NOT NULL,
    stops_json  TEXT    NOT NULL,
    created_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trips_created_at ON trips (created_at);
";

/// Result of offering a trip to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Stored,
    AlreadyPresent,
}

#[async_trait]
pub trait TripStore: Send + Sync {
    /// Returns `true` if a trip with this id is on file.
    async fn exists(&self, trip_id: &str) -> Result<bool>;

    /// Stores `trip` unless its id is already on file. Existing rows are never touched.
    async fn store_if_new(&self, trip: &EnrichedTrip) -> Result<StoreOutcome>;

    /// Offers every trip of one ingestion cycle, atomically.
    async fn store_all_if_new(&self, trips: &[EnrichedTrip]) -> Result<Vec<StoreOutcome>>;

    /// All stored trips, most recently created first.
    async fn list_history(&self) -> Result<Vec<StoredTrip>>;
}

/// SQLite-backed [`TripStore`].
pub struct SqliteTripStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTripStore {
    /// Opens (or creates) the database file at `path` and ensures the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        info!(path = %path.display(), "Trip database opened");
        Self::with_connection(conn)
    }

    /// A private, non-persistent store.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("failed to create trips schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| anyhow!("trip database lock poisoned"))?;
            f(&mut conn)
        })
        .await?
    }

    /// Same as [`TripStore::store_if_new`] with an explicit creation time.
    pub async fn store_if_new_at(
        &self,
        trip: &EnrichedTrip,
        created_at: DateTime<Utc>,
    ) -> Result<StoreOutcome> {
        let trip = trip.clone();
        self.with_conn(move |conn| insert_if_new(conn, &trip, created_at))
            .await
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn exists(&self, trip_id: &str) -> Result<bool> {
        let trip_id = trip_id.to_string();
        self.with_conn(move |conn| trip_exists(conn, &trip_id)).await
    }

    async fn store_if_new(&self, trip: &EnrichedTrip) -> Result<StoreOutcome> {
        self.store_if_new_at(trip, Utc::now()).await
    }

    #[tracing::instrument(skip_all, fields(trips = trips.len()))]
    async fn store_all_if_new(&self, trips: &[EnrichedTrip]) -> Result<Vec<StoreOutcome>> {
        let trips = trips.to_vec();
        let created_at = Utc::now();
        self.with_conn(move |conn| insert_all_if_new(conn, &trips, created_at))
            .await
    }

    async fn list_history(&self) -> Result<Vec<StoredTrip>> {
        self.with_conn(|conn| load_history(conn)).await
    }
}

fn trip_exists(conn: &Connection, trip_id: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM trips WHERE trip_id = ?1",
            params![trip_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_if_new(
    conn: &Connection,
    trip: &EnrichedTrip,
    created_at: DateTime<Utc>,
) -> Result<StoreOutcome> {
    if trip_exists(conn, &trip.trip_id)? {
        return Ok(StoreOutcome::AlreadyPresent);
    }
    insert_row(conn, trip, created_at)
}

/// Inserts `trip` without looking first. A row already holding its
/// `trip_id` wins and the result is [`StoreOutcome::AlreadyPresent`].
fn insert_row(
    conn: &Connection,
    trip: &EnrichedTrip,
    created_at: DateTime<Utc>,
) -> Result<StoreOutcome> {
    let stops_json = serde_json::to_string(&trip.stops)?;
    let inserted = conn.execute(
        "INSERT INTO trips (trip_id, start_time, start_date, stops_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (trip_id) DO NOTHING",
        params![
            trip.trip_id,
            trip.start_time,
            trip.start_date,
            stops_json,
            created_at.timestamp_micros()
        ],
    );

    let outcome = insert_outcome(inserted)?;
    if outcome == StoreOutcome::Stored {
        debug!(trip_id = %trip.trip_id, "Trip stored");
    }
    Ok(outcome)
}

/// Another writer may have inserted the same trip_id first: zero rows
/// changed, or a UNIQUE violation. Other constraint failures are errors.
fn insert_outcome(inserted: rusqlite::Result<usize>) -> Result<StoreOutcome> {
    match inserted {
        Ok(0) => Ok(StoreOutcome::AlreadyPresent),
        Ok(_) => Ok(StoreOutcome::Stored),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(StoreOutcome::AlreadyPresent)
        }
        Err(e) => Err(e.into()),
    }
}

fn insert_all_if_new(
    conn: &mut Connection,
    trips: &[EnrichedTrip],
    created_at: DateTime<Utc>,
) -> Result<Vec<StoreOutcome>> {
    let tx = conn.transaction()?;
    let outcomes = trips
        .iter()
        .map(|trip| insert_if_new(&tx, trip, created_at))
        .collect::<Result<Vec<_>>>()?;
    tx.commit()?;
    Ok(outcomes)
}

struct TripRow {
    trip_id: String,
    start_time: String,
    start_date: String,
    stops_json: String,
    created_at: i64,
}

fn load_history(conn: &Connection) -> Result<Vec<StoredTrip>> {
    let mut stmt = conn.prepare(
        "SELECT trip_id, start_time, start_date, stops_json, created_at
         FROM trips
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(TripRow {
                trip_id: row.get(0)?,
                start_time: row.get(1)?,
                start_date: row.get(2)?,
                stops_json: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(stored_trip).collect()
}

fn stored_trip(row: TripRow) -> Result<StoredTrip> {
    let stops: Vec<EnrichedStop> = serde_json::from_str(&row.stops_json)
        .with_context(|| format!("corrupt stops payload for trip {}", row.trip_id))?;
    let created_at = DateTime::from_timestamp_micros(row.created_at)
        .ok_or_else(|| anyhow!("invalid created_at for trip {}", row.trip_id))?;

    Ok(StoredTrip {
        trip_id: row.trip_id,
        start_time: row.start_time,
        start_date: row.start_date,
        stops,
        created_at,
    })
}
