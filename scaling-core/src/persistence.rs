//! `SQLite` persistence layer for difficulty state.
//!
//! Values are keyed by stable identifiers (player UUID, dimension key) so a
//! save survives restarts and reconnects. The schema:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS player_difficulty (
//!     player_id  TEXT PRIMARY KEY,
//!     difficulty REAL NOT NULL,
//!     last_tick  INTEGER NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS dimension_difficulty (
//!     dimension  TEXT PRIMARY KEY,
//!     difficulty REAL NOT NULL,
//!     last_tick  INTEGER NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS player_health (
//!     player_id    TEXT PRIMARY KEY,
//!     bonus_health REAL NOT NULL,
//!     updated_at   TEXT NOT NULL
//! );
//! ```
//!
//! The store re-clamps everything it loads, so a save written under wider
//! bounds is safe to load under narrower ones.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::health::PlayerHealth;
use crate::types::{DimensionDifficulty, DimensionId, GameTimestamp, PlayerDifficulty, PlayerId};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS player_difficulty (
        player_id  TEXT PRIMARY KEY,
        difficulty REAL NOT NULL,
        last_tick  INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS dimension_difficulty (
        dimension  TEXT PRIMARY KEY,
        difficulty REAL NOT NULL,
        last_tick  INTEGER NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS player_health (
        player_id    TEXT PRIMARY KEY,
        bonus_health REAL NOT NULL,
        updated_at   TEXT NOT NULL
    );";

/// Handle to an open `SQLite` database holding difficulty state.
///
/// # Usage
///
/// ```no_run
/// # use scaling_core::persistence::PersistenceEngine;
/// # use scaling_core::config::PersistenceConfig;
/// # use scaling_core::types::{GameTimestamp, PlayerDifficulty, PlayerId};
/// let engine = PersistenceEngine::open("world_difficulty.db", &PersistenceConfig::default())?;
/// let player = PlayerId::new();
/// engine.save_player(&PlayerDifficulty {
///     player,
///     difficulty: 12.5,
///     last_update: GameTimestamp::now(2400),
/// })?;
/// let loaded = engine.load_player(player)?;
/// # Ok::<(), scaling_core::error::ScalingError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) an `SQLite` database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Difficulty persistence opened"
        );

        Ok(Self { conn, db_path })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Save (upsert) a player's difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn save_player(&self, record: &PlayerDifficulty) -> Result<()> {
        self.conn.execute(
            "INSERT INTO player_difficulty (player_id, difficulty, last_tick, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(player_id) DO UPDATE SET
                difficulty = excluded.difficulty,
                last_tick = excluded.last_tick,
                updated_at = excluded.updated_at",
            params![
                record.player.0.to_string(),
                record.difficulty,
                tick_to_sql(record.last_update.tick),
                record.last_update.real_time.to_rfc3339(),
            ],
        )?;
        debug!(player = %record.player, difficulty = record.difficulty, "Saved player difficulty");
        Ok(())
    }

    /// Load a player's difficulty. Returns `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn load_player(&self, player: PlayerId) -> Result<Option<PlayerDifficulty>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT difficulty, last_tick, updated_at FROM player_difficulty WHERE player_id = ?1",
        )?;
        let row: Option<(f64, i64, String)> = stmt
            .query_row(params![player.0.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        Ok(row.map(|(difficulty, tick, updated_at)| PlayerDifficulty {
            player,
            difficulty,
            last_update: timestamp_from_sql(tick, &updated_at),
        }))
    }

    /// Delete a player's saved difficulty and health.
    ///
    /// Returns `true` if anything was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn delete_player(&self, player: PlayerId) -> Result<bool> {
        let id = player.0.to_string();
        let a = self
            .conn
            .execute("DELETE FROM player_difficulty WHERE player_id = ?1", params![id])?;
        let b = self
            .conn
            .execute("DELETE FROM player_health WHERE player_id = ?1", params![id])?;
        Ok(a + b > 0)
    }

    /// List every player with a saved difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn list_players(&self) -> Result<Vec<PlayerId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT player_id FROM player_difficulty ORDER BY player_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut players = Vec::new();
        for row in rows {
            let id = row?;
            match uuid::Uuid::parse_str(&id) {
                Ok(uuid) => players.push(PlayerId(uuid)),
                Err(_) => warn!(id = %id, "Skipping row with invalid UUID"),
            }
        }
        Ok(players)
    }

    /// Number of players with a saved difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn player_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM player_difficulty", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // ------------------------------------------------------------------
    // Dimensions
    // ------------------------------------------------------------------

    /// Save (upsert) a dimension's difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn save_dimension(&self, record: &DimensionDifficulty) -> Result<()> {
        self.conn.execute(
            "INSERT INTO dimension_difficulty (dimension, difficulty, last_tick, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(dimension) DO UPDATE SET
                difficulty = excluded.difficulty,
                last_tick = excluded.last_tick,
                updated_at = excluded.updated_at",
            params![
                record.dimension.as_str(),
                record.difficulty,
                tick_to_sql(record.last_update.tick),
                record.last_update.real_time.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load one dimension's difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn load_dimension(&self, dimension: &DimensionId) -> Result<Option<DimensionDifficulty>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT difficulty, last_tick, updated_at FROM dimension_difficulty WHERE dimension = ?1",
        )?;
        let row: Option<(f64, i64, String)> = stmt
            .query_row(params![dimension.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        Ok(row.map(|(difficulty, tick, updated_at)| DimensionDifficulty {
            dimension: dimension.clone(),
            difficulty,
            last_update: timestamp_from_sql(tick, &updated_at),
        }))
    }

    /// Load every saved dimension.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn load_dimensions(&self) -> Result<Vec<DimensionDifficulty>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT dimension, difficulty, last_tick, updated_at
             FROM dimension_difficulty ORDER BY dimension",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut dimensions = Vec::new();
        for row in rows {
            let (dimension, difficulty, tick, updated_at) = row?;
            dimensions.push(DimensionDifficulty {
                dimension: DimensionId(dimension),
                difficulty,
                last_update: timestamp_from_sql(tick, &updated_at),
            });
        }
        Ok(dimensions)
    }

    // ------------------------------------------------------------------
    // Player health
    // ------------------------------------------------------------------

    /// Save (upsert) a player's bonus health.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn save_health(&self, player: PlayerId, health: &PlayerHealth) -> Result<()> {
        self.conn.execute(
            "INSERT INTO player_health (player_id, bonus_health, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(player_id) DO UPDATE SET
                bonus_health = excluded.bonus_health,
                updated_at = excluded.updated_at",
            params![player.0.to_string(), health.bonus_health, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Load a player's bonus health.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn load_health(&self, player: PlayerId) -> Result<Option<PlayerHealth>> {
        let bonus: Option<f64> = self
            .conn
            .query_row(
                "SELECT bonus_health FROM player_health WHERE player_id = ?1",
                params![player.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(bonus.map(|bonus_health| PlayerHealth { bonus_health }))
    }

    // ------------------------------------------------------------------
    // Batch
    // ------------------------------------------------------------------

    /// Save many records in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures; on
    /// error nothing from this batch is committed.
    pub fn save_snapshot(
        &self,
        players: &[PlayerDifficulty],
        dimensions: &[DimensionDifficulty],
    ) -> Result<()> {
        let start = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        for record in players {
            self.save_player(record)?;
        }
        for record in dimensions {
            self.save_dimension(record)?;
        }
        tx.commit()?;

        debug!(
            players = players.len(),
            dimensions = dimensions.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved difficulty snapshot"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` using `SQLite`'s online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] on `SQLite` failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Difficulty database backup completed"
        );
        Ok(())
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run `PRAGMA integrity_check`. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScalingError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

fn tick_to_sql(tick: u64) -> i64 {
    i64::try_from(tick).unwrap_or(i64::MAX)
}

fn timestamp_from_sql(tick: i64, updated_at: &str) -> GameTimestamp {
    let real_time = DateTime::parse_from_rfc3339(updated_at).map_or_else(
        |_| {
            warn!(updated_at, "Unparseable save timestamp; using now");
            Utc::now()
        },
        |t| t.with_timezone(&Utc),
    );
    GameTimestamp {
        tick: u64::try_from(tick).unwrap_or(0),
        real_time,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(player: PlayerId, difficulty: f64, tick: u64) -> PlayerDifficulty {
        PlayerDifficulty {
            player,
            difficulty,
            last_update: GameTimestamp::now(tick),
        }
    }

    #[test]
    fn player_save_load() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let p = PlayerId::new();
        engine.save_player(&record(p, 33.5, 1200)).expect("save");

        let loaded = engine.load_player(p).expect("load").expect("Some");
        assert!((loaded.difficulty - 33.5).abs() < f64::EPSILON);
        assert_eq!(loaded.last_update.tick, 1200);
    }

    #[test]
    fn load_unknown_player_returns_none() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        assert!(engine.load_player(PlayerId::new()).expect("load").is_none());
    }

    #[test]
    fn upsert_overwrites() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let p = PlayerId::new();
        engine.save_player(&record(p, 1.0, 10)).expect("save1");
        engine.save_player(&record(p, 2.0, 20)).expect("save2");

        let loaded = engine.load_player(p).expect("load").expect("Some");
        assert!((loaded.difficulty - 2.0).abs() < f64::EPSILON);
        assert_eq!(engine.player_count().expect("count"), 1);
    }

    #[test]
    fn delete_and_list() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let (a, b) = (PlayerId::new(), PlayerId::new());
        engine.save_player(&record(a, 1.0, 0)).expect("save");
        engine.save_player(&record(b, 1.0, 0)).expect("save");
        engine.save_health(a, &PlayerHealth { bonus_health: 4.0 }).expect("health");

        assert_eq!(engine.list_players().expect("list").len(), 2);
        assert!(engine.delete_player(a).expect("delete"));
        assert!(!engine.delete_player(a).expect("delete again"));
        assert_eq!(engine.list_players().expect("list"), vec![b]);
        assert!(engine.load_health(a).expect("health").is_none());
    }

    #[test]
    fn dimensions_save_and_load_all() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let nether = DimensionDifficulty {
            dimension: DimensionId::from("minecraft:the_nether"),
            difficulty: 80.0,
            last_update: GameTimestamp::now(500),
        };
        let overworld = DimensionDifficulty {
            dimension: DimensionId::overworld(),
            difficulty: 12.0,
            last_update: GameTimestamp::now(500),
        };
        engine.save_snapshot(&[], &[nether.clone(), overworld]).expect("snapshot");

        let one = engine
            .load_dimension(&nether.dimension)
            .expect("load")
            .expect("Some");
        assert!((one.difficulty - 80.0).abs() < f64::EPSILON);
        assert_eq!(engine.load_dimensions().expect("all").len(), 2);
    }

    #[test]
    fn health_round_trip() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        let p = PlayerId::new();
        engine.save_health(p, &PlayerHealth { bonus_health: -2.0 }).expect("save");
        let loaded = engine.load_health(p).expect("load").expect("Some");
        assert!((loaded.bonus_health + 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn integrity_check_passes() {
        let engine = PersistenceEngine::open_in_memory().expect("open");
        assert!(engine.integrity_check().expect("check"));
    }

    #[test]
    fn file_based_open_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("difficulty.db");
        let config = PersistenceConfig::default();

        let engine = PersistenceEngine::open(&db_path, &config).expect("open");
        let p = PlayerId::new();
        engine.save_player(&record(p, 99.0, 42)).expect("save");

        let backup_path = dir.path().join("difficulty_backup.db");
        engine.backup(&backup_path).expect("backup");

        let restored = PersistenceEngine::open(&backup_path, &config).expect("open backup");
        let loaded = restored.load_player(p).expect("load").expect("Some");
        assert!((loaded.difficulty - 99.0).abs() < f64::EPSILON);
    }
}
