//! Schema creation, in-place evolution, and seed rows.
//!
//! Runs once at startup inside a single transaction. Older databases may
//! predate the descriptive tank columns, the pump and reading `flow`
//! columns, or still carry the retired `pump_mode` column; each step
//! inspects `pragma_table_info` first so the whole routine is idempotent.
//!
//! The first reading layout declared `tank_id` and `level` nullable.
//! `SQLite` cannot add a constraint to an existing column, so such a table
//! is rebuilt; rows missing either value are not carried over.

use hmi_types::TankCategory;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::DbError;

const CREATE_TANKS: &str = r"CREATE TABLE IF NOT EXISTS tanks (
    id TEXT PRIMARY KEY,
    level REAL NOT NULL,
    bloco TEXT,
    categoria TEXT,
    local TEXT
)";

const CREATE_PUMPS: &str = r"CREATE TABLE IF NOT EXISTS pumps (
    id TEXT PRIMARY KEY,
    is_on INTEGER NOT NULL DEFAULT 0,
    flow REAL
)";

const CREATE_READINGS: &str = r"CREATE TABLE IF NOT EXISTS readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tank_id TEXT NOT NULL,
    level REAL NOT NULL,
    flow REAL NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL
)";

/// Rebuild steps for a `readings` table with nullable `tank_id`/`level`.
const REBUILD_READINGS: &[&str] = &[
    r"CREATE TABLE readings_rebuilt (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tank_id TEXT NOT NULL,
    level REAL NOT NULL,
    flow REAL NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL
)",
    r"INSERT INTO readings_rebuilt (id, tank_id, level, flow, timestamp)
    SELECT id, tank_id, level, COALESCE(flow, 0), COALESCE(timestamp, CURRENT_TIMESTAMP)
    FROM readings
    WHERE tank_id IS NOT NULL AND level IS NOT NULL",
    "DROP TABLE readings",
    "ALTER TABLE readings_rebuilt RENAME TO readings",
];

const CREATE_READINGS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_readings_tank_id ON readings (tank_id, id)";

/// Columns added after the first release: `(table, column, definition)`.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("tanks", "bloco", "TEXT"),
    ("tanks", "categoria", "TEXT"),
    ("tanks", "local", "TEXT"),
    ("pumps", "flow", "REAL"),
    ("readings", "flow", "REAL NOT NULL DEFAULT 0"),
];

/// Columns no longer written: `(table, column)`.
const DROPPED_COLUMNS: &[(&str, &str)] = &[("pumps", "pump_mode")];

/// Seed tanks: `(id, level, categoria)`.
const SEED_TANKS: &[(&str, f64, TankCategory)] = &[
    ("T-100", 50.0, TankCategory::Inferior),
    ("T-200", 60.0, TankCategory::Superior),
];

/// Seed pumps, all stopped.
const SEED_PUMPS: &[&str] = &["P-100", "P-200"];

/// Create, evolve, and seed the schema in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlite`] if any statement fails.
pub async fn init(pool: &SqlitePool) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    for ddl in [CREATE_TANKS, CREATE_PUMPS, CREATE_READINGS] {
        sqlx::query(ddl).execute(&mut *tx).await?;
    }

    for &(table, column, definition) in ADDED_COLUMNS {
        if !has_column(&mut tx, table, column).await? {
            sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))
                .execute(&mut *tx)
                .await?;
            tracing::info!(table, column, "Added column");
        }
    }

    for &(table, column) in DROPPED_COLUMNS {
        if has_column(&mut tx, table, column).await? {
            sqlx::query(&format!("ALTER TABLE {table} DROP COLUMN {column}"))
                .execute(&mut *tx)
                .await?;
            tracing::info!(table, column, "Dropped obsolete column");
        }
    }

    if has_nullable_reading_columns(&mut tx).await? {
        for &step in REBUILD_READINGS {
            sqlx::query(step).execute(&mut *tx).await?;
        }
        tracing::info!(table = "readings", "Rebuilt table with NOT NULL tank_id and level");
    }

    sqlx::query(CREATE_READINGS_INDEX).execute(&mut *tx).await?;

    for &(id, level, category) in SEED_TANKS {
        sqlx::query("INSERT OR IGNORE INTO tanks (id, level, categoria) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(level)
            .bind(category.as_str())
            .execute(&mut *tx)
            .await?;
    }

    for &id in SEED_PUMPS {
        sqlx::query("INSERT OR IGNORE INTO pumps (id, is_on) VALUES (?1, 0)")
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Whether `table` currently has a column named `column`.
///
/// `table` is always one of the constants above, never caller input.
async fn has_column(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?1"
    ))
    .bind(column)
    .fetch_one(&mut **tx)
    .await?;
    Ok(count > 0)
}

/// Whether `readings.tank_id` or `readings.level` still accepts NULL.
async fn has_nullable_reading_columns(tx: &mut Transaction<'_, Sqlite>) -> Result<bool, DbError> {
    let count: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM pragma_table_info('readings')
        WHERE name IN ('tank_id', 'level') AND "notnull" = 0"#,
    )
    .fetch_one(&mut **tx)
    .await?;
    Ok(count > 0)
}
