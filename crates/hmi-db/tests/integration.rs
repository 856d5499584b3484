//! Integration tests for the `hmi-db` data layer.
//!
//! Every test opens its own private in-memory `SQLite` database, so no
//! external services are needed and tests run in parallel.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use chrono::Utc;
use hmi_core::coordinator::{CommitListener, CoordinatorConfig, SensorReading, StateCoordinator};
use hmi_db::{
    DbError, PersistenceWriter, PlantStore, ReadingStore, SqliteConfig, SqliteStore, StateSink,
};
use hmi_types::{PumpId, PumpStatus, TankCategory, TankId};

// =============================================================================
// Helper: open an in-memory store with the schema applied
// =============================================================================

async fn setup_store() -> SqliteStore {
    let store = SqliteStore::connect(&SqliteConfig::in_memory())
        .await
        .expect("Failed to open in-memory SQLite");
    store.init_schema().await.expect("Failed to init schema");
    store
}

async fn column_names(store: &SqliteStore, table: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(&format!("SELECT name FROM pragma_table_info('{table}')"))
        .fetch_all(store.pool())
        .await
        .expect("Failed to read table info")
}

// =============================================================================
// Schema
// =============================================================================

#[tokio::test]
async fn fresh_database_is_seeded() {
    let store = setup_store().await;
    let state = PlantStore::new(store.pool()).load_state().await.unwrap();

    assert_eq!(state.tanks.len(), 2);
    assert_eq!(state.pumps.len(), 2);
    assert!(state.active_alerts.is_empty());

    let t100 = state.tank(&TankId::new("T-100")).unwrap();
    assert!((t100.level - 50.0).abs() < f64::EPSILON);
    assert_eq!(t100.category, Some(TankCategory::Inferior));
    let t200 = state.tank(&TankId::new("T-200")).unwrap();
    assert!((t200.level - 60.0).abs() < f64::EPSILON);
    assert_eq!(t200.category, Some(TankCategory::Superior));

    assert!(state.pumps.iter().all(|p| !p.on));
}

#[tokio::test]
async fn init_schema_is_idempotent_and_keeps_data() {
    let store = setup_store().await;
    PlantStore::new(store.pool())
        .update_tank_level(&TankId::new("T-100"), 12.5)
        .await
        .unwrap();

    store.init_schema().await.unwrap();
    store.init_schema().await.unwrap();

    let state = PlantStore::new(store.pool()).load_state().await.unwrap();
    assert_eq!(state.tanks.len(), 2);
    let t100 = state.tank(&TankId::new("T-100")).unwrap();
    assert!((t100.level - 12.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn legacy_layout_is_evolved_in_place() {
    let store = SqliteStore::connect(&SqliteConfig::in_memory()).await.unwrap();
    let pool = store.pool();

    // A database from before the descriptive columns and flow tracking.
    for ddl in [
        "CREATE TABLE tanks (id TEXT PRIMARY KEY, level REAL NOT NULL)",
        "CREATE TABLE pumps (id TEXT PRIMARY KEY, is_on INTEGER NOT NULL, pump_mode TEXT NOT NULL)",
        "CREATE TABLE readings (id INTEGER PRIMARY KEY AUTOINCREMENT, tank_id TEXT NOT NULL, level REAL NOT NULL, timestamp TEXT NOT NULL)",
        "INSERT INTO tanks (id, level) VALUES ('T-100', 77.0)",
        "INSERT INTO pumps (id, is_on, pump_mode) VALUES ('P-100', 1, 'AUTO')",
        "INSERT INTO readings (tank_id, level, timestamp) VALUES ('T-100', 77.0, '2025-01-01T00:00:00Z')",
    ] {
        sqlx::query(ddl).execute(pool).await.unwrap();
    }

    store.init_schema().await.unwrap();

    let tanks = column_names(&store, "tanks").await;
    for column in ["bloco", "categoria", "local"] {
        assert!(tanks.iter().any(|c| c == column), "tanks.{column} missing");
    }
    let pumps = column_names(&store, "pumps").await;
    assert!(pumps.iter().any(|c| c == "flow"));
    assert!(!pumps.iter().any(|c| c == "pump_mode"));
    assert!(column_names(&store, "readings").await.iter().any(|c| c == "flow"));

    let state = PlantStore::new(pool).load_state().await.unwrap();
    // Existing rows survive; missing seeds are added.
    let t100 = state.tank(&TankId::new("T-100")).unwrap();
    assert!((t100.level - 77.0).abs() < f64::EPSILON);
    assert!(state.tank(&TankId::new("T-200")).is_some());
    assert!(state.pump(&PumpId::new("P-100")).unwrap().on);

    // Old reading rows read back with the default flow.
    let rows = ReadingStore::new(pool).recent(None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!((rows[0].flow - 0.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn nullable_readings_table_is_rebuilt_not_null() {
    let store = SqliteStore::connect(&SqliteConfig::in_memory()).await.unwrap();
    let pool = store.pool();

    // The first reading layout: nullable columns, database-side timestamp.
    for ddl in [
        "CREATE TABLE readings (id INTEGER PRIMARY KEY AUTOINCREMENT, tank_id TEXT, level REAL, timestamp DATETIME DEFAULT (datetime('now')))",
        "INSERT INTO readings (tank_id, level) VALUES ('T-100', 42.0)",
        "INSERT INTO readings (tank_id, level) VALUES ('T-200', NULL)",
        "INSERT INTO readings (tank_id, level) VALUES (NULL, 10.0)",
    ] {
        sqlx::query(ddl).execute(pool).await.unwrap();
    }

    store.init_schema().await.unwrap();
    store.init_schema().await.unwrap();

    let nullable: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM pragma_table_info('readings') WHERE "notnull" = 0 AND name IN ('tank_id', 'level', 'flow')"#,
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(nullable, 0);

    let rows = ReadingStore::new(pool).recent(None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tank_id, "T-100");
    assert!((rows[0].level - 42.0).abs() < f64::EPSILON);

    // New rows keep appending after the carried-over ids.
    ReadingStore::new(pool)
        .insert(&TankId::new("T-100"), 43.0, None, Utc::now())
        .await
        .unwrap();
    let rows = ReadingStore::new(pool).recent(None, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].id > rows[1].id);

    let indexes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_readings_tank_id'",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(indexes, 1);
}

// =============================================================================
// Plant store
// =============================================================================

#[tokio::test]
async fn pump_state_round_trips() {
    let store = setup_store().await;
    let plant = PlantStore::new(store.pool());

    plant
        .update_pump_state(&PumpId::new("P-200"), true, Some(-0.8))
        .await
        .unwrap();

    let state = plant.load_state().await.unwrap();
    let pump = state.pump(&PumpId::new("P-200")).unwrap();
    assert!(pump.on);
    assert_eq!(pump.flow, Some(-0.8));
}

#[tokio::test]
async fn updating_unknown_rows_reports_not_found() {
    let store = setup_store().await;
    let plant = PlantStore::new(store.pool());

    let tank = plant.update_tank_level(&TankId::new("T-999"), 1.0).await;
    assert!(matches!(tank, Err(DbError::NotFound { entity: "tank", .. })));

    let pump = plant.update_pump_state(&PumpId::new("P-999"), true, None).await;
    assert!(matches!(pump, Err(DbError::NotFound { entity: "pump", .. })));
}

// =============================================================================
// Reading store
// =============================================================================

#[tokio::test]
async fn readings_are_newest_first_and_filterable() {
    let store = setup_store().await;
    let readings = ReadingStore::new(store.pool());
    let t100 = TankId::new("T-100");
    let t200 = TankId::new("T-200");

    readings.insert(&t100, 50.0, Some(1.0), Utc::now()).await.unwrap();
    readings.insert(&t200, 60.0, None, Utc::now()).await.unwrap();
    readings.insert(&t100, 45.0, Some(-0.5), Utc::now()).await.unwrap();

    let all = readings.recent(None, 100).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[0].id > all[1].id);
    assert!((all[0].level - 45.0).abs() < f64::EPSILON);
    // Missing flow is stored as zero.
    assert!((all[1].flow - 0.0).abs() < f64::EPSILON);

    let only_t100 = readings.recent(Some(&t100), 100).await.unwrap();
    assert_eq!(only_t100.len(), 2);
    assert!(only_t100.iter().all(|r| r.tank_id == "T-100"));

    let limited = readings.recent(None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

// =============================================================================
// Writer
// =============================================================================

#[tokio::test]
async fn sqlite_sink_writes_tank_reading_and_pump() {
    let store = setup_store().await;

    store
        .save_tank_level(&TankId::new("T-100"), 33.0)
        .await
        .unwrap();
    store
        .append_reading(&TankId::new("T-100"), 33.0, Some(2.0), Utc::now())
        .await
        .unwrap();
    store
        .save_pump_state(&PumpId::new("P-100"), true, Some(2.0))
        .await
        .unwrap();

    let state = PlantStore::new(store.pool()).load_state().await.unwrap();
    assert!((state.tank(&TankId::new("T-100")).unwrap().level - 33.0).abs() < f64::EPSILON);
    assert!(state.pump(&PumpId::new("P-100")).unwrap().on);
    assert_eq!(ReadingStore::new(store.pool()).recent(None, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn coordinator_commits_flow_through_to_sqlite() {
    let store = setup_store().await;
    let initial = PlantStore::new(store.pool()).load_state().await.unwrap();

    let (writer, handle) = PersistenceWriter::spawn(store.clone());
    let mut config = CoordinatorConfig::default();
    config
        .pump_map
        .insert(TankId::new("T-100"), PumpId::new("P-100"));
    let listener: Arc<dyn CommitListener> = Arc::new(writer);
    let coordinator = StateCoordinator::new(initial, config, vec![listener]);

    coordinator
        .apply_reading(SensorReading {
            tank_id: TankId::new("T-100"),
            level: 35.0,
            flow: Some(1.2),
            pump_status: Some(PumpStatus::Ligada),
        })
        .await
        .unwrap();
    // An unknown tank must not reach the store.
    assert!(
        coordinator
            .apply_reading(SensorReading {
                tank_id: TankId::new("T-999"),
                level: 1.0,
                flow: None,
                pump_status: None,
            })
            .await
            .is_err()
    );

    // Dropping the coordinator drops the last writer handle; the task
    // then drains and exits.
    drop(coordinator);
    handle.await.unwrap();

    let state = PlantStore::new(store.pool()).load_state().await.unwrap();
    assert!((state.tank(&TankId::new("T-100")).unwrap().level - 35.0).abs() < f64::EPSILON);
    let pump = state.pump(&PumpId::new("P-100")).unwrap();
    assert!(pump.on);
    assert_eq!(pump.flow, Some(1.2));

    let rows = ReadingStore::new(store.pool()).recent(None, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tank_id, "T-100");
    assert!((rows[0].flow - 1.2).abs() < f64::EPSILON);
}
