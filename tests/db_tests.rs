//! Database and schema tests
//!
//! Tests SQLite migrations, the seeded demo fleet, and the equipment repository

use di::{Injectable, ServiceCollection};
use greenbox_server::config::AppConfig;
use greenbox_server::core::equipment::{EquipmentStatus, MaintenanceStatus};
use greenbox_server::infrastructure::database::DatabaseConnection;
use greenbox_server::infrastructure::repositories::DbEquipmentRepository;
use greenbox_server::infrastructure::traits::EquipmentRepository;
use serial_test::serial;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};

static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Setup test database with migrations
async fn setup_test_db() -> SqlitePool {
    let db_num = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let db_url = format!("sqlite:file:equipmentdb{db_num}?mode=memory&cache=shared");
    DatabaseConnection::open(&db_url).await.unwrap()
}

/// Repository resolved the way the server resolves it.
fn repository(pool: SqlitePool) -> di::Ref<dyn EquipmentRepository> {
    DatabaseConnection::install(pool);
    let provider = ServiceCollection::new()
        .add(AppConfig::singleton())
        .add(DatabaseConnection::transient())
        .add(DbEquipmentRepository::transient())
        .build_provider()
        .unwrap();
    provider.get_required::<dyn EquipmentRepository>()
}

#[tokio::test]
async fn test_database_migrations_work() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    let tables: Vec<&str> = tables.iter().map(|(name,)| name.as_str()).collect();

    for expected in ["equipment", "maintenance_events", "sensor_readings", "sensors"] {
        assert!(tables.contains(&expected), "missing table {expected}");
    }
}

#[tokio::test]
async fn test_seed_has_twelve_readings_per_sensor() {
    let pool = setup_test_db().await;

    let counts: Vec<(i64,)> = sqlx::query_as(
        "SELECT COUNT(*) FROM sensor_readings GROUP BY equipment_id, sensor_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(counts.len(), 9);
    assert!(counts.iter().all(|(count,)| *count == 12));
}

#[tokio::test]
async fn test_status_constraint_rejects_unknown_values() {
    let pool = setup_test_db().await;

    let result = sqlx::query(
        "INSERT INTO equipment (id, name, kind, status, position) VALUES ('x-1', 'X', 'Test', 'Melting', 9)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_equipment_delete_cascades() {
    let pool = setup_test_db().await;

    sqlx::query("DELETE FROM equipment WHERE id = 'pump-003'")
        .execute(&pool)
        .await
        .unwrap();

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sensor_readings WHERE equipment_id = 'pump-003'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
#[serial]
async fn test_repository_lists_fleet_in_order() {
    let repository = repository(setup_test_db().await);

    let fleet = repository.list_equipment().await.unwrap();
    let ids: Vec<&str> = fleet.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, ["cnc-001", "conv-002", "pump-003"]);

    let mill = &fleet[0];
    assert_eq!(mill.name, "CNC Mill 3-Axis");
    assert_eq!(mill.status, EquipmentStatus::Operational);
    let sensors: Vec<&str> = mill.sensors.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(sensors, ["Temperature", "Pressure", "Vibration"]);

    DatabaseConnection::uninstall();
}

#[tokio::test]
#[serial]
async fn test_history_is_oldest_first_and_log_newest_first() {
    let repository = repository(setup_test_db().await);

    let mill = repository.find_equipment("cnc-001").await.unwrap().unwrap();
    let history = &mill.sensors[0].history;
    assert_eq!(history.len(), 12);
    assert_eq!(history.first().unwrap().time, "12h ago");
    assert_eq!(history.last().unwrap().time, "1h ago");

    let dates: Vec<&str> = mill.maintenance_log.iter().map(|e| e.date.as_str()).collect();
    assert_eq!(dates, ["2024-07-15", "2024-06-20", "2024-05-10"]);

    let pump = repository.find_equipment("pump-003").await.unwrap().unwrap();
    assert_eq!(pump.status, EquipmentStatus::Offline);
    assert_eq!(pump.maintenance_log[0].status, MaintenanceStatus::InProgress);

    DatabaseConnection::uninstall();
}

#[tokio::test]
#[serial]
async fn test_unknown_equipment_is_none() {
    let repository = repository(setup_test_db().await);

    assert!(repository.find_equipment("press-404").await.unwrap().is_none());

    DatabaseConnection::uninstall();
}
