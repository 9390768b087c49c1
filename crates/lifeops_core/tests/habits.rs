use chrono::{TimeZone, Utc};
use lifeops_core::{
    open_db_in_memory, ActionContext, Coordinator, ErrorKind, FixedClock, SqliteStore,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn coordinator(conn: &Connection) -> Coordinator<SqliteStore<'_>> {
    let store = SqliteStore::try_new(conn).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    Coordinator::new(ActionContext::new(store).with_clock(FixedClock(now)))
}

fn create(coordinator: &Coordinator<SqliteStore<'_>>, parameters: Value) -> String {
    let result = coordinator.dispatch("habits", "create", parameters);
    assert!(result.success, "create failed: {}", result.message);
    result.id.unwrap()
}

fn fetch(coordinator: &Coordinator<SqliteStore<'_>>, id: &str) -> serde_json::Map<String, Value> {
    let result = coordinator.dispatch("habits", "list", json!({"id": id}));
    let mut items = result.items.unwrap();
    assert_eq!(items.len(), 1);
    items.remove(0)
}

#[test]
fn create_applies_defaults() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("habits", "create", json!({"name": "Meditate"}));
    assert_eq!(result.message, "Created habit 'Meditate'.");

    let habit = fetch(&coordinator, result.id.as_deref().unwrap());
    assert_eq!(habit["frequency"], json!("daily"));
    assert_eq!(habit["trackingType"], json!("binary"));
    assert_eq!(habit["currentStreak"], json!(0));
    assert_eq!(habit["totalLogs"], json!(0));
}

#[test]
fn logging_consecutive_days_builds_a_streak() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"name": "Meditate"}));

    for date in ["2025-03-08", "2025-03-09"] {
        let logged = coordinator.dispatch("habits", "log", json!({"habitId": id, "date": date}));
        assert!(logged.success, "{}", logged.message);
    }

    let result = coordinator.dispatch("habits", "log", json!({"habit": "meditate"}));
    assert!(result.success, "{}", result.message);
    assert_eq!(
        result.message,
        "Logged 1 for 'Meditate' on 2025-03-10. Current streak: 3 days."
    );
    assert_eq!(result.updated_count, Some(1));

    let habit = fetch(&coordinator, &id);
    assert_eq!(habit["currentStreak"], json!(3));
    assert_eq!(habit["longestStreak"], json!(3));
    assert_eq!(habit["completedCurrentPeriod"], json!(true));
    assert_eq!(habit["totalLogs"], json!(3));
}

#[test]
fn quantity_habit_completes_once_target_is_reached() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(
        &coordinator,
        json!({
            "name": "Drink water",
            "trackingType": "quantity",
            "goalTarget": 8,
            "unit": "glasses"
        }),
    );

    coordinator.dispatch("habits", "log", json!({"habitId": id, "value": 5}));
    let partial = fetch(&coordinator, &id);
    assert_eq!(partial["currentPeriodValue"], json!(5.0));
    assert_eq!(partial["completedCurrentPeriod"], json!(false));

    let pending = coordinator.dispatch("habits", "list", json!({"filter": "incomplete"}));
    assert_eq!(pending.matched_count, Some(1));

    let result = coordinator.dispatch("habits", "log", json!({"habitId": id, "value": 3}));
    assert!(result.message.starts_with("Logged 3 glasses for 'Drink water'"));
    let done = fetch(&coordinator, &id);
    assert_eq!(done["completedCurrentPeriod"], json!(true));
    assert_eq!(done["currentStreak"], json!(1));

    let completed = coordinator.dispatch("habits", "list", json!({"filter": "completed"}));
    assert_eq!(completed.matched_count, Some(1));
}

#[test]
fn log_rejects_negative_values_and_unknown_habits() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"name": "Read"}));

    let negative = coordinator.dispatch("habits", "log", json!({"habitId": id, "value": -1}));
    assert_eq!(negative.error_kind, Some(ErrorKind::Validation));

    let unknown = coordinator.dispatch("habits", "log", json!({"habitName": "Juggle"}));
    assert_eq!(unknown.error_kind, Some(ErrorKind::NotFound));

    let malformed = coordinator.dispatch("habits", "log", json!({"habitId": "nope"}));
    assert_eq!(malformed.error_kind, Some(ErrorKind::Validation));

    let missing = coordinator.dispatch("habits", "log", json!({}));
    assert_eq!(missing.error_kind, Some(ErrorKind::Validation));

    assert_eq!(fetch(&coordinator, &id)["totalLogs"], json!(0));
}

#[test]
fn frequency_filters_and_invalid_frequency() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(&coordinator, json!({"name": "Stretch"}));
    create(&coordinator, json!({"name": "Review budget", "frequency": "weekly"}));

    let weekly = coordinator.dispatch("habits", "list", json!({"filter": "weekly"}));
    assert_eq!(weekly.matched_count, Some(1));
    assert_eq!(weekly.items.unwrap()[0]["name"], json!("Review budget"));

    let invalid = coordinator.dispatch(
        "habits",
        "create",
        json!({"name": "x", "frequency": "hourly"}),
    );
    assert_eq!(invalid.error_kind, Some(ErrorKind::Validation));
    assert!(invalid.message.contains("daily, weekly, monthly"));
}

#[test]
fn deleting_a_habit_removes_its_logs() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"name": "Journal"}));
    coordinator.dispatch("habits", "log", json!({"habitId": id}));
    coordinator.dispatch("habits", "log", json!({"habitId": id, "date": "yesterday"}));

    let result = coordinator.dispatch("habits", "delete", json!({"id": id}));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Deleted habit 'Journal'.");

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM habit_logs;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn date_filters_are_rejected_for_habits() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(&coordinator, json!({"name": "Stretch"}));

    let listed = coordinator.dispatch("habits", "list", json!({"date": "2025-03-10"}));
    assert_eq!(listed.error_kind, Some(ErrorKind::Validation));
    assert!(listed.message.contains("habits cannot be filtered by `date`"));

    let deleted = coordinator.dispatch("habits", "delete", json!({"from": "2025-03-01"}));
    assert_eq!(deleted.error_kind, Some(ErrorKind::Validation));
    assert_eq!(
        coordinator.dispatch("habits", "list", json!({})).matched_count,
        Some(1)
    );
}
