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
    let result = coordinator.dispatch("goals", "create", parameters);
    assert!(result.success, "create failed: {}", result.message);
    result.id.unwrap()
}

fn fetch(coordinator: &Coordinator<SqliteStore<'_>>, id: &str) -> serde_json::Map<String, Value> {
    let result = coordinator.dispatch("goals", "list", json!({"id": id}));
    let mut items = result.items.unwrap();
    assert_eq!(items.len(), 1);
    items.remove(0)
}

#[test]
fn create_requires_positive_target() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let missing = coordinator.dispatch("goals", "create", json!({"title": "Run"}));
    assert_eq!(missing.error_kind, Some(ErrorKind::Validation));

    let zero = coordinator.dispatch("goals", "create", json!({"title": "Run", "targetValue": 0}));
    assert_eq!(zero.error_kind, Some(ErrorKind::Validation));

    let id = create(&coordinator, json!({"title": "Run", "targetValue": 100, "unit": "km"}));
    let goal = fetch(&coordinator, &id);
    assert_eq!(goal["currentValue"], json!(0.0));
    assert_eq!(goal["isCompleted"], json!(false));
    assert_eq!(goal["unit"], json!("km"));
}

#[test]
fn increment_reaching_target_completes_goal() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"title": "Read books", "targetValue": 100}));

    let first = coordinator.dispatch("goals", "progress", json!({"id": id, "value": 90}));
    assert!(first.success, "{}", first.message);
    assert_eq!(first.message, "Updated progress on 'Read books': 90/100.");

    let second = coordinator.dispatch(
        "goals",
        "progress",
        json!({"goalTitle": "read books", "increment": 10}),
    );
    assert!(second.success, "{}", second.message);
    assert_eq!(
        second.message,
        "Updated progress on 'Read books': 100/100. Goal completed!"
    );

    let goal = fetch(&coordinator, &id);
    assert_eq!(goal["currentValue"], json!(100.0));
    assert_eq!(goal["isCompleted"], json!(true));
    assert_eq!(goal["completedAt"], json!("2025-03-10T12:00:00Z"));
    assert_eq!(goal["progress"], json!(1.0));
}

#[test]
fn progress_requires_exactly_one_of_value_or_increment() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"title": "Save", "targetValue": 1000}));

    let both = coordinator.dispatch(
        "goals",
        "progress",
        json!({"id": id, "value": 5, "increment": 5}),
    );
    assert_eq!(both.error_kind, Some(ErrorKind::Validation));

    let neither = coordinator.dispatch("goals", "progress", json!({"id": id}));
    assert_eq!(neither.error_kind, Some(ErrorKind::Validation));

    let unknown = coordinator.dispatch("goals", "progress", json!({"title": "Climb", "value": 1}));
    assert_eq!(unknown.error_kind, Some(ErrorKind::NotFound));

    assert_eq!(fetch(&coordinator, &id)["currentValue"], json!(0.0));
}

#[test]
fn manual_completion_is_terminal() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"title": "Learn Spanish", "targetValue": 50}));

    let completed = coordinator.dispatch("goals", "update", json!({"id": id, "isCompleted": true}));
    assert!(completed.success, "{}", completed.message);

    let goal = fetch(&coordinator, &id);
    assert_eq!(goal["isCompleted"], json!(true));
    assert_eq!(goal["currentValue"], json!(0.0));
    assert!(goal["completedAt"].is_string());

    let reopened = coordinator.dispatch("goals", "update", json!({"id": id, "isCompleted": false}));
    assert_eq!(reopened.error_kind, Some(ErrorKind::Validation));
    assert_eq!(fetch(&coordinator, &id)["isCompleted"], json!(true));
}

#[test]
fn generic_update_cannot_set_current_value() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"title": "Pushups", "targetValue": 500}));

    let result = coordinator.dispatch("goals", "update", json!({"id": id, "currentValue": 499}));
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("progress"));
}

#[test]
fn overdue_filter_uses_target_date() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(
        &coordinator,
        json!({"title": "Late", "targetValue": 1, "targetDate": "2025-03-01"}),
    );
    create(
        &coordinator,
        json!({"title": "On track", "targetValue": 1, "targetDate": "2025-06-01"}),
    );

    let overdue = coordinator.dispatch("goals", "list", json!({"filter": "overdue"}));
    assert_eq!(overdue.matched_count, Some(1));
    let items = overdue.items.unwrap();
    assert_eq!(items[0]["title"], json!("Late"));
    assert_eq!(items[0]["isOverdue"], json!(true));
    assert_eq!(items[0]["targetDate"], json!("2025-03-01"));
}
