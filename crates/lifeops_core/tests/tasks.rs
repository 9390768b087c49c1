use chrono::{TimeZone, Utc};
use lifeops_core::{
    open_db_in_memory, ActionContext, ActionResult, Coordinator, ErrorKind, FixedClock,
    SqliteStore,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

fn coordinator(conn: &Connection) -> Coordinator<SqliteStore<'_>> {
    let store = SqliteStore::try_new(conn).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    Coordinator::new(ActionContext::new(store).with_clock(FixedClock(now)))
}

fn create(coordinator: &Coordinator<SqliteStore<'_>>, parameters: Value) -> String {
    let result = coordinator.dispatch("tasks", "create", parameters);
    assert!(result.success, "create failed: {}", result.message);
    result.id.unwrap()
}

fn item(result: &ActionResult) -> &serde_json::Map<String, Value> {
    let items = result.items.as_ref().unwrap();
    assert_eq!(items.len(), 1, "expected one item: {}", result.message);
    &items[0]
}

fn fetch(coordinator: &Coordinator<SqliteStore<'_>>, id: &str) -> ActionResult {
    coordinator.dispatch("tasks", "list", json!({"id": id}))
}

#[test]
fn create_with_title_only_applies_defaults() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("tasks", "create", json!({"title": "Buy milk"}));
    assert!(result.success);
    assert_eq!(result.message, "Created task 'Buy milk'.");
    assert_eq!(result.updated_count, Some(1));
    let id = result.id.unwrap();

    let listed = fetch(&coordinator, &id);
    let task = item(&listed);
    assert_eq!(task["title"], json!("Buy milk"));
    assert_eq!(task["priority"], json!("medium"));
    assert_eq!(task["isCompleted"], json!(false));
    assert_eq!(task["dueDate"], json!(null));
    assert_eq!(task["categoryId"], json!(null));
    assert_eq!(task["tags"], json!([]));
}

#[test]
fn created_fields_round_trip_through_list() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let id = create(
        &coordinator,
        json!({
            "title": "File taxes",
            "notes": "bring receipts",
            "dueDate": "2025-04-15T17:00:00Z",
            "priority": "High",
            "tags": "finance, yearly"
        }),
    );

    let listed = fetch(&coordinator, &id);
    let task = item(&listed);
    assert_eq!(task["id"], json!(id));
    assert_eq!(task["notes"], json!("bring receipts"));
    assert_eq!(task["dueDate"], json!("2025-04-15T17:00:00Z"));
    assert_eq!(task["priority"], json!("high"));
    assert_eq!(task["tags"], json!(["finance", "yearly"]));
}

#[test]
fn partial_update_changes_only_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(
        &coordinator,
        json!({"title": "Call plumber", "notes": "kitchen sink", "priority": "high"}),
    );

    let result = coordinator.dispatch("tasks", "update", json!({"id": id, "priority": "low"}));
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Updated task 'Call plumber'.");

    let listed = fetch(&coordinator, &id);
    let task = item(&listed);
    assert_eq!(task["priority"], json!("low"));
    assert_eq!(task["title"], json!("Call plumber"));
    assert_eq!(task["notes"], json!("kitchen sink"));
}

#[test]
fn explicit_null_clears_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(
        &coordinator,
        json!({"title": "Renew passport", "notes": "photos", "due": "tomorrow"}),
    );

    let result = coordinator.dispatch(
        "tasks",
        "update",
        json!({"id": id, "notes": null, "dueDate": null}),
    );
    assert!(result.success, "{}", result.message);

    let listed = fetch(&coordinator, &id);
    let task = item(&listed);
    assert_eq!(task["notes"], json!(null));
    assert_eq!(task["dueDate"], json!(null));
}

#[test]
fn completion_stamps_and_clears_completed_at() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(&coordinator, json!({"title": "Water plants"}));

    coordinator.dispatch("tasks", "update", json!({"id": id, "completed": true}));
    let listed = fetch(&coordinator, &id);
    assert_eq!(item(&listed)["isCompleted"], json!(true));
    assert_eq!(item(&listed)["completedAt"], json!("2025-03-10T12:00:00Z"));

    coordinator.dispatch("tasks", "update", json!({"id": id, "isCompleted": false}));
    let listed = fetch(&coordinator, &id);
    assert_eq!(item(&listed)["isCompleted"], json!(false));
    assert_eq!(item(&listed)["completedAt"], json!(null));
}

#[test]
fn unknown_id_is_not_found_and_mutates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(&coordinator, json!({"title": "Existing"}));

    let missing = Uuid::new_v4().to_string();
    let updated = coordinator.dispatch("tasks", "update", json!({"id": missing, "title": "Ghost"}));
    assert!(!updated.success);
    assert_eq!(updated.error_kind, Some(ErrorKind::NotFound));

    let deleted = coordinator.dispatch("tasks", "delete", json!({"id": missing}));
    assert!(!deleted.success);
    assert_eq!(deleted.error_kind, Some(ErrorKind::NotFound));

    let listed = coordinator.dispatch("tasks", "list", json!({}));
    assert_eq!(listed.matched_count, Some(1));
    assert_eq!(item(&listed)["title"], json!("Existing"));
}

#[test]
fn malformed_id_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("tasks", "delete", json!({"id": "not-a-uuid"}));
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("malformed identifier"));
}

#[test]
fn missing_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("tasks", "create", json!({"notes": "no title"}));
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert_eq!(
        coordinator.dispatch("tasks", "list", json!({})).matched_count,
        Some(0)
    );
}

#[test]
fn bad_priority_lists_accepted_values() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "tasks",
        "create",
        json!({"title": "x", "priority": "critical"}),
    );
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("high"));
}

#[test]
fn parent_resolves_by_title_and_self_parenting_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let parent = create(&coordinator, json!({"title": "Plan trip"}));
    let child = create(&coordinator, json!({"title": "Book flights", "parent": "plan trip"}));

    let listed = fetch(&coordinator, &child);
    assert_eq!(item(&listed)["parentTaskId"], json!(parent));

    let subtasks = coordinator.dispatch("tasks", "list", json!({"parentTaskId": parent}));
    assert_eq!(subtasks.matched_count, Some(1));

    let result = coordinator.dispatch(
        "tasks",
        "update",
        json!({"id": parent, "parentTaskId": parent}),
    );
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn unknown_category_name_is_noted_and_left_unset() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "tasks",
        "create",
        json!({"title": "Buy stamps", "categoryName": "Errands"}),
    );
    assert!(result.success);
    assert_eq!(
        result.message,
        "Created task 'Buy stamps'. Note: category 'Errands' not found; left unset."
    );

    let listed = fetch(&coordinator, result.id.as_deref().unwrap());
    assert_eq!(item(&listed)["categoryId"], json!(null));
}

#[test]
fn named_filters_select_by_due_time() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(&coordinator, json!({"title": "Late", "due": "2025-03-09T08:00:00Z"}));
    create(&coordinator, json!({"title": "Later today", "due": "2025-03-10T18:00:00Z"}));
    create(&coordinator, json!({"title": "Next week", "due": "2025-03-17"}));
    create(&coordinator, json!({"title": "Whenever"}));

    let overdue = coordinator.dispatch("tasks", "list", json!({"filter": "overdue"}));
    assert_eq!(overdue.matched_count, Some(1));
    assert_eq!(item(&overdue)["title"], json!("Late"));

    let today = coordinator.dispatch("tasks", "list", json!({"filter": "today"}));
    assert_eq!(item(&today)["title"], json!("Later today"));

    let upcoming = coordinator.dispatch("tasks", "list", json!({"filter": "upcoming"}));
    assert_eq!(upcoming.matched_count, Some(2));

    let unsupported = coordinator.dispatch("tasks", "list", json!({"filter": "weekly"}));
    assert_eq!(unsupported.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn list_limit_truncates_but_reports_total() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    for title in ["a", "b", "c"] {
        create(&coordinator, json!({"title": title}));
    }

    let result = coordinator.dispatch("tasks", "list", json!({"limit": 2}));
    assert!(result.success);
    assert_eq!(result.matched_count, Some(3));
    assert_eq!(result.items.as_ref().map(Vec::len), Some(2));
    assert_eq!(result.message, "Found 3 tasks (showing 2).");

    let empty = coordinator.dispatch("tasks", "list", json!({"filter": "completed"}));
    assert!(empty.success);
    assert_eq!(empty.message, "No tasks found.");
}
