use chrono::{TimeZone, Utc};
use lifeops_core::{
    open_db_in_memory, ActionContext, Coordinator, ErrorKind, FixedClock, SqliteStore,
};
use rusqlite::Connection;
use serde_json::json;

fn coordinator(conn: &Connection) -> Coordinator<SqliteStore<'_>> {
    let store = SqliteStore::try_new(conn).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    Coordinator::new(ActionContext::new(store).with_clock(FixedClock(now)))
}

#[test]
fn bulk_create_reports_partial_failure() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "categories",
        "create",
        json!({"categories": [{"name": "Work"}, {"name": ""}]}),
    );
    assert!(result.success);
    assert_eq!(result.matched_count, Some(2));
    assert_eq!(result.updated_count, Some(1));
    assert!(
        result
            .message
            .starts_with("Created 1 of 2 categories. 1 failed: item 2: invalid request:"),
        "{}",
        result.message
    );
    let items = result.items.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], json!("Work"));

    let listed = coordinator.dispatch("categories", "list", json!({}));
    assert_eq!(listed.matched_count, Some(1));
}

#[test]
fn bulk_create_where_every_item_fails_is_a_failure() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("categories", "create", json!({"items": [{"name": " "}]}));
    assert!(!result.success);
    assert_eq!(result.updated_count, Some(0));
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn color_is_normalized_and_validated() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let created = coordinator.dispatch(
        "categories",
        "create",
        json!({"name": "Fitness", "color": "ff9500"}),
    );
    assert!(created.success, "{}", created.message);
    let listed = coordinator.dispatch("categories", "list", json!({"id": created.id.unwrap()}));
    assert_eq!(listed.items.unwrap()[0]["color"], json!("#FF9500"));

    let invalid = coordinator.dispatch(
        "categories",
        "create",
        json!({"name": "Bad", "color": "#12"}),
    );
    assert_eq!(invalid.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn new_categories_are_appended_in_sort_order() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    for name in ["Home", "Work", "Errands"] {
        coordinator.dispatch("categories", "create", json!({"name": name}));
    }

    let listed = coordinator.dispatch("categories", "list", json!({}));
    let items = listed.items.unwrap();
    let indexes: Vec<_> = items.iter().map(|item| item["sortIndex"].clone()).collect();
    assert_eq!(indexes, vec![json!(0), json!(1), json!(2)]);
    assert_eq!(items[2]["name"], json!("Errands"));
}

#[test]
fn deleting_a_category_unlinks_referencing_records() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let category_id = coordinator
        .dispatch("categories", "create", json!({"name": "Errands"}))
        .id
        .unwrap();
    let task_id = coordinator
        .dispatch("tasks", "create", json!({"title": "Buy stamps", "categoryId": category_id}))
        .id
        .unwrap();

    let deleted = coordinator.dispatch("categories", "delete", json!({"id": category_id}));
    assert!(deleted.success, "{}", deleted.message);

    let task = coordinator.dispatch("tasks", "list", json!({"id": task_id}));
    assert_eq!(task.matched_count, Some(1));
    assert_eq!(task.items.unwrap()[0]["categoryId"], json!(null));
}

#[test]
fn name_references_pick_most_recent_duplicate() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    coordinator.dispatch("categories", "create", json!({"name": "Work"}));
    let newer = coordinator
        .dispatch("categories", "create", json!({"name": "work"}))
        .id
        .unwrap();

    let task = coordinator.dispatch(
        "tasks",
        "create",
        json!({"title": "Report", "categoryName": "WORK"}),
    );
    let listed = coordinator.dispatch("tasks", "list", json!({"id": task.id.unwrap()}));
    assert_eq!(listed.items.unwrap()[0]["categoryId"], json!(newer));
}

#[test]
fn rename_rejects_blank_names() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = coordinator
        .dispatch("categories", "create", json!({"name": "Personal"}))
        .id
        .unwrap();

    let blank = coordinator.dispatch("categories", "update", json!({"id": id, "name": ""}));
    assert_eq!(blank.error_kind, Some(ErrorKind::Validation));

    let renamed = coordinator.dispatch("categories", "update", json!({"id": id, "name": "Family"}));
    assert_eq!(renamed.message, "Updated category 'Family'.");
}

#[test]
fn delete_rejects_filters_categories_cannot_apply() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    for name in ["Home", "Work", "Errands"] {
        coordinator.dispatch("categories", "create", json!({"name": name}));
    }

    let by_date = coordinator.dispatch("categories", "delete", json!({"date": "2020-01-01"}));
    assert!(!by_date.success);
    assert_eq!(by_date.error_kind, Some(ErrorKind::Validation));
    assert!(
        by_date.message.contains("cannot be filtered by `date`"),
        "{}",
        by_date.message
    );
    assert!(by_date.message.contains("supported filter keys: id, ids, limit"));

    let by_status = coordinator.dispatch("categories", "delete", json!({"completed": true}));
    assert_eq!(by_status.error_kind, Some(ErrorKind::Validation));

    let listed = coordinator.dispatch("categories", "list", json!({}));
    assert_eq!(listed.matched_count, Some(3));
}

#[test]
fn own_identifier_aliases_are_not_treated_as_foreign_filters() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = coordinator
        .dispatch("categories", "create", json!({"name": "Garden"}))
        .id
        .unwrap();

    let listed = coordinator.dispatch("categories", "list", json!({"categoryId": id}));
    assert!(listed.success, "{}", listed.message);
    assert_eq!(listed.matched_count, Some(1));
}

#[test]
fn bulk_create_names_failed_items_by_name() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "categories",
        "create",
        json!({"categories": [{"name": "Work"}, {"name": "Gym", "color": "#12"}]}),
    );
    assert!(result.success);
    assert!(
        result
            .message
            .starts_with("Created 1 of 2 categories. 1 failed: 'Gym': invalid request:"),
        "{}",
        result.message
    );
}

#[test]
fn newest_duplicate_wins_even_when_sorted_first() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    coordinator.dispatch("categories", "create", json!({"name": "Work", "sortIndex": 5}));
    let newer = coordinator
        .dispatch("categories", "create", json!({"name": "work", "sortIndex": 0}))
        .id
        .unwrap();

    let task = coordinator.dispatch(
        "tasks",
        "create",
        json!({"title": "Plan sprint", "categoryName": "Work"}),
    );
    let listed = coordinator.dispatch("tasks", "list", json!({"id": task.id.unwrap()}));
    assert_eq!(listed.items.unwrap()[0]["categoryId"], json!(newer));
}
