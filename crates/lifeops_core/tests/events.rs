use chrono::{TimeZone, Utc};
use lifeops_core::{
    open_db_in_memory, ActionContext, ActionResult, Coordinator, ErrorKind, FixedClock,
    SqliteStore,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn coordinator(conn: &Connection) -> Coordinator<SqliteStore<'_>> {
    let store = SqliteStore::try_new(conn).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
    Coordinator::new(ActionContext::new(store).with_clock(FixedClock(now)))
}

fn create(coordinator: &Coordinator<SqliteStore<'_>>, parameters: Value) -> String {
    let result = coordinator.dispatch("events", "create", parameters);
    assert!(result.success, "create failed: {}", result.message);
    result.id.unwrap()
}

fn fetch(coordinator: &Coordinator<SqliteStore<'_>>, id: &str) -> serde_json::Map<String, Value> {
    let result = coordinator.dispatch("events", "list", json!({"id": id}));
    let mut items = result.items.unwrap();
    assert_eq!(items.len(), 1);
    items.remove(0)
}

fn titles(result: &ActionResult) -> Vec<String> {
    result
        .items
        .as_ref()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn missing_end_defaults_to_one_hour() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let id = create(
        &coordinator,
        json!({"title": "Standup", "startTime": "2025-03-11T09:00:00Z", "location": "Room 4"}),
    );
    let event = fetch(&coordinator, &id);
    assert_eq!(event["startTime"], json!("2025-03-11T09:00:00Z"));
    assert_eq!(event["endTime"], json!("2025-03-11T10:00:00Z"));
    assert_eq!(event["isAllDay"], json!(false));
    assert_eq!(event["location"], json!("Room 4"));
    assert_eq!(event["bufferBefore"], json!(0));
}

#[test]
fn all_day_event_spans_its_whole_day() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let id = create(
        &coordinator,
        json!({"title": "Offsite", "start": "2025-03-12T15:30:00Z", "allDay": true}),
    );
    let event = fetch(&coordinator, &id);
    assert_eq!(event["startTime"], json!("2025-03-12T00:00:00Z"));
    assert_eq!(event["endTime"], json!("2025-03-13T00:00:00Z"));
    assert_eq!(event["isAllDay"], json!(true));
}

#[test]
fn missing_start_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch("events", "create", json!({"title": "Someday"}));
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("startTime"));
}

#[test]
fn end_before_start_is_rejected_on_create() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "events",
        "create",
        json!({
            "title": "Backwards",
            "startTime": "2025-03-11T10:00:00Z",
            "endTime": "2025-03-11T09:00:00Z"
        }),
    );
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("invalid time range"));
}

#[test]
fn invalid_time_range_update_leaves_event_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let id = create(
        &coordinator,
        json!({
            "title": "Dentist",
            "startTime": "2025-03-11T09:00:00Z",
            "endTime": "2025-03-11T10:00:00Z"
        }),
    );

    let result = coordinator.dispatch(
        "events",
        "update",
        json!({
            "id": id,
            "title": "Moved dentist",
            "startTime": "2025-03-11T11:00:00Z",
            "endTime": "2025-03-11T10:30:00Z"
        }),
    );
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));

    let event = fetch(&coordinator, &id);
    assert_eq!(event["title"], json!("Dentist"));
    assert_eq!(event["startTime"], json!("2025-03-11T09:00:00Z"));
    assert_eq!(event["endTime"], json!("2025-03-11T10:00:00Z"));
}

#[test]
fn negative_buffer_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "events",
        "create",
        json!({"title": "Flight", "startTime": "2025-03-11T09:00:00Z", "bufferBefore": -15}),
    );
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn recurring_event_reports_next_occurrence() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let id = create(
        &coordinator,
        json!({
            "title": "Gym",
            "startTime": "2025-03-01T07:00:00Z",
            "recurrenceRule": "FREQ=DAILY"
        }),
    );
    let event = fetch(&coordinator, &id);
    assert_eq!(event["recurrenceRule"], json!("FREQ=DAILY"));
    assert_eq!(event["nextOccurrence"], json!("2025-03-11T07:00:00Z"));

    let invalid = coordinator.dispatch(
        "events",
        "create",
        json!({"title": "Broken", "startTime": "2025-03-01T07:00:00Z", "repeat": "sometimes"}),
    );
    assert_eq!(invalid.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn list_filters_by_time_window() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    create(&coordinator, json!({"title": "Yesterday", "startTime": "2025-03-09T09:00:00Z"}));
    create(&coordinator, json!({"title": "This morning", "startTime": "2025-03-10T08:00:00Z"}));
    create(&coordinator, json!({"title": "Tonight", "startTime": "2025-03-10T19:00:00Z"}));
    create(&coordinator, json!({"title": "Next week", "startTime": "2025-03-17T09:00:00Z"}));

    let today = coordinator.dispatch("events", "list", json!({"filter": "today"}));
    assert_eq!(titles(&today), vec!["This morning", "Tonight"]);

    let upcoming = coordinator.dispatch("events", "list", json!({"filter": "upcoming"}));
    assert_eq!(titles(&upcoming), vec!["Tonight", "Next week"]);

    let past = coordinator.dispatch("events", "list", json!({"filter": "past"}));
    assert_eq!(titles(&past), vec!["Yesterday", "This morning"]);

    let ranged = coordinator.dispatch(
        "events",
        "list",
        json!({"startDate": "2025-03-09", "endDate": "2025-03-10"}),
    );
    assert_eq!(ranged.matched_count, Some(3));

    let on_day = coordinator.dispatch("events", "list", json!({"date": "2025-03-17"}));
    assert_eq!(titles(&on_day), vec!["Next week"]);

    let inverted = coordinator.dispatch(
        "events",
        "list",
        json!({"startDate": "2025-03-10", "endDate": "2025-03-09"}),
    );
    assert_eq!(inverted.error_kind, Some(ErrorKind::Validation));
}

#[test]
fn category_by_name_links_and_shows_in_view() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);
    let category = coordinator.dispatch("categories", "create", json!({"name": "Health"}));
    let category_id = category.id.unwrap();

    let id = create(
        &coordinator,
        json!({"title": "Checkup", "startTime": "2025-03-12T09:00:00Z", "category": "health"}),
    );
    let event = fetch(&coordinator, &id);
    assert_eq!(event["categoryId"], json!(category_id));
    assert_eq!(event["categoryName"], json!("Health"));

    let by_category = coordinator.dispatch("events", "list", json!({"categoryName": "Health"}));
    assert_eq!(by_category.matched_count, Some(1));

    let unknown = coordinator.dispatch("events", "list", json!({"categoryName": "Hobbies"}));
    assert!(unknown.success);
    assert_eq!(unknown.matched_count, Some(0));
}

#[test]
fn unrepresentable_epoch_start_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let coordinator = coordinator(&conn);

    let result = coordinator.dispatch(
        "events",
        "create",
        json!({"title": "Far future", "startTime": 9_223_372_036_854_775_000_i64}),
    );
    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Validation));
    assert!(result.message.contains("out of range"), "{}", result.message);

    let listed = coordinator.dispatch("events", "list", json!({}));
    assert_eq!(listed.matched_count, Some(0));
}
