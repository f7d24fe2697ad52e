use axum::http::StatusCode;
use serde_json::json;

use super::test_app::{
    create_event, create_task, create_test_app, register_attached_delegate, send, task_payload,
    DELEGATE, ORGANIZER, VOLUNTEER,
};

#[tokio::test]
async fn test_assign_then_unassign_round_trip() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Digging", 4).await;
    let task_id = task["_id"].as_str().unwrap();
    assert!(task["assigned_delegate"].is_null());
    register_attached_delegate(&app, DELEGATE, &event).await;

    let assign_uri = format!("/events/{}/tasks/{}/assign", event_id, task_id);
    let (status, assigned) = send(
        &app,
        "PATCH",
        &assign_uri,
        ORGANIZER,
        Some(json!({ "assigned_delegate": DELEGATE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["assigned_delegate"], DELEGATE);

    let list_uri = format!("/events/{}/tasks", event_id);
    let (_, tasks) = send(&app, "GET", &list_uri, ORGANIZER, None).await;
    assert_eq!(tasks[0]["assigned_delegate"], DELEGATE);

    // Assigning the same delegate again is a no-op success
    let (status, again) = send(
        &app,
        "PATCH",
        &assign_uri,
        ORGANIZER,
        Some(json!({ "assigned_delegate": DELEGATE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["updated_at"], assigned["updated_at"]);

    let unassign_uri = format!("/events/{}/tasks/{}/unassign", event_id, task_id);
    let (status, unassigned) = send(&app, "PATCH", &unassign_uri, ORGANIZER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(unassigned["assigned_delegate"].is_null());

    let (_, tasks) = send(&app, "GET", &list_uri, ORGANIZER, None).await;
    assert!(tasks[0]["assigned_delegate"].is_null());
}

#[tokio::test]
async fn test_reassignment_replaces_delegate() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Digging", 4).await;
    register_attached_delegate(&app, DELEGATE, &event).await;
    register_attached_delegate(&app, "second@example.com", &event).await;

    let assign_uri = format!("/events/{}/tasks/{}/assign", event_id, task["_id"].as_str().unwrap());
    for email in [DELEGATE, "second@example.com"] {
        let (status, body) = send(
            &app,
            "PATCH",
            &assign_uri,
            ORGANIZER,
            Some(json!({ "assigned_delegate": email })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assigned_delegate"], email);
    }
}

#[tokio::test]
async fn test_assign_requires_event_delegate() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Digging", 4).await;

    let assign_uri = format!("/events/{}/tasks/{}/assign", event_id, task["_id"].as_str().unwrap());
    let (status, _body) = send(
        &app,
        "PATCH",
        &assign_uri,
        ORGANIZER,
        Some(json!({ "assigned_delegate": "stranger@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_only_organizer_manages_tasks() {
    let (app, store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Digging", 4).await;

    let list_uri = format!("/events/{}/tasks", event_id);
    let (status, _body) = send(&app, "POST", &list_uri, VOLUNTEER, Some(task_payload("Mine", 2))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let unassign_uri = format!("/events/{}/tasks/{}/unassign", event_id, task["_id"].as_str().unwrap());
    let (status, _body) = send(&app, "PATCH", &unassign_uri, VOLUNTEER, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _body) = send(&app, "GET", &list_uri, VOLUNTEER, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.event_count(), 1);
}

#[tokio::test]
async fn test_task_from_other_event_is_not_found() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let other = create_event(&app, ORGANIZER, "Other").await;
    let task = create_task(&app, other["_id"].as_str().unwrap(), "Elsewhere", 4).await;

    let uri = format!(
        "/events/{}/tasks/{}/unassign",
        event["_id"].as_str().unwrap(),
        task["_id"].as_str().unwrap()
    );
    let (status, _body) = send(&app, "PATCH", &uri, ORGANIZER, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_task_validates_payload() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let uri = format!("/events/{}/tasks", event["_id"].as_str().unwrap());

    let (status, _body) = send(&app, "POST", &uri, ORGANIZER, Some(task_payload("", 3))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _body) = send(&app, "POST", &uri, ORGANIZER, Some(task_payload("Nobody", 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_task_keeps_capacity_above_count() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Digging", 4).await;

    let join_uri = format!("/tasks/join/{}", task["task_join_code"].as_str().unwrap());
    send(&app, "POST", &join_uri, VOLUNTEER, None).await;
    send(&app, "POST", &join_uri, "second@example.com", None).await;

    let uri = format!("/events/{}/tasks/{}", event_id, task["_id"].as_str().unwrap());
    let (status, _body) = send(&app, "PATCH", &uri, ORGANIZER, Some(task_payload("Digging", 1))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(&app, "PATCH", &uri, ORGANIZER, Some(task_payload("Digging deep", 2))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Digging deep");
    assert_eq!(updated["max_volunteers"], 2);
    assert_eq!(updated["volunteer_count"], 2);
    assert_eq!(updated["task_join_code"], task["task_join_code"]);
}

#[tokio::test]
async fn test_event_volunteer_can_list_tasks() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Tree planting").await;
    let event_id = event["_id"].as_str().unwrap();
    create_task(&app, event_id, "Digging", 4).await;

    let join_uri = format!("/event/join/{}", event["volunteer_join_code"].as_str().unwrap());
    send(&app, "POST", &join_uri, VOLUNTEER, None).await;

    let (status, tasks) = send(&app, "GET", &format!("/events/{}/tasks", event_id), VOLUNTEER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["volunteer_count"], 0);
}
