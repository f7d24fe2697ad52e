use axum::http::StatusCode;
use log::info;
use serde_json::json;

use super::test_app::{
    create_event, create_task, create_test_app, event_payload, register_attached_delegate, send,
    DELEGATE, ORGANIZER, VOLUNTEER,
};

#[tokio::test]
async fn test_upsert_without_id_creates_distinct_events() {
    let (app, store) = create_test_app();

    let first = create_event(&app, ORGANIZER, "River cleanup").await;
    let second = create_event(&app, ORGANIZER, "River cleanup").await;

    assert_ne!(first["_id"], second["_id"]);
    assert_eq!(store.event_count(), 2);
    assert_eq!(first["created_by"], ORGANIZER);

    let delegate_code = first["delegate_join_code"].as_str().unwrap();
    let volunteer_code = first["volunteer_join_code"].as_str().unwrap();
    assert_eq!(delegate_code.len(), 6);
    assert_ne!(delegate_code, volunteer_code);
    assert_ne!(delegate_code, second["delegate_join_code"].as_str().unwrap());
}

#[tokio::test]
async fn test_upsert_with_id_mutates_in_place() {
    let (app, store) = create_test_app();
    let created = create_event(&app, ORGANIZER, "River cleanup").await;

    let mut payload = event_payload("River cleanup (north bank)", 5);
    payload["_id"] = created["_id"].clone();
    let (status, updated) = send(&app, "PATCH", "/event", ORGANIZER, Some(payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["_id"], created["_id"]);
    assert_eq!(updated["name"], "River cleanup (north bank)");
    assert_eq!(updated["created_at"], created["created_at"]);
    // Codes are kept when the payload does not name new ones
    assert_eq!(updated["delegate_join_code"], created["delegate_join_code"]);
    assert_eq!(store.event_count(), 1);
}

#[tokio::test]
async fn test_upsert_by_someone_else_is_forbidden() {
    let (app, _store) = create_test_app();
    let created = create_event(&app, ORGANIZER, "River cleanup").await;

    let mut payload = event_payload("Hijacked", 3);
    payload["_id"] = created["_id"].clone();
    let (status, body) = send(&app, "PATCH", "/event", VOLUNTEER, Some(payload)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_upsert_unknown_id_is_not_found() {
    let (app, _store) = create_test_app();

    let mut payload = event_payload("Ghost", 3);
    payload["_id"] = json!("no-such-event");
    let (status, _body) = send(&app, "PATCH", "/event", ORGANIZER, Some(payload)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upsert_rejects_invalid_payloads() {
    let (app, store) = create_test_app();

    let (status, body) = send(&app, "PATCH", "/event", ORGANIZER, Some(event_payload("  ", 3))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let mut backwards = event_payload("Backwards", 3);
    let start = backwards["start_date"].clone();
    backwards["start_date"] = backwards["end_date"].clone();
    backwards["end_date"] = start;
    let (status, _body) = send(&app, "PATCH", "/event", ORGANIZER, Some(backwards)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_code = event_payload("Bad code", 3);
    bad_code["volunteer_join_code"] = json!("TOO-LONG-CODE");
    let (status, _body) = send(&app, "PATCH", "/event", ORGANIZER, Some(bad_code)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(store.event_count(), 0);
}

#[tokio::test]
async fn test_requested_codes_are_normalized_and_unique() {
    let (app, _store) = create_test_app();

    let mut payload = event_payload("Custom codes", 3);
    payload["delegate_join_code"] = json!(" abc123 ");
    payload["volunteer_join_code"] = json!("vol001");
    let (status, created) = send(&app, "PATCH", "/event", ORGANIZER, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["delegate_join_code"], "ABC123");
    assert_eq!(created["volunteer_join_code"], "VOL001");

    let mut clash = event_payload("Clash", 3);
    clash["volunteer_join_code"] = json!("ABC123");
    let (status, body) = send(&app, "PATCH", "/event", ORGANIZER, Some(clash)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_rotated_code_is_revoked() {
    let (app, _store) = create_test_app();
    let created = create_event(&app, ORGANIZER, "Rotating").await;
    let old_code = created["volunteer_join_code"].as_str().unwrap().to_string();

    let mut payload = event_payload("Rotating", 3);
    payload["_id"] = created["_id"].clone();
    payload["volunteer_join_code"] = json!("NEW001");
    let (status, updated) = send(&app, "PATCH", "/event", ORGANIZER, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["volunteer_join_code"], "NEW001");

    let (status, body) = send(&app, "POST", &format!("/event/join/{}", old_code), VOLUNTEER, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "invalid_code");

    let (status, _body) = send(&app, "POST", "/event/join/NEW001", VOLUNTEER, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_organizer_detail_counts_tasks() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Food drive").await;
    let event_id = event["_id"].as_str().unwrap();

    for name in ["Sorting", "Packing", "Delivery"] {
        create_task(&app, event_id, name, 5).await;
    }
    let other = create_event(&app, ORGANIZER, "Other").await;
    create_task(&app, other["_id"].as_str().unwrap(), "Elsewhere", 5).await;

    register_attached_delegate(&app, DELEGATE, &event).await;

    let uri = format!("/events/{}?role=organizer", event_id);
    let (status, detail) = send(&app, "GET", &uri, ORGANIZER, None).await;
    info!("Organizer detail: {}", detail);

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["role"], "organizer");
    assert_eq!(detail["task_count"], 3);
    assert_eq!(detail["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(detail["delegate_count"], 1);
    assert_eq!(detail["delegates"][0]["email"], DELEGATE);
    assert_eq!(detail["volunteer_count"], 0);
}

#[tokio::test]
async fn test_organizer_detail_requires_creator() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Food drive").await;

    let uri = format!("/events/{}?role=organizer", event["_id"].as_str().unwrap());
    let (status, _body) = send(&app, "GET", &uri, VOLUNTEER, None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delegate_detail_shows_assignment_and_organizer() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Food drive").await;
    let event_id = event["_id"].as_str().unwrap();
    let task = create_task(&app, event_id, "Sorting", 5).await;
    let org_code = register_attached_delegate(&app, DELEGATE, &event).await;

    let uri = format!("/events/{}?role=delegate", event_id);
    let (status, detail) = send(&app, "GET", &uri, DELEGATE, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["role"], "delegate");
    assert_eq!(detail["delegate_org_code"], org_code.as_str());
    assert!(detail["assigned_task"].is_null());
    assert_eq!(detail["organizer"]["email"], ORGANIZER);

    let assign_uri = format!("/events/{}/tasks/{}/assign", event_id, task["_id"].as_str().unwrap());
    let (status, _body) = send(
        &app,
        "PATCH",
        &assign_uri,
        ORGANIZER,
        Some(json!({ "assigned_delegate": DELEGATE })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, detail) = send(&app, "GET", &uri, DELEGATE, None).await;
    assert_eq!(detail["assigned_task"]["_id"], task["_id"]);
}

#[tokio::test]
async fn test_delegate_detail_for_other_event_is_forbidden() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Food drive").await;
    let other = create_event(&app, ORGANIZER, "Other").await;
    register_attached_delegate(&app, DELEGATE, &event).await;

    let uri = format!("/events/{}?role=delegate", other["_id"].as_str().unwrap());
    let (status, _body) = send(&app, "GET", &uri, DELEGATE, None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_events_by_role() {
    let (app, _store) = create_test_app();
    let first = create_event(&app, ORGANIZER, "First").await;
    create_event(&app, ORGANIZER, "Second").await;

    let (status, organized) = send(&app, "GET", "/events?role=organizer", ORGANIZER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organized.as_array().unwrap().len(), 2);

    let (_, none) = send(&app, "GET", "/events?role=volunteer", VOLUNTEER, None).await;
    assert!(none.as_array().unwrap().is_empty());

    let uri = format!("/event/join/{}", first["volunteer_join_code"].as_str().unwrap());
    send(&app, "POST", &uri, VOLUNTEER, None).await;
    let (_, joined) = send(&app, "GET", "/events?role=volunteer", VOLUNTEER, None).await;
    assert_eq!(joined.as_array().unwrap().len(), 1);
    assert_eq!(joined[0]["_id"], first["_id"]);

    register_attached_delegate(&app, DELEGATE, &first).await;
    let (_, delegated) = send(&app, "GET", "/events?role=delegate", DELEGATE, None).await;
    assert_eq!(delegated[0]["_id"], first["_id"]);
}

#[tokio::test]
async fn test_unknown_event_detail_is_not_found() {
    let (app, _store) = create_test_app();

    let (status, body) = send(&app, "GET", "/events/missing?role=organizer", ORGANIZER, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let (app, _store) = create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/events?role=organizer")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_falls_back_to_not_found() {
    let (app, _store) = create_test_app();

    let (status, body) = send(&app, "GET", "/nowhere", ORGANIZER, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_organizer_announces_to_members() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Beach cleanup").await;
    let uri = format!("/events/{}/announce", event["_id"].as_str().unwrap());

    for kind in ["tip", "requirements", "attendance"] {
        let body = json!({ "kind": kind, "message": "Bring sunscreen" });
        let (status, response) = send(&app, "POST", &uri, ORGANIZER, Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED, "{}", kind);
        assert_eq!(response["message"], "Announcement sent");
    }
}

#[tokio::test]
async fn test_announce_is_organizer_only_and_needs_text() {
    let (app, _store) = create_test_app();
    let event = create_event(&app, ORGANIZER, "Beach cleanup").await;
    let uri = format!("/events/{}/announce", event["_id"].as_str().unwrap());

    let body = json!({ "kind": "tip", "message": "Bring sunscreen" });
    let (status, _response) = send(&app, "POST", &uri, VOLUNTEER, Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let blank = json!({ "kind": "tip", "message": "   " });
    let (status, response) = send(&app, "POST", &uri, ORGANIZER, Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "bad_request");

    let body = json!({ "kind": "tip", "message": "Bring sunscreen" });
    let (status, _response) = send(&app, "POST", "/events/missing/announce", ORGANIZER, Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
