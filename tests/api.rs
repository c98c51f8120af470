//! End-to-end API tests against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use crm::auth::TokenSigner;
use crm::config::AdminSeed;
use crm::http::AppState;
use crm::notify::NoopNotifier;
use crm::service;
use crm::storage::SqliteStorage;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

const TEST_SECRET: &[u8] = b"api-test-secret";

fn test_app() -> Router {
    let mut storage = SqliteStorage::open_memory().unwrap();
    let seed = AdminSeed {
        username: "admin".into(),
        email: "admin@example.com".into(),
        password: "hunter2".into(),
    };
    service::auth::seed_admin(&mut storage, &seed).unwrap();

    let signer = TokenSigner::new(TEST_SECRET, 3600);
    let state = AppState::new(storage, signer, Arc::new(NoopNotifier));
    crm::http::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_healthz() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_returns_profile_and_token() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "admin@example.com", "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["email"], "admin@example.com");
    assert_eq!(body["role"], "ADMIN");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn test_login_failures_share_one_body() {
    let app = test_app();
    let (unknown_status, mut unknown) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "hunter2" })),
    )
    .await;
    let (wrong_status, mut wrong) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);

    // Identical envelopes apart from the timestamp.
    unknown.as_object_mut().unwrap().remove("timestamp");
    wrong.as_object_mut().unwrap().remove("timestamp");
    assert_eq!(unknown, wrong);
    assert_eq!(unknown["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_auth_me_probe() {
    let app = test_app();
    let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let (status, body) = send(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("valid"));
}

#[tokio::test]
async fn test_admin_routes_reject_missing_and_bad_tokens() {
    let app = test_app();
    let (status, _) = send(&app, Method::GET, "/api/v1/leads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = TokenSigner::new(b"other-secret", 3600).issue(1, "ADMIN").unwrap();
    let (status, _) = send(&app, Method::GET, "/api/v1/leads", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_role = TokenSigner::new(TEST_SECRET, 3600).issue(1, "VIEWER").unwrap();
    let (status, _) = send(&app, Method::GET, "/api/v1/leads", Some(&wrong_role), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_intake_creates_lead() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/leads/public",
        None,
        Some(json!({
            "name": "Grace Hopper",
            "email": "grace@navy.mil",
            "message": "Need a compiler built for the Mark I",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let lead_id = body["leadId"].as_i64().unwrap();

    let token = login(&app).await;
    let (status, lead) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leads/{lead_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lead["name"], "Grace Hopper");
    assert_eq!(lead["stage"], "NEW");
    assert_eq!(lead["source"], "web");
}

#[tokio::test]
async fn test_contact_form_sets_source() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/contact",
        None,
        Some(json!({
            "name": "Ada Lovelace",
            "email": "ada@analytical.engine",
            "message": "Interested in your analytical services",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let lead_id = body["leadId"].as_i64().unwrap();

    let token = login(&app).await;
    let (_, lead) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leads/{lead_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(lead["source"], "contact-form");
}

#[tokio::test]
async fn test_intake_validation_lists_fields() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/leads/public",
        None,
        Some(json!({ "name": "", "email": "nope", "message": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields = body["fields"].as_object().unwrap();
    assert!(fields.contains_key("name"));
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("message"));
}

#[tokio::test]
async fn test_lead_lifecycle() {
    let app = test_app();
    let token = login(&app).await;

    let (status, lead) = send(
        &app,
        Method::POST,
        "/api/v1/leads",
        Some(&token),
        Some(json!({
            "name": "Lifecycle Lead",
            "email": "cycle@example.com",
            "message": "A long enough intake message",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = lead["id"].as_i64().unwrap();

    // Merge-patch: only company changes.
    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/leads/{id}"),
        Some(&token),
        Some(json!({ "company": "Cycle Co" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["company"], "Cycle Co");
    assert_eq!(updated["name"], "Lifecycle Lead");

    let (status, moved) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/leads/{id}/stage?stage=QUALIFIED"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["stage"], "QUALIFIED");

    let (status, stats) = send(&app, Method::GET, "/api/v1/leads/stats", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["byStage"]["QUALIFIED"], 1);
    assert_eq!(stats["byStage"]["NEW"], 0);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/leads/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/v1/leads/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("Lead not found with id: {id}"));
}

#[tokio::test]
async fn test_lead_list_paging_and_filter() {
    let app = test_app();
    let token = login(&app).await;

    for i in 0..3 {
        send(
            &app,
            Method::POST,
            "/api/v1/leads",
            Some(&token),
            Some(json!({
                "name": format!("Lead {i}"),
                "email": format!("lead{i}@example.com"),
                "message": "A long enough intake message",
            })),
        )
        .await;
    }

    let (status, page) = send(
        &app,
        Method::GET,
        "/api/v1/leads?page=0&size=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["content"].as_array().unwrap().len(), 2);
    assert_eq!(page["size"], 2);

    let (_, filtered) = send(
        &app,
        Method::GET,
        "/api/v1/leads?search=lead1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(filtered["totalElements"], 1);

    let (_, staged) = send(
        &app,
        Method::GET,
        "/api/v1/leads?stage=WON",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(staged["totalElements"], 0);
}

#[tokio::test]
async fn test_client_and_contact_flow() {
    let app = test_app();
    let token = login(&app).await;

    let (status, client) = send(
        &app,
        Method::POST,
        "/api/v1/clients",
        Some(&token),
        Some(json!({ "name": "ACME Corporation!", "email": "ops@acme.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(client["slug"], "acme-corporation");
    let client_id = client["id"].as_i64().unwrap();

    let (status, jane) = send(
        &app,
        Method::POST,
        &format!("/api/v1/clients/{client_id}/contacts"),
        Some(&token),
        Some(json!({ "firstName": "Jane", "lastName": "Doe", "isPrimary": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(jane["isPrimary"], true);
    let (_, john) = send(
        &app,
        Method::POST,
        &format!("/api/v1/clients/{client_id}/contacts"),
        Some(&token),
        Some(json!({ "firstName": "John", "lastName": "Doe" })),
    )
    .await;

    let john_id = john["id"].as_i64().unwrap();
    let (status, promoted) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/clients/contacts/{john_id}/primary"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["isPrimary"], true);

    let (_, contacts) = send(
        &app,
        Method::GET,
        &format!("/api/v1/clients/{client_id}/contacts"),
        Some(&token),
        None,
    )
    .await;
    let contacts = contacts.as_array().unwrap().clone();
    assert_eq!(contacts.len(), 2);
    let primaries: Vec<_> = contacts.iter().filter(|c| c["isPrimary"] == true).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0]["id"], john["id"]);
}

#[tokio::test]
async fn test_client_project_requires_account() {
    let app = test_app();
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/projects",
        Some(&token),
        Some(json!({ "name": "Orphan build", "accountId": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Client not found with id: 999");
}

#[tokio::test]
async fn test_project_with_milestones_and_tasks() {
    let app = test_app();
    let token = login(&app).await;

    let (_, client) = send(
        &app,
        Method::POST,
        "/api/v1/clients",
        Some(&token),
        Some(json!({ "name": "Build Co", "email": "ops@build.test" })),
    )
    .await;
    let account_id = client["id"].as_i64().unwrap();

    let (status, project) = send(
        &app,
        Method::POST,
        "/api/v1/projects",
        Some(&token),
        Some(json!({
            "name": "Website rebuild",
            "accountId": account_id,
            "startDate": "2026-03-01",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["status"], "PLANNED");
    assert_eq!(project["kind"], "CLIENT");
    assert_eq!(project["startDate"], "2026-03-01");
    let project_id = project["id"].as_i64().unwrap();

    let (status, milestone) = send(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project_id}/milestones"),
        Some(&token),
        Some(json!({ "name": "Design", "orderIndex": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let milestone_id = milestone["id"].as_i64().unwrap();

    let (status, task) = send(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project_id}/tasks"),
        Some(&token),
        Some(json!({ "title": "Wireframes", "milestoneId": milestone_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "TODO");

    let task_id = task["id"].as_i64().unwrap();
    let (_, done) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/projects/tasks/{task_id}"),
        Some(&token),
        Some(json!({ "status": "DONE" })),
    )
    .await;
    assert!(done["completedAt"].as_i64().is_some());
}

#[tokio::test]
async fn test_activity_feed_for_lead() {
    let app = test_app();
    let token = login(&app).await;

    let (_, lead) = send(
        &app,
        Method::POST,
        "/api/v1/leads",
        Some(&token),
        Some(json!({
            "name": "Audited",
            "email": "audit@example.com",
            "message": "A long enough intake message",
        })),
    )
    .await;
    let id = lead["id"].as_i64().unwrap();
    send(
        &app,
        Method::PATCH,
        &format!("/api/v1/leads/{id}/stage?stage=CONTACTED"),
        Some(&token),
        None,
    )
    .await;

    let (status, feed) = send(
        &app,
        Method::GET,
        &format!("/api/v1/activities?entityType=LEAD&entityId={id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feed["totalElements"], 2);
    // Newest first: the stage change precedes the creation record.
    assert_eq!(feed["content"][0]["activityType"], "STAGE_CHANGED");
    assert_eq!(feed["content"][0]["payload"]["newStage"], "CONTACTED");
    assert_eq!(feed["content"][1]["activityType"], "CREATED");
}

#[tokio::test]
async fn test_reminder_flow() {
    let app = test_app();
    let token = login(&app).await;

    let (status, reminder) = send(
        &app,
        Method::POST,
        "/api/v1/reminders",
        Some(&token),
        Some(json!({
            "entityType": "LEAD",
            "entityId": 1,
            "title": "Follow up",
            "dueAt": 1_000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reminder["status"], "PENDING");
    let id = reminder["id"].as_i64().unwrap();

    let (_, due) = send(&app, Method::GET, "/api/v1/reminders/due", Some(&token), None).await;
    assert_eq!(due.as_array().unwrap().len(), 1);

    let (status, completed) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/reminders/{id}/complete"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "DONE");

    let (_, due) = send(&app, Method::GET, "/api/v1/reminders/due", Some(&token), None).await;
    assert!(due.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/v1/reminders/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_dashboard_kpis_empty() {
    let app = test_app();
    let token = login(&app).await;

    let (status, kpis) = send(&app, Method::GET, "/api/v1/dashboard/kpis", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["totalLeads"], 0);
    assert_eq!(kpis["conversionRate"], 0.0);
    assert_eq!(kpis["lossRate"], 0.0);
    assert_eq!(kpis["leadsByStage"].as_object().unwrap().len(), 7);
    assert_eq!(kpis["projectsByStatus"].as_object().unwrap().len(), 8);
    assert_eq!(kpis["activeProjects"], 0);
}
