use axum::http::StatusCode;
use domains::Role;
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn comments_are_scoped_to_visible_items() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Sales");
    let member = app.account(Role::User, &[dept]);
    let outsider = app.account(Role::User, &[]);
    let doc = app.document_for_departments(&admin.token, "Price list", &[dept]).await;

    let (status, created) = app
        .post("/api/comments", &member.token, json!({"content": "Updated for Q3?", "itemType": "document", "itemId": doc}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].is_i64());

    let (status, comments) = app
        .get(&format!("/api/comments?itemType=document&itemId={doc}"), &member.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments[0]["content"], "Updated for Q3?");
    assert_eq!(comments[0]["email"], member.email);

    let (status, _) = app
        .get(&format!("/api/comments?itemType=document&itemId={doc}"), &outsider.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/comments", &outsider.token, json!({"content": "Let me in", "itemType": "document", "itemId": doc}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn comments_need_an_existing_parent_and_content() {
    let app = TestApp::new();
    let user = app.account(Role::User, &[]);

    let (status, _) = app
        .post("/api/comments", &user.token, json!({"content": "Hello", "itemType": "note", "itemId": 777}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/comments", &user.token, json!({"content": "Hello", "itemType": "poster", "itemId": 1}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, note) = app
        .post("/api/notes", &user.token, json!({"title": "Mine", "content": "Text", "userIds": [user.id]}))
        .await;
    let id = note["id"].as_i64().unwrap();
    let (status, _) = app
        .post("/api/comments", &user.token, json!({"content": "   ", "itemType": "note", "itemId": id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_an_item_drops_its_comments() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Ops");
    let doc = app.document_for_departments(&admin.token, "Runbook", &[dept]).await;

    app.post("/api/comments", &admin.token, json!({"content": "ok", "itemType": "document", "itemId": doc}))
        .await;
    app.delete(&format!("/api/admin/documents/{doc}"), &admin.token).await;

    let (status, _) = app
        .get(&format!("/api/comments?itemType=document&itemId={doc}"), &admin.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_can_be_listed_and_marked_read() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Warehouse");
    let worker = app.account(Role::User, &[dept]);
    let other = app.account(Role::User, &[dept]);
    app.document_for_departments(&admin.token, "Forklift guide", &[dept]).await;

    let (status, inbox) = app.get("/api/notifications", &worker.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["is_read"], false);
    let id = inbox[0]["id"].as_i64().unwrap();

    let (status, _) = app.post(&format!("/api/notifications/{id}/read"), &other.token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.post(&format!("/api/notifications/{id}/read"), &worker.token, json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, inbox) = app.get("/api/notifications", &worker.token).await;
    assert_eq!(inbox[0]["is_read"], true);
}
