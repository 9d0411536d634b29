use axum::http::StatusCode;
use domains::Role;
use integration_tests::TestApp;
use serde_json::json;

#[tokio::test]
async fn members_of_any_granted_department_see_the_document() {
    let app = TestApp::new();
    let admin = app.admin();
    let hr = app.department("Human Resources");
    let sales = app.department("Sales");
    let it = app.department("IT");
    let both = app.account(Role::User, &[hr, sales]);
    let outsider = app.account(Role::User, &[it]);

    let doc = app.document_for_departments(&admin.token, "Org chart", &[sales]).await;

    let (status, list) = app.get("/api/documents", &both.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], doc);
    assert_eq!(list[0]["is_read"], false);

    let (_, list) = app.get("/api/documents", &outsider.token).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = app.get(&format!("/api/documents/{doc}"), &outsider.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/documents/{doc}"), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_documents_are_not_found_before_forbidden() {
    let app = TestApp::new();
    let user = app.account(Role::User, &[]);

    let (status, _) = app.get("/api/documents/4242", &user.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/api/documents/4242/read", &user.token, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_can_share_uploads_with_colleagues() {
    let app = TestApp::new();
    let author = app.account(Role::User, &[]);
    let colleague = app.account(Role::User, &[]);
    let bystander = app.account(Role::User, &[]);

    let ids = format!("[{}, {}]", author.id, colleague.id);
    let (status, body) = app
        .upload(
            "/api/documents",
            &author.token,
            &[("title", "Minutes"), ("description", "Weekly sync"), ("visibilityType", "users"), ("visibilityIds", ids.as_str())],
            Some(("minutes.pdf", &b"%PDF-1.7 minutes"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["file_name"], "minutes.pdf");
    assert_eq!(body["file_size"], 16);
    assert_eq!(app.files.len(), 1);

    let (_, visible) = app.get("/api/documents", &colleague.token).await;
    assert_eq!(visible.as_array().unwrap().len(), 1);
    let (_, hidden) = app.get("/api/documents", &bystander.token).await;
    assert!(hidden.as_array().unwrap().is_empty());

    let inbox = app.store.notifications_of(colleague.id);
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].title, "New document available");
    assert!(inbox[0].message.contains("\"Minutes\""));
    assert!(app.store.notifications_of(author.id).is_empty());
    assert!(app.store.notifications_of(bystander.id).is_empty());
}

#[tokio::test]
async fn uploads_are_validated() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Legal");
    let ids = format!("[{dept}]");

    let (status, _) = app
        .upload("/api/admin/documents", &admin.token, &[("title", "No file"), ("departmentIds", ids.as_str())], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .upload("/api/admin/documents", &admin.token, &[("title", "Nobody")], Some(("a.pdf", &b"%PDF"[..])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .upload(
            "/api/admin/documents",
            &admin.token,
            &[("title", "Nobody"), ("departmentIds", "[]"), ("userIds", "[]")],
            Some(("a.pdf", &b"%PDF"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .upload(
            "/api/admin/documents",
            &admin.token,
            &[("title", "  "), ("departmentIds", ids.as_str())],
            Some(("a.pdf", &b"%PDF"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.files.is_empty());
}

#[tokio::test]
async fn failed_inserts_remove_the_stored_file() {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, _) = app
        .upload(
            "/api/admin/documents",
            &admin.token,
            &[("title", "Ghost grants"), ("visibilityType", "departments"), ("visibilityIds", "[9999]")],
            Some(("a.pdf", &b"%PDF"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.files.is_empty());
}

#[tokio::test]
async fn every_read_is_counted() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Operations");
    let reader = app.account(Role::User, &[dept]);
    let doc = app.document_for_departments(&admin.token, "Safety rules", &[dept]).await;

    for _ in 0..2 {
        let (status, _) = app.post(&format!("/api/documents/{doc}/read"), &reader.token, json!({})).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    for _ in 0..2 {
        let (status, body) = app.post(&format!("/api/documents/{doc}/download"), &reader.token, json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].as_str().unwrap().starts_with("/uploads/documents/"));
    }

    let (_, stats) = app.get("/api/admin/documents", &admin.token).await;
    assert_eq!(stats[0]["read_count"], 2);
    assert_eq!(stats[0]["download_count"], 2);

    let (_, activity) = app.get(&format!("/api/admin/documents/{doc}/activity"), &admin.token).await;
    assert_eq!(activity["reads"].as_array().unwrap().len(), 2);
    assert_eq!(activity["downloads"].as_array().unwrap().len(), 1);
    assert_eq!(activity["reads"][0]["departments"], json!(["Operations"]));

    let (_, mine) = app.get(&format!("/api/documents/{doc}"), &reader.token).await;
    assert_eq!(mine["is_read"], true);
    assert_eq!(mine["is_downloaded"], true);
}

#[tokio::test]
async fn file_route_counts_a_download() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Design");
    let member = app.account(Role::User, &[dept]);
    let outsider = app.account(Role::User, &[]);
    let doc = app.document_for_departments(&admin.token, "Logo", &[dept]).await;

    let (status, _) = app.get(&format!("/api/documents/{doc}/file"), &member.token).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    let (status, _) = app.get(&format!("/api/documents/{doc}/file"), &outsider.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, stats) = app.get("/api/admin/documents", &admin.token).await;
    assert_eq!(stats[0]["download_count"], 1);

    let (_, activity) = app.get(&format!("/api/admin/documents/{doc}/activity"), &admin.token).await;
    assert_eq!(activity["downloads"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn uploads_may_mix_department_and_user_grants() {
    let app = TestApp::new();
    let author = app.account(Role::User, &[]);
    let dept = app.department("Finance");
    let member = app.account(Role::User, &[dept]);
    let guest = app.account(Role::User, &[]);
    let outsider = app.account(Role::User, &[]);

    let departments = format!("[{dept}]");
    let users = format!("[{}, {}]", author.id, guest.id);
    let (status, body) = app
        .upload(
            "/api/documents",
            &author.token,
            &[("title", "Budget"), ("departmentIds", departments.as_str()), ("userIds", users.as_str())],
            Some(("budget.pdf", &b"%PDF-1.4 budget"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let doc = body["id"].as_i64().unwrap();

    for viewer in [&member, &guest] {
        let (_, list) = app.get("/api/documents", &viewer.token).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }
    let (_, list) = app.get("/api/documents", &outsider.token).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, grants) = app.get(&format!("/api/documents/{doc}/visibility"), &guest.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grants, json!({"departmentIds": [dept], "userIds": [author.id, guest.id]}));

    let (status, _) = app.get(&format!("/api/documents/{doc}/visibility"), &outsider.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get("/api/documents/4242/visibility", &outsider.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn visibility_replacement_round_trips() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Marketing");
    let member = app.account(Role::User, &[dept]);
    let guest = app.account(Role::User, &[]);
    let doc = app.document_for_departments(&admin.token, "Campaign", &[dept]).await;

    let (_, assigned) = app.get(&format!("/api/admin/documents/{doc}/assignments"), &admin.token).await;
    assert_eq!(assigned, json!({"type": "departments", "departments": [dept], "users": []}));

    let (status, _) = app
        .put(
            &format!("/api/admin/documents/{doc}/visibility"),
            &admin.token,
            json!({"visibilityType": "users", "visibilityIds": [guest.id]}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, assigned) = app.get(&format!("/api/admin/documents/{doc}/assignments"), &admin.token).await;
    assert_eq!(assigned, json!({"type": "users", "departments": [], "users": [guest.id]}));

    let (status, _) = app.get(&format!("/api/documents/{doc}"), &member.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.get(&format!("/api/documents/{doc}"), &guest.token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post("/api/admin/documents/assign", &admin.token, json!({"documentId": doc, "departmentIds": [dept]}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, assigned) = app.get(&format!("/api/admin/documents/{doc}/assignments"), &admin.token).await;
    assert_eq!(assigned["type"], "departments");

    let (status, _) = app
        .put(&format!("/api/admin/documents/{doc}/visibility"), &admin.token, json!({"departmentIds": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admins_edit_and_delete_documents() {
    let app = TestApp::new();
    let admin = app.admin();
    let dept = app.department("Quality");
    let doc = app.document_for_departments(&admin.token, "Draft", &[dept]).await;

    let (status, _) = app
        .put(&format!("/api/admin/documents/{doc}"), &admin.token, json!({"title": "Final", "description": "v2"}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, view) = app.get(&format!("/api/documents/{doc}"), &admin.token).await;
    assert_eq!(view["title"], "Final");
    assert_eq!(view["description"], "v2");

    let path = view["file_path"].as_str().unwrap().to_string();
    assert!(app.files.contains(&path));

    let (status, _) = app.delete(&format!("/api/admin/documents/{doc}"), &admin.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!app.files.contains(&path));

    let (status, _) = app.get(&format!("/api/documents/{doc}"), &admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn adding_a_department_to_the_grants_reveals_the_document() {
    let app = TestApp::new();
    let admin = app.admin();
    let d3 = app.department("Department 3");
    let d7 = app.department("Department 7");
    let user = app.account(Role::User, &[d3]);
    let doc = app.document_for_departments(&admin.token, "Seven only", &[d7]).await;

    let (status, _) = app.get(&format!("/api/documents/{doc}"), &user.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, list) = app.get("/api/documents", &user.token).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = app
        .put(
            &format!("/api/admin/documents/{doc}/visibility"),
            &admin.token,
            json!({"visibilityType": "departments", "visibilityIds": [d7, d3]}),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app.get("/api/documents", &user.token).await;
    assert_eq!(list[0]["id"], doc);
}

#[tokio::test]
async fn created_grants_come_back_from_assignments() {
    let app = TestApp::new();
    let admin = app.admin();
    let d1 = app.department("North");
    let d2 = app.department("South");
    let doc = app.document_for_departments(&admin.token, "Regional plan", &[d2, d1]).await;

    let (status, assigned) = app.get(&format!("/api/admin/documents/{doc}/assignments"), &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned, json!({"type": "departments", "departments": [d1, d2], "users": []}));
}
