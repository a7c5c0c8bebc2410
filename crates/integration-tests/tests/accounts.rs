//! Registration, login, profiles and admin requests.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};

use grace_codex_core::AdminRequest;
use grace_codex_integration_tests::{TestApp, body_text, location, session_cookie};

const BOUNDARY: &str = "codex-test-boundary";

fn picture_upload(cookie: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; \
         filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/profile/upload_picture")
        .header(header::COOKIE, cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Registration and login
// =============================================================================

#[tokio::test]
async fn test_register_logs_in_and_opens_profile() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/register",
            "username=tarnished&password=erdtree-shadow&password_confirm=erdtree-shadow",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile");
    let cookie = session_cookie(&response).unwrap();

    let profile = app.get("/profile", Some(&cookie)).await;
    assert_eq!(profile.status(), StatusCode::OK);
    assert!(body_text(profile).await.contains("tarnished"));
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new();
    app.register("tarnished").await;

    let cases = [
        ("username=ab&password=erdtree-shadow&password_confirm=erdtree-shadow", "username"),
        ("username=melina&password=short&password_confirm=short", "password"),
        ("username=melina&password=erdtree-shadow&password_confirm=other-shadow", "mismatch"),
        ("username=tarnished&password=erdtree-shadow&password_confirm=erdtree-shadow", "taken"),
    ];
    for (form, code) in cases {
        let response = app.post_form("/register", form, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{form}");
        assert_eq!(location(&response), format!("/register?error={code}"));
    }
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = TestApp::new();
    app.register("tarnished").await;

    let response = app
        .post_form("/login", "username=tarnished&password=wrong-password", None)
        .await;
    assert_eq!(location(&response), "/login?error=credentials");

    let cookie = app.login("tarnished").await;
    assert_eq!(app.get("/profile", Some(&cookie)).await.status(), StatusCode::OK);

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/");

    let response = app.get("/profile", Some(&cookie)).await;
    assert_eq!(location(&response), "/login");
}

// =============================================================================
// Profile
// =============================================================================

#[tokio::test]
async fn test_profile_update() {
    let app = TestApp::new();
    let cookie = app.register("tarnished").await;

    let response = app
        .post_form(
            "/profile/update",
            "display_name=Tarnished+of+No+Renown&bio=Guided+by+grace",
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), "/profile?success=updated");

    let user = app.user("tarnished").await;
    assert_eq!(user.display_name.as_deref(), Some("Tarnished of No Renown"));
    assert_eq!(user.bio.as_deref(), Some("Guided by grace"));

    let long_name = "x".repeat(65);
    let response = app
        .post_form(
            "/profile/update",
            &format!("display_name={long_name}&bio="),
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), "/profile?error=display_name");
    assert_eq!(
        app.user("tarnished").await.display_name.as_deref(),
        Some("Tarnished of No Renown")
    );
}

#[tokio::test]
async fn test_picture_upload_replace_and_remove() {
    let app = TestApp::new();
    let cookie = app.register("tarnished").await;

    let response = app.send(picture_upload(&cookie, "me.png", b"first")).await;
    assert_eq!(location(&response), "/profile?success=picture");
    let first = app.user("tarnished").await.picture.unwrap();
    assert!(app.upload_dir().join(&first).exists());

    let served = app.get(&format!("/uploads/{first}"), None).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(body_text(served).await, "first");

    app.send(picture_upload(&cookie, "me.webp", b"second")).await;
    let second = app.user("tarnished").await.picture.unwrap();
    assert_ne!(first, second);
    assert!(!app.upload_dir().join(&first).exists());
    assert!(app.upload_dir().join(&second).exists());

    let response = app
        .request(Method::POST, "/profile/remove_picture", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/profile?success=picture_removed");
    assert!(app.user("tarnished").await.picture.is_none());
    assert!(!app.upload_dir().join(&second).exists());
}

#[tokio::test]
async fn test_picture_upload_rejects_unsupported_type() {
    let app = TestApp::new();
    let cookie = app.register("tarnished").await;

    let response = app
        .send(picture_upload(&cookie, "payload.html", b"<script></script>"))
        .await;
    assert_eq!(location(&response), "/profile?error=picture_type");
    assert!(app.user("tarnished").await.picture.is_none());
}

#[tokio::test]
async fn test_picture_upload_over_the_limit() {
    let app = TestApp::new();
    let cookie = app.register("tarnished").await;

    // Well past the 64 KiB limit and its multipart allowance.
    let big = vec![0_u8; 200 * 1024];
    let response = app.send(picture_upload(&cookie, "big.png", &big)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile?error=picture_size");
    assert!(app.user("tarnished").await.picture.is_none());

    // Just over the limit, inside the allowance.
    let slightly = vec![0_u8; 64 * 1024 + 1];
    let response = app.send(picture_upload(&cookie, "big.png", &slightly)).await;
    assert_eq!(location(&response), "/profile?error=picture_size");
    assert!(app.user("tarnished").await.picture.is_none());
}

#[tokio::test]
async fn test_delete_account_removes_user_and_session() {
    let app = TestApp::new();
    let cookie = app.register("tarnished").await;
    app.send(picture_upload(&cookie, "me.png", b"picture")).await;
    let picture = app.user("tarnished").await.picture.unwrap();

    let response = app
        .request(Method::POST, "/profile/delete", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/");

    assert!(!app.upload_dir().join(&picture).exists());
    assert_eq!(location(&app.get("/profile", Some(&cookie)).await), "/login");

    let login = app
        .post_form("/login", "username=tarnished&password=erdtree-shadow", None)
        .await;
    assert_eq!(location(&login), "/login?error=credentials");
}

// =============================================================================
// Admin requests
// =============================================================================

#[tokio::test]
async fn test_admin_request_approval() {
    let app = TestApp::new();
    let admin = app.admin("ranni").await;
    let cookie = app.register("blaidd").await;

    let response = app
        .request(Method::POST, "/profile/request-admin", Some(&cookie))
        .await;
    assert_eq!(location(&response), "/profile?success=admin_requested");
    let user = app.user("blaidd").await;
    assert_eq!(user.admin_request, AdminRequest::Pending);

    let queue = body_text(app.get("/editor/requests", Some(&admin)).await).await;
    assert!(queue.contains("blaidd"));

    let response = app
        .request(
            Method::POST,
            &format!("/editor/requests/{}/approve", user.id),
            Some(&admin),
        )
        .await;
    assert_eq!(location(&response), "/editor/requests");

    let user = app.user("blaidd").await;
    assert!(user.is_admin);
    assert_eq!(user.admin_request, AdminRequest::None);
    assert_eq!(app.get("/editor", Some(&cookie)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_request_denial() {
    let app = TestApp::new();
    let admin = app.admin("ranni").await;
    let cookie = app.register("blaidd").await;
    app.request(Method::POST, "/profile/request-admin", Some(&cookie))
        .await;
    let user = app.user("blaidd").await;

    app.request(
        Method::POST,
        &format!("/editor/requests/{}/deny", user.id),
        Some(&admin),
    )
    .await;

    let user = app.user("blaidd").await;
    assert!(!user.is_admin);
    assert_eq!(user.admin_request, AdminRequest::Denied);

    let queue = body_text(app.get("/editor/requests", Some(&admin)).await).await;
    assert!(!queue.contains("blaidd"));
}

#[tokio::test]
async fn test_deny_without_pending_request_changes_nothing() {
    let app = TestApp::new();
    let admin = app.admin("ranni").await;
    app.register("blaidd").await;
    let bystander = app.user("blaidd").await;
    let other_admin = {
        app.admin("iji").await;
        app.user("iji").await
    };

    for user in [&bystander, &other_admin] {
        let response = app
            .request(
                Method::POST,
                &format!("/editor/requests/{}/deny", user.id),
                Some(&admin),
            )
            .await;
        assert_eq!(location(&response), "/editor/requests");
    }

    let bystander = app.user("blaidd").await;
    assert_eq!(bystander.admin_request, AdminRequest::None);
    let other_admin = app.user("iji").await;
    assert!(other_admin.is_admin);
    assert_eq!(other_admin.admin_request, AdminRequest::None);

    let response = app
        .request(Method::POST, "/editor/requests/999/deny", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approving_unknown_user_is_not_found() {
    let app = TestApp::new();
    let admin = app.admin("ranni").await;

    let response = app
        .request(Method::POST, "/editor/requests/999/approve", Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
