
use portfolio_contact_api::constants::NOT_FOUND_MESSAGE;
use reqwest::StatusCode;
use serde_json::Value;
use test_utils::*;

#[actix_rt::test]
async fn health_reports_running() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/api/health")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API is running");
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
    assert!(body["uptime"].is_string());
}

#[actix_rt::test]
async fn health_ignores_broken_mail_transport() {
    let app = TestApp::spawn().await;
    app.mailer.fail_owner_notifications();
    app.mailer.fail_auto_replies();

    let response = app.client.get(app.url("/api/health")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn trailing_slash_is_normalized() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/api/health/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn root_lists_endpoints() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["endpoints"]["contact"], "POST /api/contact");
}

#[actix_rt::test]
async fn unknown_routes_get_json_404() {
    let app = TestApp::spawn().await;

    for path in ["/nope", "/api/nope"] {
        let response = app.client.get(app.url(path)).send().await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], NOT_FOUND_MESSAGE);
    }
}

#[actix_rt::test]
async fn responses_carry_security_headers() {
    let app = TestApp::spawn().await;

    let response = app.client.get(app.url("/api/health")).send().await.unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[actix_rt::test]
async fn api_limiter_caps_all_api_routes() {
    let mut config = test_config();
    config.rate_limit_max_requests = 3;
    let app = TestApp::spawn_with(config).await;

    // the readiness probe in spawn already used one
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = app.client.get(app.url("/api/health")).send().await.unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
}
