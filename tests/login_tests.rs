use dyncontent::commands::login::{login, logout};
use dyncontent::session::SessionState;
use dyncontent::Dyncontent;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn workspace(server: &MockServer) -> (tempfile::TempDir, Dyncontent) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("dyncontent.yml"),
        format!(
            "api_base_url: {}\nsession_file: session.json\n",
            server.uri()
        ),
    )
    .unwrap();
    let app = Dyncontent::new(dir.path()).unwrap();
    (dir, app)
}

// ── Expiry validation ───────────────────────────────────────────

#[tokio::test]
async fn out_of_range_expiry_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/superadmin/plugins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let (dir, app) = workspace(&server);

    let err = login(&app, "tok", Some(9_000_000_000_000)).await.unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn non_positive_expiry_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let (_dir, app) = workspace(&server);

    assert!(login(&app, "tok", Some(0)).await.is_err());
    assert!(login(&app, "tok", Some(-1)).await.is_err());
}

// ── Login flow ──────────────────────────────────────────────────

#[tokio::test]
async fn login_stores_checked_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/superadmin/plugins"))
        .and(header("authorization", "Bearer tok-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let (dir, app) = workspace(&server);

    login(&app, "tok-9", Some(12)).await.unwrap();

    let mut session = app.session();
    session.restore(chrono::Utc::now()).unwrap();
    assert_eq!(session.token(), Some("tok-9"));
    let raw = std::fs::read_to_string(dir.path().join("session.json")).unwrap();
    assert!(raw.contains("session_expires"));

    logout(&app).unwrap();
    assert!(!dir.path().join("session.json").exists());
}

#[tokio::test]
async fn rejected_token_is_not_stored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/superadmin/plugins"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;
    let (dir, app) = workspace(&server);

    assert!(login(&app, "bad", None).await.is_err());
    assert!(!dir.path().join("session.json").exists());

    let mut session = app.session();
    assert_eq!(
        session.restore(chrono::Utc::now()).unwrap(),
        &SessionState::Anonymous
    );
}
