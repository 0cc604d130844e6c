use std::time::Duration;

use dyncontent::admin::{AdminClient, AdminError};
use dyncontent::model::{BlockType, ContentBlock, Plugin, PluginType};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> AdminClient {
    AdminClient::new(&server.uri(), Duration::from_secs(5))
        .unwrap()
        .with_token(Some("tok-1".to_string()))
}

// ── Content blocks ──────────────────────────────────────────────

#[tokio::test]
async fn list_blocks_sends_page_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/superadmin/content-blocks"))
        .and(query_param("page", "home"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "content_blocks": [
                {"id": 1, "type": "text", "page": "home", "position": "hero-title",
                 "isActive": 1, "content": "{\"text\": \"Hi\"}"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let blocks = client(&server).list_blocks(Some("home")).await.unwrap();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].is_active);
    assert_eq!(blocks[0].content_str("text"), Some("Hi"));
}

#[tokio::test]
async fn create_block_posts_json() {
    let server = MockServer::start().await;
    let block = ContentBlock::new("9", BlockType::Custom, "home", "footer")
        .with_content("html", "<p>x</p>");

    Mock::given(method("POST"))
        .and(path("/api/superadmin/content-blocks"))
        .and(body_string_contains("\"isActive\":true"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"id": 9, "type": "custom", "page": "home", "position": "footer",
                     "isActive": true, "content": {"html": "<p>x</p>"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server).create_block(&block).await.unwrap();
    assert_eq!(created.id, "9");
    assert_eq!(created.block_type, BlockType::Custom);
}

#[tokio::test]
async fn update_block_patches_encoded_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/superadmin/content-blocks/42"))
        .and(body_json(json!({"isActive": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42, "type": "image", "page": "home", "position": "hero-image",
            "isActive": false, "content": {"url": "/a.png"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let block = client(&server)
        .update_block("42", &json!({"isActive": false}))
        .await
        .unwrap();
    assert!(!block.is_active);
}

#[tokio::test]
async fn delete_block_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/superadmin/content-blocks/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete_block("7").await.unwrap();
}

#[tokio::test]
async fn errors_are_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    match client(&server).delete_block("7").await {
        Err(AdminError::Status { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "forbidden");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

// ── Plugins ─────────────────────────────────────────────────────

#[tokio::test]
async fn list_and_create_plugins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/superadmin/plugins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "chat", "type": "script", "code": "init()", "isActive": true},
            {"id": "theme", "type": "style", "code": "body{}", "isActive": false}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/superadmin/plugins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plugin": {"id": "banner", "type": "component", "code": "announcement-banner"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let admin = client(&server);
    let plugins = admin.list_plugins().await.unwrap();
    assert_eq!(plugins.len(), 2);
    assert_eq!(plugins[0].plugin_type, PluginType::Script);

    let created = admin
        .create_plugin(&Plugin::new(
            "banner",
            PluginType::Component,
            "announcement-banner",
        ))
        .await
        .unwrap();
    assert_eq!(created.code, "announcement-banner");
}

// ── Upload ──────────────────────────────────────────────────────

#[tokio::test]
async fn upload_sends_multipart_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/superadmin/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"logo.png\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"url": "https://cdn.example.com/logo.png"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("logo.png");
    std::fs::write(&file, b"not really a png").unwrap();

    let uploaded = client(&server).upload(&file).await.unwrap();
    assert_eq!(uploaded.url, "https://cdn.example.com/logo.png");
}

#[tokio::test]
async fn upload_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let result = client(&server)
        .upload(std::path::Path::new("/definitely/not/here.png"))
        .await;
    assert!(matches!(result, Err(AdminError::Io(_))));
}
