//! HTTP surface tests: a real listener on an ephemeral port, scripted media tool

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use splitx::adapters::MockMediaTool;
use splitx::app::{AppContainer, DefaultAppContainer};
use splitx::config_initialization::config_rooted_at;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn(dir: &TempDir, tool: MockMediaTool) -> SocketAddr {
    let config = config_rooted_at(dir.path());
    std::fs::create_dir_all(config.storage.public_path()).unwrap();
    std::fs::write(config.storage.public_path().join("index.html"), "<h1>splitx</h1>").unwrap();

    let tool = Arc::new(tool);
    let container: Arc<dyn AppContainer> = Arc::new(
        DefaultAppContainer::with_ports(Arc::new(config), tool.clone(), tool)
            .await
            .unwrap(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, splitx::server::router(container))
            .await
            .unwrap();
    });
    addr
}

async fn upload(client: &reqwest::Client, addr: SocketAddr) -> Value {
    let part = reqwest::multipart::Part::bytes(b"fake video".to_vec()).file_name("clip.mp4");
    let form = reqwest::multipart::Form::new().part("file", part);
    let response = client
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let addr = spawn(&dir, MockMediaTool::new(10.0)).await;
    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
    assert!(body["ts"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_upload_split_concat_round() {
    let dir = TempDir::new().unwrap();
    let addr = spawn(&dir, MockMediaTool::new(10.0)).await;
    let client = reqwest::Client::new();

    let uploaded = upload(&client, addr).await;
    let filename = uploaded["filename"].as_str().unwrap().to_string();
    assert!(filename.ends_with(".mp4"));
    assert_eq!(uploaded["url"], format!("/uploads/{}", filename));

    let served = client
        .get(format!("http://{}{}", addr, uploaded["url"].as_str().unwrap()))
        .send()
        .await
        .unwrap();
    assert_eq!(served.bytes().await.unwrap().as_ref(), b"fake video");

    let split: Value = client
        .post(format!("http://{}/split", addr))
        .json(&json!({ "filename": filename, "times": [7, 3, 7] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(split["summary"], "0 failures of 3");
    assert_eq!(split["ranges"][1], json!({ "start": 3.0, "end": 7.0 }));
    assert_eq!(split["slots"][0]["status"], "done");
    let segments: Vec<String> = serde_json::from_value(split["segments"].clone()).unwrap();
    assert_eq!(segments.len(), 3);

    let concat: Value = client
        .post(format!("http://{}/concat", addr))
        .json(&json!({ "files": [segments[1], segments[0]] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let output = concat["output"].as_str().unwrap();
    assert!(output.starts_with("/outputs/"));

    let body = client
        .get(format!("http://{}{}", addr, output))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "trim 3000-7000ms\ntrim 0-3000ms\n");
}

#[tokio::test]
async fn test_thumbnails_report_failed_slot() {
    let dir = TempDir::new().unwrap();
    let addr = spawn(&dir, MockMediaTool::new(20.0).failing_frame_at(5.0)).await;
    let client = reqwest::Client::new();
    let filename = upload(&client, addr).await["filename"].as_str().unwrap().to_string();

    let body: Value = client
        .post(format!("http://{}/thumbnails", addr))
        .json(&json!({ "filename": filename, "count": "4" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["summary"], "1 failure of 4");
    assert_eq!(body["thumbs"].as_array().unwrap().len(), 3);
    assert_eq!(body["slots"][1]["status"], "failed");
    assert!(body["slots"][1]["error"].as_str().unwrap().contains("5000ms"));
    let folder = body["folder"].as_str().unwrap();
    assert!(folder.starts_with(&format!("/thumbs/{}/", filename)));
    assert!(body["thumbs"][0].as_str().unwrap().starts_with(folder));
}

#[tokio::test]
async fn test_error_statuses() {
    let dir = TempDir::new().unwrap();
    let addr = spawn(&dir, MockMediaTool::new(10.0)).await;
    let client = reqwest::Client::new();
    let filename = upload(&client, addr).await["filename"].as_str().unwrap().to_string();

    let bad_count = client
        .post(format!("http://{}/thumbnails", addr))
        .json(&json!({ "filename": filename, "count": "many" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_count.status(), 400);
    let body: Value = bad_count.json().await.unwrap();
    assert_eq!(body["error"], "invalid_input");

    let missing = client
        .post(format!("http://{}/split", addr))
        .json(&json!({ "filename": "nope.mp4", "times": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let traversal = client
        .post(format!("http://{}/split", addr))
        .json(&json!({ "filename": "../manifest.json", "times": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(traversal.status(), 400);

    let forged = client
        .post(format!("http://{}/concat", addr))
        .json(&json!({ "files": ["/uploads/../manifest.json"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), 404);

    let empty = client
        .post(format!("http://{}/concat", addr))
        .json(&json!({ "files": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);

    let malformed = client
        .post(format!("http://{}/split", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
}

#[tokio::test]
async fn test_serves_ui_folder() {
    let dir = TempDir::new().unwrap();
    let addr = spawn(&dir, MockMediaTool::new(10.0)).await;
    let body = reqwest::get(format!("http://{}/index.html", addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "<h1>splitx</h1>");
}
