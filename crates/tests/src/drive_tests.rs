use crate::fixtures::test_app::{TestApp, VALID_TOKEN};
use drivegate_services::RemoteEntry;
use reqwest::multipart;
use serde_json::Value;
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_string_contains, method, path, query_param},
};

#[tokio::test]
async fn list_requires_bearer_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/drive/files"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn list_rejects_token_the_authority_rejects() {
    let app = TestApp::spawn().await;

    let resp = app
        .auth_get("/api/drive/files", "ya29.revoked")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn list_root_children() {
    let app = TestApp::spawn().await;
    app.seed_folder(
        "root",
        &[
            RemoteEntry::folder("f1", "Reports"),
            RemoteEntry::file("d1", "notes.txt", "text/plain"),
        ],
    )
    .await;

    let resp = app
        .auth_get("/api/drive/files", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "Reports");
    assert_eq!(items[0]["is_container"], true);
    assert_eq!(items[1]["mime_type"], "text/plain");
}

#[tokio::test]
async fn list_children_of_folder() {
    let app = TestApp::spawn().await;
    app.seed_folder("f1", &[RemoteEntry::file("d2", "q3.csv", "text/csv")])
        .await;

    let resp = app
        .auth_get("/api/drive/files?parentId=f1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json[0]["id"], "d2");
}

#[tokio::test]
async fn get_file_metadata() {
    let app = TestApp::spawn().await;
    let mut entry = RemoteEntry::file("d1", "notes.txt", "text/plain");
    entry.size = Some(13);
    app.seed_metadata(&entry).await;

    let resp = app
        .auth_get("/api/drive/files/d1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["name"], "notes.txt");
    assert_eq!(json["size"], 13);
}

#[tokio::test]
async fn get_missing_file_is_not_found() {
    let app = TestApp::spawn().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "message": "File not found: gone." }
        })))
        .mount(&app.google)
        .await;

    let resp = app
        .auth_get("/api/drive/files/gone", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn download_plain_file() {
    let app = TestApp::spawn().await;
    app.seed_metadata(&RemoteEntry::file("d1", "notes.txt", "text/plain"))
        .await;
    app.seed_content("d1", b"Hello, World!").await;

    let resp = app
        .auth_get("/api/drive/download/file?fileId=d1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "text/plain");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"notes.txt\""
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"Hello, World!");
}

#[tokio::test]
async fn download_document_is_exported_as_pdf() {
    let app = TestApp::spawn().await;
    app.seed_metadata(&RemoteEntry::file(
        "doc1",
        "Plan",
        "application/vnd.google-apps.document",
    ))
    .await;
    app.seed_export("doc1", "application/pdf", b"%PDF-1.4 fake").await;

    let resp = app
        .auth_get("/api/drive/download/file?fileId=doc1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 fake");
}

#[tokio::test]
async fn download_unconvertible_document_is_unprocessable() {
    let app = TestApp::spawn().await;
    app.seed_metadata(&RemoteEntry::file(
        "form1",
        "Survey",
        "application/vnd.google-apps.form",
    ))
    .await;

    let resp = app
        .auth_get("/api/drive/download/file?fileId=form1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn download_folder_as_file_is_unprocessable() {
    let app = TestApp::spawn().await;
    app.seed_metadata(&RemoteEntry::folder("f1", "Reports")).await;

    let resp = app
        .auth_get("/api/drive/download/file?fileId=f1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn upload_file_into_folder() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("\"parents\":[\"f1\"]"))
        .and(body_string_contains("Hello, Drive!"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "new1",
            "name": "hello.txt",
            "mimeType": "text/plain",
            "size": "13",
        })))
        .expect(1)
        .mount(&app.google)
        .await;

    let file_part = multipart::Part::bytes(b"Hello, Drive!".to_vec())
        .file_name("hello.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = multipart::Form::new()
        .part("file", file_part)
        .text("folderId", "f1");

    let resp = app
        .auth_post("/api/drive/upload", VALID_TOKEN)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["id"], "new1");
    assert_eq!(json["size"], 13);
}

#[tokio::test]
async fn upload_without_file_is_bad_request() {
    let app = TestApp::spawn().await;

    let form = multipart::Form::new().text("folderId", "f1");
    let resp = app
        .auth_post("/api/drive/upload", VALID_TOKEN)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn upload_over_quota_is_insufficient_storage() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "The user's Drive storage quota has been exceeded.",
                "errors": [{ "reason": "storageQuotaExceeded" }]
            }
        })))
        .mount(&app.google)
        .await;

    let file_part = multipart::Part::bytes(b"x".to_vec()).file_name("x.bin");
    let form = multipart::Form::new().part("file", file_part);
    let resp = app
        .auth_post("/api/drive/upload", VALID_TOKEN)
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 507);
}

#[tokio::test]
async fn delete_file() {
    let app = TestApp::spawn().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/d1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.google)
        .await;

    let resp = app
        .auth_delete("/api/drive/delete?fileId=d1", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["deleted"], true);
}

#[tokio::test]
async fn delete_forbidden_file() {
    let app = TestApp::spawn().await;
    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/locked"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "Insufficient permissions" }
        })))
        .mount(&app.google)
        .await;

    let resp = app
        .auth_delete("/api/drive/delete?fileId=locked", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
}
