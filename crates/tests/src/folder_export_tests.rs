use crate::fixtures::test_app::{TestApp, VALID_TOKEN};
use drivegate_services::RemoteEntry;
use serde_json::Value;
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn archive_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

async fn seed_tree(app: &TestApp) {
    app.seed_folder(
        "top",
        &[
            RemoteEntry::file("a", "a.txt", "text/plain"),
            RemoteEntry::folder("sub", "sub"),
        ],
    )
    .await;
    app.seed_folder("sub", &[RemoteEntry::file("b", "b.txt", "text/plain")])
        .await;
    app.seed_content("a", b"first file").await;
    app.seed_content("b", b"second file").await;
}

#[tokio::test]
async fn folder_download_is_a_zip_of_the_tree() {
    let app = TestApp::spawn().await;
    seed_tree(&app).await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "application/zip");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"folder.zip\""
    );

    let bytes = resp.bytes().await.unwrap();
    assert_eq!(
        archive_entries(&bytes),
        vec![
            ("a.txt".to_string(), b"first file".to_vec()),
            ("sub/b.txt".to_string(), b"second file".to_vec()),
        ]
    );
}

#[tokio::test]
async fn empty_folder_gives_empty_zip() {
    let app = TestApp::spawn().await;
    app.seed_folder("empty", &[]).await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=empty", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let bytes = resp.bytes().await.unwrap();
    assert!(archive_entries(&bytes).is_empty());
}

#[tokio::test]
async fn workspace_documents_are_converted_inside_the_zip() {
    let app = TestApp::spawn().await;
    app.seed_folder(
        "top",
        &[RemoteEntry::file(
            "deck",
            "Pitch",
            "application/vnd.google-apps.presentation",
        )],
    )
    .await;
    app.seed_export(
        "deck",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        b"pptx bytes",
    )
    .await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let bytes = resp.bytes().await.unwrap();
    assert_eq!(
        archive_entries(&bytes),
        vec![("Pitch".to_string(), b"pptx bytes".to_vec())]
    );
}

#[tokio::test]
async fn unsupported_type_fails_without_archive() {
    let app = TestApp::spawn().await;
    app.seed_folder(
        "top",
        &[
            RemoteEntry::file("a", "a.txt", "text/plain"),
            RemoteEntry::file("map", "Route", "application/vnd.google-apps.map"),
        ],
    )
    .await;
    app.seed_content("a", b"first file").await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 422);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "unprocessable");
    assert!(json["message"].as_str().unwrap().contains("Route"));
}

#[tokio::test]
async fn nested_listing_failure_fails_without_archive() {
    let app = TestApp::spawn().await;
    app.seed_folder(
        "top",
        &[
            RemoteEntry::file("a", "a.txt", "text/plain"),
            RemoteEntry::file("b", "b.txt", "text/plain"),
            RemoteEntry::folder("l1", "level1"),
        ],
    )
    .await;
    app.seed_folder("l1", &[RemoteEntry::folder("l2", "level2")])
        .await;
    app.seed_folder_error("l2", 500).await;
    app.seed_content("a", b"a").await;
    app.seed_content("b", b"b").await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 502);
    let json: Value = resp.json().await.unwrap();
    assert!(json["message"].as_str().unwrap().contains("level1/level2"));
}

#[tokio::test]
async fn forbidden_subfolder_maps_to_forbidden() {
    let app = TestApp::spawn().await;
    app.seed_folder("top", &[RemoteEntry::folder("secret", "secret")])
        .await;
    app.seed_folder_error("secret", 403).await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn folder_download_requires_token() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/drive/download/folder?folderId=top"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn sorted_export_orders_siblings_by_name() {
    let app = TestApp::spawn_with_settings(|s| s.export.sort_by_name = true).await;
    app.seed_folder(
        "top",
        &[
            RemoteEntry::file("z", "zeta.txt", "text/plain"),
            RemoteEntry::file("a", "alpha.txt", "text/plain"),
        ],
    )
    .await;
    app.seed_content("z", b"z").await;
    app.seed_content("a", b"a").await;

    let resp = app
        .auth_get("/api/drive/download/folder?folderId=top", VALID_TOKEN)
        .send()
        .await
        .unwrap();

    let bytes = resp.bytes().await.unwrap();
    let names: Vec<String> = archive_entries(&bytes)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["alpha.txt", "zeta.txt"]);
}
