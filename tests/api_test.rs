//! Integration tests for the HTTP surface: auth, /convert and /output.

mod common;

use common::{music_form, spawn_server, test_config, Script, ScriptedRunner};

#[tokio::test]
async fn health_accessible_without_auth() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.auth.enabled = true;
    config.server.auth.api_token = Some("secret-token".into());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn missing_bearer_token_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.auth.enabled = true;
    config.server.auth.api_token = Some("secret-token".into());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/convert"))
        .multipart(music_form("track.wav", b"RIFF"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn wrong_bearer_token_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.auth.enabled = true;
    config.server.auth.api_token = Some("secret-token".into());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/convert"))
        .header("Authorization", "Bearer not-the-token")
        .multipart(music_form("track.wav", b"RIFF"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn convert_produces_all_variants_and_serves_them() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.auth.enabled = true;
    config.server.auth.api_token = Some("secret-token".into());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/convert"))
        .header("Authorization", "Bearer secret-token")
        .multipart(music_form("track.wav", b"RIFF fake audio"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Conversion completed.");
    let outputs = body["outputs"].as_array().unwrap();
    assert_eq!(outputs.len(), 4);
    for suffix in ["-320.opus", "-160.opus", "-80.opus", "-40.opus"] {
        assert!(
            outputs
                .iter()
                .any(|o| o.as_str().unwrap().ends_with(&format!("track{suffix}"))),
            "missing variant {suffix} in {outputs:?}"
        );
    }

    // Variants are immediately downloadable from the static namespace.
    let first = outputs[0].as_str().unwrap();
    let resp = client
        .get(format!("http://{addr}{first}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"opus");
}

#[tokio::test]
async fn convert_without_file_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    // A multipart body with an unrelated field only.
    let form = reqwest::multipart::Form::new().text("comment", "no file here");
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/convert"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body = resp.text().await.unwrap();
    assert!(body.contains("no file was uploaded"), "body: {body}");
}

#[tokio::test]
async fn failing_variant_fails_the_whole_request() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let runner = ScriptedRunner::new([
        (320, Script::Succeed),
        (160, Script::Fail("opusenc exited with status 1")),
        (80, Script::Succeed),
        (40, Script::Succeed),
    ]);
    let addr = spawn_server(config, runner).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/convert"))
        .multipart(music_form("track.wav", b"RIFF"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body = resp.text().await.unwrap();
    assert!(body.contains("160"), "failure should name the bitrate: {body}");
}

#[tokio::test]
async fn concurrent_requests_with_same_file_name_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let (a, b) = tokio::join!(
        client
            .post(format!("http://{addr}/convert"))
            .multipart(music_form("track.wav", b"first"))
            .send(),
        client
            .post(format!("http://{addr}/convert"))
            .multipart(music_form("track.wav", b"second"))
            .send(),
    );
    let a: serde_json::Value = a.unwrap().json().await.unwrap();
    let b: serde_json::Value = b.unwrap().json().await.unwrap();

    // Same file names, different request namespaces.
    let path_a = a["outputs"][0].as_str().unwrap();
    let path_b = b["outputs"][0].as_str().unwrap();
    assert!(path_a.ends_with("track-320.opus"));
    assert!(path_b.ends_with("track-320.opus"));
    assert_ne!(path_a, path_b);
}

#[tokio::test]
async fn upload_route_missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.store.enabled = true;
    config.store.url = "http://127.0.0.1:9".into();
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/upload"))
        .json(&serde_json::json!({ "file_name": "nope/track-320.opus" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn upload_route_rejects_path_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.store.enabled = true;
    config.store.url = "http://127.0.0.1:9".into();
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://{addr}/upload"))
        .json(&serde_json::json!({ "file_name": "../../etc/passwd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn store_routes_unavailable_without_store_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let addr = spawn_server(config, ScriptedRunner::all_succeeding()).await;

    let client = reqwest::Client::new();
    for route in ["/upload", "/register", "/login"] {
        let resp = client
            .post(format!("http://{addr}{route}"))
            .json(&serde_json::json!({ "file_name": "x", "seed": "x" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 503, "route {route}");
    }
}
