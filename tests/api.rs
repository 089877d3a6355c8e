//! End-to-end tests for the control plane API over a real socket.

use std::sync::atomic::Ordering;
use std::time::Duration;

use gildra_control_plane::http::{ChallengeTokenResponse, GetCertResponse};
use gildra_control_plane::lifecycle::startup::watch_config;
use gildra_control_plane::routing::RoutingConfig;
use serde_json::json;

mod common;
use common::{client, spawn_server, FakeIssuer};

#[tokio::test]
async fn test_issue_and_fetch_certificate() {
    let server = spawn_server(FakeIssuer::new).await;
    let client = client();

    let res = client
        .post(server.url("/create"))
        .json(&json!({"Domain": "shop.example.com", "Provider": "zerossl"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "created cert for domain!");

    let res = client
        .get(server.url("/domains/shop.example.com/cert"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let cert: GetCertResponse = res.json().await.unwrap();
    assert!(cert.cert.contains("shop.example.com via zerossl"));
    assert!(cert.key.contains("BEGIN PRIVATE KEY"));
}

#[tokio::test]
async fn test_challenge_key_available_during_issuance() {
    let server = spawn_server(|c| FakeIssuer::new(c).with_delay(Duration::from_millis(500))).await;
    let client = client();

    let create = {
        let client = client.clone();
        let url = server.url("/create");
        tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({"domain": "slow.example.com"}))
                .send()
                .await
                .unwrap()
                .status()
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;

    let token = FakeIssuer::token_for("slow.example.com");
    let res = client
        .get(server.url(&format!("/domains/slow.example.com/challenge/{token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: ChallengeTokenResponse = res.json().await.unwrap();
    assert_eq!(body.key, format!("{token}.thumbprint"));

    let res = client
        .post(server.url("/create"))
        .json(&json!({"Domain": "slow.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409, "second issuance for the same domain must conflict");

    assert_eq!(create.await.unwrap(), 200);
    assert_eq!(server.issuer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_issuance_is_server_error() {
    let server = spawn_server(|c| FakeIssuer::new(c).failing_for("bad.example.com")).await;
    let client = client();

    let res = client
        .post(server.url("/create"))
        .json(&json!({"Domain": "bad.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), "error creating cert");

    let res = client
        .get(server.url("/domains/bad.example.com/cert"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let server = spawn_server(FakeIssuer::new).await;
    let client = client();

    let res = client
        .post(server.url("/create"))
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .post(server.url("/create"))
        .json(&json!({"Domain": "*.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .get(server.url("/domains/example.com/challenge/..secret"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    assert_eq!(server.issuer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_routing_config_hot_reload() {
    let server = spawn_server(FakeIssuer::new).await;
    let client = client();

    let doc: RoutingConfig = client
        .get(server.url("/domains/api.example.com/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc, RoutingConfig::forward_all(["http://localhost:8080"]));

    let dir = tempfile::tempdir().unwrap();
    let mut updated = common::test_config(&dir);
    updated.routing.domains.insert(
        "api.example.com".into(),
        gildra_control_plane::config::DomainRoute {
            destinations: vec!["http://10.0.0.7:9000".into(), "http://10.0.0.8:9000".into()],
        },
    );
    server.config_updates.send(updated).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let doc: RoutingConfig = client
        .get(server.url("/domains/API.example.com/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        doc,
        RoutingConfig::forward_all(["http://10.0.0.7:9000", "http://10.0.0.8:9000"])
    );

    let doc: RoutingConfig = client
        .get(server.url("/domains/other.example.com/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc, RoutingConfig::forward_all(["http://localhost:8080"]));
}

#[tokio::test]
async fn test_config_file_edit_reaches_routing() {
    let server = spawn_server(FakeIssuer::new).await;
    let client = client();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("control-plane.toml");
    std::fs::write(&path, "[routing]\ndefault_destinations = [\"http://localhost:8080\"]\n").unwrap();

    let (watcher, mut updates) = watch_config(Some(&path));
    let _watcher = watcher.expect("watcher did not start");
    let forward = server.config_updates.clone();
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            let _ = forward.send(config);
        }
    });

    std::fs::write(
        &path,
        "[routing]\ndefault_destinations = [\"http://localhost:8080\"]\n\n\
         [routing.domains.\"api.example.com\"]\ndestinations = [\"http://10.0.0.9:9000\"]\n",
    )
    .unwrap();

    let expected = RoutingConfig::forward_all(["http://10.0.0.9:9000"]);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let doc: RoutingConfig = client
            .get(server.url("/domains/api.example.com/config"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if doc == expected {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "routing never picked up the edited file"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_graceful_shutdown() {
    let server = spawn_server(FakeIssuer::new).await;

    let res = client().get(server.url("/hc")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server did not stop");
    assert!(result.unwrap().is_ok());
}
