// File: transport_integration_tests.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2025
// - Volker Schwaberow <volker@schwaberow.de>

use rtimer::config::{AttackConfig, TargetService, TransportConfig};
use rtimer::markers::RequestTemplate;
use rtimer::message::HttpMessage;
use rtimer::scheduler::{AttackScheduler, CancellationHandle, NoProgress};
use rtimer::store::ResultStore;
use rtimer::transport::{RawTransport, Transport};
use serial_test::serial;
use std::time::Duration;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_target(server: &MockServer) -> TargetService {
    TargetService::new("127.0.0.1", server.address().port(), false).unwrap()
}

fn transport() -> RawTransport {
    let mut config = TransportConfig::new();
    config.set_connect_timeout(Duration::from_secs(2));
    config.set_read_timeout(Duration::from_secs(5));
    RawTransport::new(config).unwrap()
}

#[tokio::test]
#[serial]
async fn test_raw_request_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello, World!"))
        .mount(&mock_server)
        .await;

    let response = transport()
        .send(
            &local_target(&mock_server),
            b"GET /status HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n",
        )
        .await
        .unwrap();

    let head = HttpMessage::parse(&response);
    assert_eq!(head.status_code(), Some(200));
    assert_eq!(head.content_length(), Some(13));
    assert!(response.ends_with(b"Hello, World!"));
}

#[tokio::test]
#[serial]
async fn test_head_request_completes_on_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ignored body"))
        .mount(&mock_server)
        .await;

    let mut config = TransportConfig::new();
    config.set_read_timeout(Duration::from_secs(10));
    let transport = RawTransport::new(config).unwrap();

    let start = std::time::Instant::now();
    let response = transport
        .send(
            &local_target(&mock_server),
            b"HEAD / HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n",
        )
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(HttpMessage::parse(&response).status_code(), Some(200));
}

#[tokio::test]
#[serial]
async fn test_refused_connection_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let target = TargetService::new("127.0.0.1", port, false).unwrap();
    let err = transport()
        .send(&target, b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n")
        .await
        .unwrap_err();

    assert!(err.is_transport());
}

#[tokio::test]
#[serial]
async fn test_attack_against_live_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string("user=admin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .mount(&mock_server)
        .await;

    let template = RequestTemplate::from_text(
        "POST /login HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 1\r\n\r\nuser=§name§",
    );
    let config = AttackConfig::new(
        template,
        vec!["admin".to_string(), "guest".to_string()],
        3,
        local_target(&mock_server),
    )
    .unwrap();

    let scheduler = AttackScheduler::new(transport());
    let mut store = ResultStore::new();
    scheduler
        .run_into(&config, &mut store, &NoProgress, &CancellationHandle::new())
        .await;

    assert_eq!(store.len(), 2);
    let admin = &store.rows()[0];
    assert_eq!(admin.payload, "admin");
    assert_eq!(admin.request_count, 3);
    assert_eq!(admin.status_code, 200);
    assert_eq!(admin.body_length, 7);

    let guest = &store.rows()[1];
    assert_eq!(guest.status_code, 404);
    assert_eq!(guest.body_length, 0);

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 6);
    assert_eq!(scheduler.state().failed_requests(), 0);
}

#[tokio::test]
#[serial]
async fn test_attack_against_dead_target_records_failures() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = AttackConfig::new(
        RequestTemplate::from_text("GET /§p§ HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n"),
        vec!["x".to_string()],
        2,
        TargetService::new("127.0.0.1", port, false).unwrap(),
    )
    .unwrap();

    let scheduler = AttackScheduler::new(transport());
    let mut store = ResultStore::new();
    scheduler
        .run_into(&config, &mut store, &NoProgress, &CancellationHandle::new())
        .await;

    let row = &store.rows()[0];
    assert_eq!(row.request_count, 2);
    assert_eq!(row.status_code, 0);
    assert_eq!(row.total_length, 0);
    assert_eq!(scheduler.state().failed_requests(), 2);
}
