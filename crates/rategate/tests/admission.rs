use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use rategate::limiter::IdleReaper;
use rategate::message::Message;
use rategate::{AdmissionMode, GatewayConfig, GatewayServer, LimiterConfig};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::Instant;
use tower::ServiceExt;

fn server(limiter: LimiterConfig, mode: AdmissionMode) -> GatewayServer {
    GatewayServer::new(GatewayConfig {
        limiter,
        mode,
        ..Default::default()
    })
    .expect("valid config")
}

fn request(method: Method, from: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri("/ping");
    if let Some(addr) = from {
        let addr: SocketAddr = addr.parse().expect("socket address");
        builder = builder.extension(ConnectInfo(addr));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, from: &str) -> Response {
    app.clone()
        .oneshot(request(Method::GET, Some(from)))
        .await
        .expect("request success")
}

async fn message(response: Response) -> Message {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test(start_paused = true)]
async fn burst_is_capped_then_refills_over_time() {
    let server = server(LimiterConfig::default(), AdmissionMode::Respond);
    let app = server.build_app();

    for i in 0..25u16 {
        // The port changes on every request; only the host identifies the client.
        let response = send(&app, &format!("192.0.2.10:{}", 40000 + i)).await;
        if i < 20 {
            assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
            assert_eq!(message(response).await, Message::request_ok());
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "request {}", i + 1);
            assert!(response.headers().contains_key(header::RETRY_AFTER));
            assert_eq!(message(response).await, Message::at_capacity());
        }
    }

    tokio::time::advance(Duration::from_secs(1)).await;

    for _ in 0..5 {
        let response = send(&app, "192.0.2.10:41000").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = send(&app, "192.0.2.10:41000").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn responses_are_json() {
    let app = server(LimiterConfig::default(), AdmissionMode::Respond).build_app();

    let response = send(&app, "192.0.2.1:1000").await;
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
}

#[tokio::test(start_paused = true)]
async fn every_method_is_charged() {
    let limiter = LimiterConfig {
        capacity: 3,
        ..Default::default()
    };
    let app = server(limiter, AdmissionMode::Respond).build_app();

    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let response = app
            .clone()
            .oneshot(request(method, Some("192.0.2.2:80")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = send(&app, "192.0.2.2:80").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test(start_paused = true)]
async fn clients_are_limited_independently() {
    let limiter = LimiterConfig {
        capacity: 1,
        ..Default::default()
    };
    let app = server(limiter, AdmissionMode::Respond).build_app();

    assert_eq!(send(&app, "192.0.2.3:1").await.status(), StatusCode::OK);
    assert_eq!(send(&app, "192.0.2.3:2").await.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send(&app, "192.0.2.4:1").await.status(), StatusCode::OK);
    assert_eq!(send(&app, "[2001:db8::1]:1").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_source_address_is_a_server_error() {
    let server = server(LimiterConfig::default(), AdmissionMode::Forward);
    let app = server.build_app();

    let response = app.oneshot(request(Method::GET, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
    assert!(server.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn forward_mode_reaches_endpoint_only_when_admitted() {
    let limiter = LimiterConfig {
        capacity: 1,
        ..Default::default()
    };
    let app = server(limiter, AdmissionMode::Forward).build_app();

    let admitted = send(&app, "192.0.2.5:1").await;
    assert_eq!(admitted.status(), StatusCode::OK);
    assert_eq!(message(admitted).await, Message::greeting());

    let rejected = send(&app, "192.0.2.5:1").await;
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(message(rejected).await, Message::at_capacity());
}

#[tokio::test(start_paused = true)]
async fn evicted_client_comes_back_fresh() {
    let limiter = LimiterConfig {
        capacity: 2,
        ..Default::default()
    };
    let server = server(limiter.clone(), AdmissionMode::Respond);
    let app = server.build_app();
    let reaper = IdleReaper::from_config(server.registry(), &limiter);

    send(&app, "192.0.2.6:1").await;
    send(&app, "192.0.2.6:1").await;
    assert_eq!(send(&app, "192.0.2.6:1").await.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(reaper.sweep(Instant::now()), 1);
    assert!(server.registry().is_empty());

    assert_eq!(send(&app, "192.0.2.6:1").await.status(), StatusCode::OK);
    assert_eq!(send(&app, "192.0.2.6:1").await.status(), StatusCode::OK);
    assert_eq!(server.registry().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_exceed_capacity() {
    let limiter = LimiterConfig {
        capacity: 20,
        refill_per_second: 0.001,
        ..Default::default()
    };
    let server = server(limiter, AdmissionMode::Respond);
    let app = server.build_app();

    let tasks: Vec<_> = (0..60u16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move { send(&app, &format!("198.51.100.7:{}", 1000 + i)).await.status() })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::OK {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 20);
    assert_eq!(server.registry().len(), 1);
}
