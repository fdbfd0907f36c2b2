//! End-to-end forwarding through a running proxy.

use axum::http::StatusCode;

mod common;

#[tokio::test]
async fn test_round_trip_preserves_status_headers_and_body() {
    let backend = common::start_echo_backend("ok").await;
    let (proxy, shutdown) = common::start_proxy(common::config_for(&[backend], "RoundRobin")).await;

    let res = common::client()
        .get(format!("http://{proxy}/greeting?lang=en"))
        .header("x", "a")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x").unwrap(), "a");
    assert_eq!(res.headers().get("x-seen-uri").unwrap(), "/greeting?lang=en");
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), "ok");

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_body_is_forwarded() {
    let backend = common::start_echo_backend("echo").await;
    let (proxy, shutdown) = common::start_proxy(common::config_for(&[backend], "RoundRobin")).await;

    let res = common::client()
        .post(format!("http://{proxy}/submit"))
        .header("content-type", "application/json")
        .body(r#"{"id":7}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), r#"{"id":7}"#);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = common::unreachable_addr().await;
    let (proxy, shutdown) = common::start_proxy(common::config_for(&[dead], "RoundRobin")).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(res.headers().get("x-backend").is_none());
    let body = res.text().await.unwrap();
    assert!(body.starts_with("Error forwarding request:"), "unexpected body: {body}");

    shutdown.trigger();
}

#[tokio::test]
async fn test_raw_backend_response_is_relayed() {
    let backend = common::start_mock_backend("Hello from backend").await;
    let (proxy, shutdown) = common::start_proxy(common::config_for(&[backend], "RoundRobin")).await;

    let res = common::client()
        .get(format!("http://{proxy}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "Hello from backend");

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_statuses_are_relayed() {
    for (status, body) in [
        (StatusCode::NOT_FOUND, "nope"),
        (StatusCode::INTERNAL_SERVER_ERROR, "upstream broke"),
    ] {
        let backend = common::start_status_backend(status, body).await;
        let (proxy, shutdown) =
            common::start_proxy(common::config_for(&[backend], "RoundRobin")).await;

        let res = common::client()
            .get(format!("http://{proxy}/missing"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), status);
        assert_eq!(res.text().await.unwrap(), body);

        shutdown.trigger();
    }
}
