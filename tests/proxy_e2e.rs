//! End-to-end tests: browser → gateway → mock origin.

use std::time::Duration;

use embed_proxy::GatewayConfig;
use reqwest::StatusCode;

mod common;
use common::{client, spawn_gateway, start_origin, unused_addr, MockResponse};

fn encode_param(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

#[tokio::test]
async fn html_is_rewritten_for_the_framing_origin() {
    let origin = start_origin(|req| match req.target.as_str() {
        "/index.html" => MockResponse::ok(
            "text/html; charset=utf-8",
            r#"<html><head><title>t</title></head><body><a href="/about">About</a><img src="logo.png"></body></html>"#,
        )
        .header("X-Frame-Options", "DENY")
        .header("Content-Security-Policy", "frame-ancestors 'none'"),
        _ => MockResponse::new(404),
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/index.html"))
        .header("x-forwarded-proto", "https")
        .header("x-forwarded-host", "gatewayhost")
        .send()
        .await
        .expect("gateway unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers().clone();
    assert_eq!(headers["x-frame-options"], "ALLOW-FROM *");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("frame-ancestors *"));
    assert_eq!(headers["cache-control"], "public, max-age=3600");
    assert_eq!(headers["content-type"], "text/html; charset=utf-8");
    assert!(headers.contains_key("x-request-id"));

    let body = res.text().await.unwrap();
    let prefix = format!("https://gatewayhost/api/proxy/http/{origin}");
    assert!(body.contains(&format!(r#"<a href="{prefix}/about">About</a>"#)));
    assert!(body.contains(&format!(r#"<img src="{prefix}/logo.png">"#)));
    assert!(body.contains("<head><script>"));
    assert!(body.contains("<title>t</title>"));
}

#[tokio::test]
async fn forwarded_headers_are_filtered() {
    let origin = start_origin(|req| {
        let seen = format!(
            "host={} custom={} encoding={}",
            req.header("host").unwrap_or("-"),
            req.header("x-custom").unwrap_or("-"),
            req.header("accept-encoding").unwrap_or("-"),
        );
        MockResponse::ok("text/plain", seen).header("Cache-Control", "no-store")
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/echo"))
        .header("x-custom", "yes")
        .header("accept-encoding", "gzip, br")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["cache-control"], "no-store");
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("host={origin} custom=yes encoding=-"));
}

#[tokio::test]
async fn css_is_rewritten_through_the_url_parameter() {
    let origin = start_origin(|_| {
        MockResponse::ok("text/css", r#"body{background:url("/img/bg.png")}"#)
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let target = format!("http://{origin}/style.css");
    let res = client()
        .get(format!("http://{gateway}/api/proxy?url={}", encode_param(&target)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert_eq!(
        body,
        format!(r#"body{{background:url("http://{gateway}/api/proxy/http/{origin}/img/bg.png")}}"#)
    );
}

#[tokio::test]
async fn binary_bodies_pass_through_untouched() {
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let expected = payload.clone();
    let origin = start_origin(move |_| MockResponse::ok("image/png", payload.clone())).await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/logo.png"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().as_ref(), expected.as_slice());
}

#[tokio::test]
async fn upstream_status_is_passed_through() {
    let origin = start_origin(|_| MockResponse::ok("text/plain", "gone").header("X-Kept", "1"))
        .await;
    let origin_404 = start_origin(|_| MockResponse::new(404).body("missing")).await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-kept"], "1");

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin_404}/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "missing");
}

#[tokio::test]
async fn missing_target_is_a_json_400() {
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json, serde_json::json!({ "error": "Missing 'url' query parameter" }));
}

#[tokio::test]
async fn websocket_targets_are_refused() {
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/wss/example.com/socket"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["error"], "WebSocket protocols not supported");
}

#[tokio::test]
async fn unreachable_origin_is_a_500() {
    let dead = unused_addr().await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{dead}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Failed to fetch the requested site");
}

#[tokio::test]
async fn slow_origin_times_out() {
    let origin = start_origin(|_| {
        MockResponse::ok("text/plain", "late").delayed(Duration::from_secs(5))
    })
    .await;
    let mut config = GatewayConfig::default();
    config.timeouts.upstream_secs = 1;
    let (gateway, _shutdown) = spawn_gateway(config).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn request_deadline_answers_408() {
    let origin = start_origin(|_| {
        MockResponse::ok("text/plain", "late").delayed(Duration::from_secs(3))
    })
    .await;
    let mut config = GatewayConfig::default();
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = 5;
    let (gateway, _shutdown) = spawn_gateway(config).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn head_requests_get_sanitized_headers_and_no_body() {
    let origin = start_origin(|req| {
        if req.method != "HEAD" {
            return MockResponse::new(405);
        }
        MockResponse::ok("text/html", "<html><head></head><body>page</body></html>")
            .header("X-Frame-Options", "DENY")
            .header("Content-Security-Policy", "default-src 'self'; frame-ancestors 'none'")
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .head(format!("http://{gateway}/api/proxy/http/{origin}/index.html"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers().clone();
    assert_eq!(headers["content-type"], "text/html");
    assert_eq!(headers["x-frame-options"], "ALLOW-FROM *");
    let csp = headers["content-security-policy"].to_str().unwrap();
    assert!(csp.contains("frame-ancestors *"));
    assert!(!csp.contains("'none'"));

    let body = res.bytes().await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn redirects_are_followed_and_rebase_the_document() {
    let origin = start_origin(|req| match req.target.as_str() {
        "/old" => MockResponse::redirect("/new/page"),
        "/new/page" => MockResponse::ok("text/html", r#"<html><head></head><body><a href="next">n</a></body></html>"#),
        _ => MockResponse::new(404),
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/old"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.contains(&format!(
        r#"<a href="http://{gateway}/api/proxy/http/{origin}/new/next">n</a>"#
    )));
}

#[tokio::test]
async fn redirect_loops_are_bounded() {
    let origin = start_origin(|_| MockResponse::redirect("/loop")).await;
    let mut config = GatewayConfig::default();
    config.upstream.max_redirects = 3;
    let (gateway, _shutdown) = spawn_gateway(config).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/loop"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn oversized_rewritable_body_is_refused() {
    let origin = start_origin(|_| MockResponse::ok("text/html", "x".repeat(4096))).await;
    let mut config = GatewayConfig::default();
    config.limits.max_rewrite_bytes = 1024;
    let (gateway, _shutdown) = spawn_gateway(config).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/big.html"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let json: serde_json::Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Upstream response too large to rewrite");
}

#[tokio::test]
async fn oversized_binary_body_still_streams() {
    let origin = start_origin(|_| MockResponse::ok("application/octet-stream", vec![7u8; 4096])).await;
    let mut config = GatewayConfig::default();
    config.limits.max_rewrite_bytes = 1024;
    let (gateway, _shutdown) = spawn_gateway(config).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy/http/{origin}/blob"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.bytes().await.unwrap().len(), 4096);
}

#[tokio::test]
async fn request_bodies_are_forwarded() {
    let origin = start_origin(|req| {
        let echoed = format!("{} {}", req.method, String::from_utf8_lossy(&req.body));
        MockResponse::ok("text/plain", echoed)
    })
    .await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .post(format!("http://{gateway}/api/proxy/http/{origin}/submit"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=embed&page=1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.text().await.unwrap(), "POST name=embed&page=1");
}

#[tokio::test]
async fn referer_recovers_the_target() {
    let origin = start_origin(|req| MockResponse::ok("text/plain", req.target.clone())).await;
    let (gateway, _shutdown) = spawn_gateway(GatewayConfig::default()).await;

    let res = client()
        .get(format!("http://{gateway}/api/proxy?page=2"))
        .header("referer", format!("http://{gateway}/api/proxy/http/{origin}/search?q=rust"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "/search?q=rust&page=2");
}

#[tokio::test]
async fn shutdown_stops_the_listener() {
    let (gateway, shutdown) = spawn_gateway(GatewayConfig::default()).await;
    let res = client()
        .get(format!("http://{gateway}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(client()
        .get(format!("http://{gateway}/healthz"))
        .send()
        .await
        .is_err());
}
