mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{harness, harness_with, live_match, test_config, Harness};
use cricket_live::{cors_layer, router, Config};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    router(h.state.clone(), cors_layer(&test_config()))
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn root_reports_running() {
    let h = harness(vec![]);
    for uri in ["/api", "/api/"] {
        let (status, body) = call(app(&h), "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
    }
}

#[tokio::test]
async fn current_matches_come_from_the_cache() {
    let h = harness(vec![live_match("m1", "India", "Australia"), live_match("m2", "England", "Ireland")]);

    let (status, body) = call(app(&h), "GET", "/api/matches/current", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["id"], "m1");
    assert_eq!(body["data"][0]["matchType"], "t20");
    assert_eq!(body["data"][0]["score"][0]["r"], 112);

    call(app(&h), "GET", "/api/matches/current", None).await;
    assert_eq!(h.provider.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn match_details_cache_then_provider_then_404() {
    let h = harness(vec![live_match("m1", "India", "Australia")]);
    h.provider.add_lookup_only(live_match("old7", "Kenya", "Canada"));

    let (status, body) = call(app(&h), "GET", "/api/matches/m1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teams"][0], "India");

    let (status, body) = call(app(&h), "GET", "/api/matches/old7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["teams"][0], "Kenya");

    let (status, body) = call(app(&h), "GET", "/api/matches/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Match not found"}));
}

#[tokio::test]
async fn provider_errors_become_empty_lists() {
    let h = harness(vec![]);
    let (status, body) = call(app(&h), "GET", "/api/matches/all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));

    let (_, body) = call(app(&h), "GET", "/api/series", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Border-Gavaskar Trophy");
}

#[tokio::test]
async fn subscribe_resubscribe_and_delete() {
    let h = harness(vec![]);

    let (status, first) = call(
        app(&h),
        "POST",
        "/api/subscribers",
        Some(json!({"chat_id": 6001, "username": "fan", "first_name": "Neha"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Subscribed");

    let (_, second) = call(app(&h), "POST", "/api/subscribers", Some(json!({"chat_id": 6001}))).await;
    assert_eq!(second["message"], "Resubscribed");
    assert_eq!(first["id"], second["id"]);

    let (_, count) = call(app(&h), "GET", "/api/subscribers", None).await;
    assert_eq!(count, json!({"status": "success", "active_subscribers": 1}));

    let (status, body) = call(app(&h), "DELETE", "/api/subscribers/6001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Unsubscribed");

    // already inactive
    let (status, body) = call(app(&h), "DELETE", "/api/subscribers/6001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Subscriber not found");

    let (status, _) = call(app(&h), "DELETE", "/api/subscribers/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, count) = call(app(&h), "GET", "/api/subscribers", None).await;
    assert_eq!(count["active_subscribers"], 0);
}

#[tokio::test(start_paused = true)]
async fn delete_stops_live_loop_of_a_chat_that_never_subscribed() {
    let h = harness(vec![live_match("m1", "India", "Australia")]);
    h.state.dispatcher.dispatch(&common::profile(77, "Tara"), "/live").await;
    assert!(h.state.live.is_running(77));

    let (status, _) = call(app(&h), "DELETE", "/api/subscribers/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!h.state.live.is_running(77));

    h.state.tasks.drain().await;
    assert!(h.messenger.edits().is_empty());
}

#[tokio::test]
async fn bot_info_reflects_configuration() {
    let h = harness(vec![]);
    let (_, body) = call(app(&h), "GET", "/api/telegram/bot-info", None).await;
    assert_eq!(
        body,
        json!({"status": "success", "bot_username": "ksp_cricket_bot", "bot_name": "KSP Cricket"})
    );

    let unconfigured = Config {
        telegram_bot_token: String::new(),
        ..test_config()
    };
    let h = harness_with(unconfigured, vec![]);
    let (status, body) = call(app(&h), "GET", "/api/telegram/bot-info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "error", "message": "Bot not configured"}));
}

#[tokio::test(start_paused = true)]
async fn notify_and_broadcast_are_queued() {
    let h = harness(vec![live_match("m1", "India", "Australia")]);
    call(app(&h), "POST", "/api/subscribers", Some(json!({"chat_id": 1}))).await;
    call(app(&h), "POST", "/api/subscribers", Some(json!({"chat_id": 2}))).await;

    let m = serde_json::to_value(live_match("m5", "Scotland", "Netherlands")).unwrap();
    let (status, body) = call(app(&h), "POST", "/api/telegram/notify", Some(m)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notifications queued");

    let (_, body) = call(app(&h), "POST", "/api/broadcast", None).await;
    assert_eq!(body["message"], "Broadcast queued");

    h.state.tasks.drain().await;
    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent.iter().filter(|o| o.text.contains("Scotland")).count(), 2);
    assert_eq!(sent.iter().filter(|o| o.text.contains("LIVE CRICKET SCORES")).count(), 2);
}

#[tokio::test]
async fn listed_cors_origin_is_echoed() {
    let h = harness(vec![]);
    let config = Config {
        cors_origins: vec!["https://ksp.example".into()],
        ..test_config()
    };
    let app = router(h.state.clone(), cors_layer(&config));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/")
                .header("origin", "https://ksp.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://ksp.example"
    );
}
