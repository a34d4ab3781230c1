use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fruitslot_core::{RandomSource, ScriptedRng, Session};
use fruitslot_server::{router, AppState, MemoryStore, RngFactory, SessionStore, SqliteStore};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

// Unit values that land on each symbol.
const C: f64 = 0.1;
const L: f64 = 0.3;
const O: f64 = 0.6;
const W: f64 = 0.9;

fn scripted(values: &'static [f64]) -> RngFactory {
    Arc::new(move || -> Box<dyn RandomSource + Send> {
        Box::new(ScriptedRng::new(values.to_vec()).unwrap())
    })
}

fn app_with(store: Arc<dyn SessionStore>, values: &'static [f64]) -> Router {
    router(AppState::new(store).with_rng(scripted(values)))
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn seeded(store: &Arc<MemoryStore>, session: Session) -> String {
    store.insert(&session).await.unwrap();
    session.token().to_string()
}

#[tokio::test]
async fn health_check() {
    let app = app_with(Arc::new(MemoryStore::new()), &[C]);
    let (status, _) = call(&app, "GET", "/up").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn creates_session_with_ten_credits() {
    let app = app_with(Arc::new(MemoryStore::new()), &[C]);
    let (status, json) = call(&app, "POST", "/api/v1/game_sessions").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["credits"], 10);
    assert_eq!(json["cashed_out"], false);
    let token = json["session_token"].as_str().unwrap();
    assert_eq!(token.len(), 32);

    let (_, second) = call(&app, "POST", "/api/v1/game_sessions").await;
    assert_ne!(second["session_token"], json["session_token"]);
}

#[tokio::test]
async fn shows_session() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::with_credits(15)).await;
    let app = app_with(store, &[C]);

    let (status, json) = call(&app, "GET", &format!("/api/v1/game_sessions/{token}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_token"], token.as_str());
    assert_eq!(json["credits"], 15);
    assert_eq!(json["cashed_out"], false);
}

#[tokio::test]
async fn unknown_session_is_404() {
    let app = app_with(Arc::new(MemoryStore::new()), &[C]);
    for (method, uri) in [
        ("GET", "/api/v1/game_sessions/nonexistent_token"),
        ("POST", "/api/v1/game_sessions/nonexistent_token/roll"),
        ("POST", "/api/v1/game_sessions/nonexistent_token/cash_out"),
        ("GET", "/api/v1/game_sessions/0123456789abcdef0123456789abcdef"),
    ] {
        let (status, json) = call(&app, method, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(json["error"], "Session not found");
    }
}

#[tokio::test]
async fn winning_roll_pays_reward_minus_cost() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::create()).await;
    let app = app_with(store.clone(), &[W]);

    let (status, json) = call(&app, "POST", &format!("/api/v1/game_sessions/{token}/roll")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], serde_json::json!(["W", "W", "W"]));
    assert_eq!(json["win"], true);
    assert_eq!(json["reward"], 40);
    assert_eq!(json["credits"], 49);

    let log = store.recent_spins(1).await.unwrap();
    assert_eq!(log[0].credits_after, 49);
}

#[tokio::test]
async fn losing_roll_costs_one() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::create()).await;
    let app = app_with(store, &[C, L, O]);

    let (status, json) = call(&app, "POST", &format!("/api/v1/game_sessions/{token}/roll")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], serde_json::json!(["C", "L", "O"]));
    assert_eq!(json["win"], false);
    assert_eq!(json["reward"], 0);
    assert_eq!(json["credits"], 9);
}

#[tokio::test]
async fn roll_without_credits_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::with_credits(0)).await;
    let app = app_with(store, &[W]);

    let (status, json) = call(&app, "POST", &format!("/api/v1/game_sessions/{token}/roll")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Insufficient credits");

    let (_, json) = call(&app, "GET", &format!("/api/v1/game_sessions/{token}")).await;
    assert_eq!(json["credits"], 0);
}

#[tokio::test]
async fn cash_out_flow() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::with_credits(25)).await;
    let app = app_with(store, &[W]);

    let (status, json) =
        call(&app, "POST", &format!("/api/v1/game_sessions/{token}/cash_out")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Successfully cashed out");
    assert_eq!(json["credits_cashed"], 25);
    assert_eq!(json["session_token"], token.as_str());

    let (_, json) = call(&app, "GET", &format!("/api/v1/game_sessions/{token}")).await;
    assert_eq!(json["cashed_out"], true);
    assert_eq!(json["credits"], 25);

    let (status, json) = call(&app, "POST", &format!("/api/v1/game_sessions/{token}/roll")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Session has been cashed out");

    let (status, json) =
        call(&app, "POST", &format!("/api/v1/game_sessions/{token}/cash_out")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Session already cashed out");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rolls_cannot_overdraw() {
    let store = Arc::new(MemoryStore::new());
    let token = seeded(&store, Session::with_credits(3)).await;
    let app = app_with(store.clone(), &[C, L, O]);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        let uri = format!("/api/v1/game_sessions/{token}/roll");
        handles.push(tokio::spawn(async move { call(&app, "POST", &uri).await.0 }));
    }
    let mut ok = 0;
    for h in handles {
        let status = h.await.unwrap();
        if status == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        }
    }
    assert_eq!(ok, 3);
    let session = store
        .get(&token.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.credits(), 0);
}

#[tokio::test]
async fn sqlite_backed_round_trip() {
    let store: Arc<dyn SessionStore> = Arc::new(SqliteStore::in_memory().await.unwrap());
    let app = app_with(store, &[C, L, O]);

    let (_, created) = call(&app, "POST", "/api/v1/game_sessions").await;
    let token = created["session_token"].as_str().unwrap().to_string();

    let (status, json) = call(&app, "POST", &format!("/api/v1/game_sessions/{token}/roll")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["credits"], 9);

    let (status, json) =
        call(&app, "POST", &format!("/api/v1/game_sessions/{token}/cash_out")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["credits_cashed"], 9);
}
