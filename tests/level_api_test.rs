//! End-to-end tests for the level API
//!
//! Requests go through `routes::dispatch` against the in-memory store and a
//! manually driven clock, so no MongoDB or network socket is needed.

use bson::oid::ObjectId;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use clap::Parser;
use http_body_util::BodyExt;
use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use promitto::auth::JwtValidator;
use promitto::clock::FixedClock;
use promitto::config::Args;
use promitto::db::schemas::{ConnectionStatus, UserDoc};
use promitto::db::{LevelStore, MemoryStore, UserStore};
use promitto::routes;
use promitto::server::AppState;
use promitto::services::LevelService;

struct Harness {
    state: AppState,
    store: Arc<MemoryStore>,
    clock: Arc<FixedClock>,
    alice: ObjectId,
    bob: ObjectId,
}

impl Harness {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap(),
        ));

        let alice = store
            .insert_user(UserDoc::new("alice", "Alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = store
            .insert_user(UserDoc::new("bob", "Bob", "bob@example.com"))
            .await
            .unwrap();

        let args = Args::try_parse_from(["promitto", "--dev-mode"]).unwrap();
        let service = LevelService::new(store.clone(), clock.clone());
        let state = AppState::new(args, service, JwtValidator::new_dev(), "memory");

        Self {
            state,
            store,
            clock,
            alice,
            bob,
        }
    }

    async fn connected() -> Self {
        let harness = Self::new().await;
        harness
            .state
            .service
            .establish_connection(&harness.alice, &harness.bob)
            .await
            .unwrap();
        harness
    }

    fn auth(&self, user: &ObjectId) -> HeaderMap {
        let token = self.state.jwt.generate_token(user).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: &str,
    ) -> (StatusCode, Value) {
        let response = routes::dispatch(
            &self.state,
            &method,
            path,
            &headers,
            Bytes::from(body.to_string()),
        )
        .await;

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get_level(&self, user: &ObjectId) -> (StatusCode, Value) {
        self.call(Method::GET, "/level", self.auth(user), "").await
    }

    async fn ritual(&self, user: &ObjectId, kind: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/level/ritual/{}", kind),
            self.auth(user),
            "",
        )
        .await
    }

    async fn add_points(&self, user: &ObjectId, body: &str) -> (StatusCode, Value) {
        self.call(Method::POST, "/level/add-points", self.auth(user), body)
            .await
    }
}

#[tokio::test]
async fn test_health_reports_storage_and_mode() {
    let h = Harness::new().await;
    let (status, body) = h
        .call(Method::GET, "/health", HeaderMap::new(), "")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["mode"], "development");
}

#[tokio::test]
async fn test_preflight_and_cors() {
    let h = Harness::new().await;
    let response = routes::dispatch(
        &h.state,
        &Method::OPTIONS,
        "/level",
        &HeaderMap::new(),
        Bytes::new(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_missing_and_invalid_tokens_are_rejected() {
    let h = Harness::connected().await;

    let (status, body) = h.call(Method::GET, "/level", HeaderMap::new(), "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token, authorization denied");

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not.a.token"));
    let (status, body) = h.call(Method::GET, "/level", headers, "").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}

#[tokio::test]
async fn test_get_level_for_connected_pair() {
    let h = Harness::connected().await;
    let (status, body) = h.get_level(&h.bob).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["level"], 1);
    assert_eq!(body["points"], 50);
    assert_eq!(body["pointsToNextLevel"], 100);
    assert_eq!(body["user1"], h.alice.to_hex());
    assert_eq!(body["user2"], h.bob.to_hex());
    assert_eq!(body["dailyRituals"]["date"], "2026-10-01");
    assert_eq!(body["unlockedFeatures"], serde_json::json!([]));
}

#[tokio::test]
async fn test_get_level_errors() {
    let h = Harness::new().await;

    let (status, body) = h.get_level(&h.alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not connected to anyone");

    // Connected on paper but the record is gone
    h.store
        .set_connection(&h.alice, ConnectionStatus::Connected, Some(h.bob), None)
        .await
        .unwrap();
    let (status, body) = h.get_level(&h.alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Connection level not found");
}

#[tokio::test]
async fn test_rituals_pay_pair_and_capstone_bonuses() {
    let h = Harness::connected().await;

    let (status, body) = h.ritual(&h.alice, "morningCheckIn").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Ritual completed");
    assert_eq!(body["connectionLevel"]["dailyRituals"]["morningCheckIn"]["user1"], true);
    assert_eq!(body["connectionLevel"]["points"], 50);

    let (_, body) = h.ritual(&h.bob, "morningCheckIn").await;
    assert_eq!(body["connectionLevel"]["points"], 65);

    let (status, body) = h.ritual(&h.alice, "morningCheckIn").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Already completed this ritual today");

    for kind in ["afternoonCheckIn", "eveningGratitude", "emotionShare"] {
        h.ritual(&h.alice, kind).await;
        h.ritual(&h.bob, kind).await;
    }

    let (_, body) = h.get_level(&h.alice).await;
    assert_eq!(body["dailyRituals"]["allCompleted"], true);
    // 50 + 60 + 100 = 210: level 2 with 110
    assert_eq!(body["level"], 2);
    assert_eq!(body["points"], 110);
}

#[tokio::test]
async fn test_unknown_ritual_type_is_rejected() {
    let h = Harness::connected().await;
    let (status, body) = h.ritual(&h.alice, "nightCheckIn").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid ritual type");
}

#[tokio::test]
async fn test_unknown_ritual_without_record_is_not_found() {
    let h = Harness::new().await;
    h.store
        .set_connection(&h.alice, ConnectionStatus::Connected, Some(h.bob), None)
        .await
        .unwrap();

    let (status, body) = h.ritual(&h.alice, "nightCheckIn").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Connection level not found");
}

#[tokio::test]
async fn test_rituals_reset_on_a_new_day() {
    let h = Harness::connected().await;
    h.ritual(&h.alice, "emotionShare").await;

    h.clock.advance_days(1);
    let (status, body) = h.ritual(&h.alice, "emotionShare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connectionLevel"]["dailyRituals"]["date"], "2026-10-02");
    assert_eq!(body["connectionLevel"]["dailyRituals"]["emotionShare"]["user2"], false);
}

#[tokio::test]
async fn test_add_points_levels_up() {
    let h = Harness::connected().await;
    let (status, body) = h
        .add_points(&h.alice, r#"{"points": 762, "reason": "Anniversary"}"#)
        .await;

    // 50 + 762 = 812, exactly enough for level 5
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Points added");
    assert_eq!(body["leveledUp"], 5);
    assert_eq!(body["newPoints"], 0);
    assert_eq!(body["connectionLevel"]["unlockedFeatures"], serde_json::json!(["voice_messages"]));
    assert!(body["connectionLevel"]["lastLevelUp"].is_string());
}

#[tokio::test]
async fn test_add_points_validation() {
    let h = Harness::connected().await;

    for bad in [r#"{"points": 0}"#, r#"{"points": -3}"#, r#"{}"#, r#"{"points": "x"}"#] {
        let (status, body) = h.add_points(&h.alice, bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {}", bad);
        assert_eq!(body["message"], "Points must be positive");
    }

    let (status, _) = h.add_points(&h.alice, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h.add_points(&h.alice, r#"{"points": "5"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newPoints"], 55);
}

#[tokio::test]
async fn test_break_connection_loses_everything() {
    let h = Harness::connected().await;
    h.add_points(&h.alice, r#"{"points": 1000}"#).await;

    let (status, body) = h
        .call(Method::POST, "/api/connection/break", h.auth(&h.bob), "")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Connection broken successfully. All progress lost.");

    assert!(h.store.find_level(&h.alice, &h.bob).await.unwrap().is_none());
    let (status, _) = h.get_level(&h.alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .call(Method::POST, "/connection/break", h.auth(&h.alice), "")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are not connected to anyone");
}

#[tokio::test]
async fn test_message_streak_bonus_after_a_week() {
    let h = Harness::connected().await;

    for day in 0..7 {
        if day > 0 {
            h.clock.advance_days(1);
        }
        h.state
            .service
            .record_message(&h.alice, 1)
            .await
            .unwrap()
            .unwrap();
    }

    let (_, body) = h.get_level(&h.bob).await;
    assert_eq!(body["currentStreak"], 7);
    assert_eq!(body["longestStreak"], 7);
    // 50 + 10 (first message) + 100 (7-day streak) = 160: level 2 with 60
    assert_eq!(body["level"], 2);
    assert_eq!(body["points"], 60);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let h = Harness::new().await;
    let (status, body) = h
        .call(Method::GET, "/nowhere", HeaderMap::new(), "")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found");
}
