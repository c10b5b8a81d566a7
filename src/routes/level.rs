//! Connection level endpoints
//!
//! - `GET /level` returns the pair's record
//! - `POST /level/ritual/{type}` completes a daily ritual
//! - `POST /level/add-points` awards points by hand

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error_response, json_response, parse_json_body};
use crate::auth::authenticate;
use crate::level::{ConnectionLevel, DailyRituals, Feature, Milestone};
use crate::server::AppState;
use crate::types::{PromittoError, Result};

/// Client view of a connection level record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user1: String,
    pub user2: String,
    pub level: u32,
    pub points: i64,
    pub points_to_next_level: i64,
    pub milestones: &'a [Milestone],
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub daily_rituals: &'a DailyRituals,
    pub unlocked_features: &'a [Feature],
    pub total_messages: u64,
    pub quality_conversations: u64,
    pub emotions_shared: u64,
    pub activities_completed: u64,
    pub connected_at: DateTime<Utc>,
    pub last_level_up: Option<DateTime<Utc>>,
}

impl<'a> From<&'a ConnectionLevel> for LevelView<'a> {
    fn from(record: &'a ConnectionLevel) -> Self {
        Self {
            id: record._id.map(|id| id.to_hex()),
            user1: record.user1.to_hex(),
            user2: record.user2.to_hex(),
            level: record.level,
            points: record.points,
            points_to_next_level: record.points_to_next_level,
            milestones: &record.milestones,
            current_streak: record.current_streak,
            longest_streak: record.longest_streak,
            last_activity_date: record.last_activity_date,
            daily_rituals: &record.daily_rituals,
            unlocked_features: &record.unlocked_features,
            total_messages: record.total_messages,
            quality_conversations: record.quality_conversations,
            emotions_shared: record.emotions_shared,
            activities_completed: record.activities_completed,
            connected_at: record.connected_at,
            last_level_up: record.last_level_up,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RitualResponse<'a> {
    message: &'static str,
    connection_level: LevelView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddPointsResponse<'a> {
    message: &'static str,
    leveled_up: u32,
    new_points: i64,
    connection_level: LevelView<'a>,
}

/// Raw add-points body; validated by hand so numeric strings are accepted
#[derive(Debug, Deserialize)]
struct AddPointsRequest {
    #[serde(default)]
    points: Option<Value>,
    #[serde(default)]
    reason: Option<Value>,
}

impl AddPointsRequest {
    fn points(&self) -> Result<i64> {
        let points = match &self.points {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        points
            .filter(|p| *p >= 1)
            .ok_or_else(|| PromittoError::Validation("Points must be positive".into()))
    }

    fn reason(&self) -> Result<Option<&str>> {
        match &self.reason {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(PromittoError::Validation("Reason must be a string".into())),
        }
    }
}

/// GET /level
pub async fn handle_get_level(state: &AppState, headers: &HeaderMap) -> Response<Full<Bytes>> {
    let result = async {
        let user = authenticate(&state.jwt, headers)?;
        state.service.current_level(&user).await
    }
    .await;

    match result {
        Ok(record) => json_response(StatusCode::OK, &LevelView::from(&record)),
        Err(e) => error_response(&e),
    }
}

/// POST /level/ritual/{type}
pub async fn handle_complete_ritual(
    state: &AppState,
    headers: &HeaderMap,
    ritual: &str,
) -> Response<Full<Bytes>> {
    let result = async {
        let user = authenticate(&state.jwt, headers)?;
        state.service.complete_ritual(&user, ritual).await
    }
    .await;

    match result {
        Ok((_, record)) => json_response(
            StatusCode::OK,
            &RitualResponse {
                message: "Ritual completed",
                connection_level: LevelView::from(&record),
            },
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /level/add-points
pub async fn handle_add_points(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response<Full<Bytes>> {
    let result = async {
        let user = authenticate(&state.jwt, headers)?;
        let request: AddPointsRequest = parse_json_body(body)?;
        let points = request.points()?;
        let reason = request.reason()?;
        state.service.add_points(&user, points, reason).await
    }
    .await;

    match result {
        Ok((outcome, record)) => json_response(
            StatusCode::OK,
            &AddPointsResponse {
                message: "Points added",
                leveled_up: outcome.leveled_up,
                new_points: outcome.new_points,
                connection_level: LevelView::from(&record),
            },
        ),
        Err(e) => error_response(&e),
    }
}
