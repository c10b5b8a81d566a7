//! HTTP routes for Promitto

pub mod connection;
pub mod health;
pub mod level;

pub use connection::handle_break_connection;
pub use health::health_check;
pub use level::{handle_add_points, handle_complete_ritual, handle_get_level, LevelView};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN};
use hyper::{HeaderMap, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::server::AppState;
use crate::types::PromittoError;

/// Maximum accepted request body (10 KiB)
pub const MAX_BODY_SIZE: usize = 10 * 1024;

const RITUAL_PREFIX: &str = "/level/ritual/";

/// Route a request that has already been read into memory.
///
/// Paths may carry an `/api` prefix. Every response gets the CORS origin
/// header.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let path = path
        .strip_prefix("/api")
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path);
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let response = match (method, path) {
        (&Method::OPTIONS, _) => preflight_response(),

        (&Method::GET, "/health") => health_check(state),

        (&Method::GET, "/level") => handle_get_level(state, headers).await,

        (&Method::POST, "/level/add-points") => handle_add_points(state, headers, &body).await,

        (&Method::POST, p) if p.starts_with(RITUAL_PREFIX) => {
            handle_complete_ritual(state, headers, &p[RITUAL_PREFIX.len()..]).await
        }

        (&Method::POST, "/connection/break") => handle_break_connection(state, headers).await,

        _ => message_response(StatusCode::NOT_FOUND, "Not found"),
    };

    with_cors(response, &state.args.frontend_url)
}

/// Serialize `body` as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap(),
        Err(e) => error_response(&PromittoError::Internal(format!(
            "Response serialization failed: {}",
            e
        ))),
    }
}

/// `{ "message": ... }` response
pub fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "message": message }))
}

/// Map an error to its status and client-facing message, logging the detail
pub fn error_response(err: &PromittoError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if err.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(status = status.as_u16(), error = %err, "Request rejected");
    }
    message_response(status, &err.public_message())
}

/// Parse a JSON request body, enforcing [`MAX_BODY_SIZE`].
///
/// An empty body parses as `{}`.
pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, PromittoError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(PromittoError::BadRequest("Request body too large".into()));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Headers", "Authorization, Content-Type")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn with_cors(mut response: Response<Full<Bytes>>, origin: &str) -> Response<Full<Bytes>> {
    let origin = HeaderValue::from_str(origin).unwrap_or(HeaderValue::from_static("*"));
    response
        .headers_mut()
        .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    response
}
