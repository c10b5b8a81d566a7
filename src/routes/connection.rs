//! Connection lifecycle endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{HeaderMap, Response, StatusCode};

use super::{error_response, message_response};
use crate::auth::authenticate;
use crate::server::AppState;

/// POST /connection/break
///
/// Irreversible: the pair's record is deleted and both users are reset.
pub async fn handle_break_connection(
    state: &AppState,
    headers: &HeaderMap,
) -> Response<Full<Bytes>> {
    let result = async {
        let user = authenticate(&state.jwt, headers)?;
        state.service.break_connection(&user).await
    }
    .await;

    match result {
        Ok(()) => message_response(
            StatusCode::OK,
            "Connection broken successfully. All progress lost.",
        ),
        Err(e) => error_response(&e),
    }
}
