//! HTTP server implementation
//!
//! hyper http1 with TokioIo. Bodies are read fully, up to
//! [`routes::MAX_BODY_SIZE`], and handed to [`routes::dispatch`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes;
use crate::services::LevelService;
use crate::types::PromittoError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub service: LevelService,
    pub jwt: JwtValidator,
    /// Backing store name reported by the health check
    pub storage: &'static str,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, service: LevelService, jwt: JwtValidator, storage: &'static str) -> Self {
        Self {
            args,
            service,
            jwt,
            storage,
            started_at: Instant::now(),
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), PromittoError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Promitto listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - dev JWT secret accepted");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    debug!("[{}] {} {}", addr, parts.method, path);

    let body = match Limited::new(body, routes::MAX_BODY_SIZE).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("[{}] Request body over {} bytes", addr, routes::MAX_BODY_SIZE);
            return Ok(to_boxed(body_error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            )));
        }
        Err(e) => {
            warn!("[{}] Failed to read request body: {}", addr, e);
            return Ok(to_boxed(body_error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            )));
        }
    };

    let response = routes::dispatch(&state, &parts.method, &path, &parts.headers, body).await;

    info!(
        "[{}] {} {} -> {}",
        addr,
        parts.method,
        path,
        response.status().as_u16()
    );

    Ok(to_boxed(response))
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn body_error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "message": message });

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_limited(len: usize) -> std::result::Result<Bytes, bool> {
        let body = Full::new(Bytes::from(vec![b' '; len]));
        Limited::new(body, routes::MAX_BODY_SIZE)
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| e.downcast_ref::<LengthLimitError>().is_some())
    }

    #[tokio::test]
    async fn test_body_within_limit_is_read() {
        let body = read_limited(routes::MAX_BODY_SIZE).await.unwrap();
        assert_eq!(body.len(), routes::MAX_BODY_SIZE);
    }

    #[tokio::test]
    async fn test_oversized_body_stops_at_limit() {
        assert_eq!(read_limited(routes::MAX_BODY_SIZE + 1).await, Err(true));
    }

    #[test]
    fn test_body_error_response_status() {
        let response = body_error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
