use std::{collections::BTreeMap, time::Duration};

use axum::{
    extract::{Path, Request},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body of `GET /headers`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EchoedHeaders {
    pub headers: BTreeMap<String, String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/status/{code}", get(status))
        .route("/echo", post(echo))
        .route("/headers", get(headers))
        .route("/delay/{ms}", get(delay))
        .route("/redirect/{n}", get(redirect))
        .route("/bytes/{n}", get(bytes))
        .layer(middleware::from_fn(stamp_request_id))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn stamp_request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    tracing::debug!(%id, method = %request.method(), uri = %request.uri(), "request");
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn status(Path(code): Path<u16>) -> Result<StatusCode, StatusCode> {
    StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn echo(headers: HeaderMap, body: axum::body::Bytes) -> impl IntoResponse {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    ([(header::CONTENT_TYPE, content_type)], body)
}

async fn headers(headers: HeaderMap) -> Json<EchoedHeaders> {
    let headers = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    Json(EchoedHeaders { headers })
}

async fn delay(Path(ms): Path<u64>) -> String {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("slept {ms}ms")
}

/// `307` to `/redirect/{n - 1}`; `/redirect/0` answers `200`.
async fn redirect(Path(n): Path<u32>, headers: HeaderMap) -> Response {
    if n == 0 {
        return "redirected".into_response();
    }
    let next = format!("/redirect/{}", n - 1);
    let location = match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{next}"),
        None => next,
    };
    Redirect::temporary(&location).into_response()
}

async fn bytes(Path(n): Path<usize>) -> Result<Vec<u8>, StatusCode> {
    if n > MAX_BYTES {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }
    Ok(vec![b'x'; n])
}

const MAX_BYTES: usize = 64 * 1024 * 1024;
