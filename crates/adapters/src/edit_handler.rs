//! Edit request handler
//!
//! One request, start to finish: method check, origin check, body transfer,
//! then the blocking edit pipeline on tokio's blocking pool. Failures never
//! leave this module; each one becomes a status code.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use editserver_protocol::{EditError, OriginPolicy, STATUS_MESSAGE};
use editserver_runtime::EditPipeline;
use tracing::{debug, error, warn};

/// Shared, read-only state for every request.
pub struct EditState {
    pub pipeline: EditPipeline,
    pub origin: OriginPolicy,
    pub max_body_bytes: usize,
}

/// Axum handler for every method and path.
pub async fn handle_edit(
    State(state): State<Arc<EditState>>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if method != Method::POST {
        return (StatusCode::OK, STATUS_MESSAGE).into_response();
    }

    let origin = headers.get(header::ORIGIN).map(HeaderValue::as_bytes);
    if let Err(err) = state.origin.authorize(origin) {
        warn!("Unauthorised: {}", err);
        return (StatusCode::UNAUTHORIZED, format!("Unauthorized: {}\n", err)).into_response();
    }

    let declared = match declared_length(&headers) {
        Ok(declared) => declared,
        Err(value) => {
            error!("Invalid Content-Length header: {:?}", value);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Some(declared) = declared {
        if declared > state.max_body_bytes as u64 {
            warn!(declared, limit = state.max_body_bytes, "Request body too large");
            return edit_error_response(&EditError::Transfer {
                declared,
                written: 0,
            });
        }
    }

    // Fails on stream errors and on bodies over the limit alike.
    let content = match body::to_bytes(body, state.max_body_bytes).await {
        Ok(content) => content,
        Err(err) => {
            warn!(limit = state.max_body_bytes, "Unable to read request body: {}", err);
            return edit_error_response(&EditError::Transfer {
                declared: declared.unwrap_or(0),
                written: 0,
            });
        }
    };
    let declared = declared.unwrap_or(content.len() as u64);
    debug!(declared, received = content.len(), "Received edit request");

    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.run(&content, declared)).await;

    match result {
        Ok(Ok(edited)) => edited.into_response(),
        Ok(Err(err)) => edit_error_response(&err),
        Err(join_err) => {
            error!("Edit task failed: {}", join_err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Parse `Content-Length`, returning the raw value when it is not a number.
fn declared_length(headers: &HeaderMap) -> Result<Option<u64>, HeaderValue> {
    let Some(value) = headers.get(header::CONTENT_LENGTH) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Some)
        .ok_or_else(|| value.clone())
}

fn edit_error_response(err: &EditError) -> Response {
    error!(kind = err.kind(), "{}", err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
