//! Lenient JSON body extractor.

use crate::errors::AppError;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, StatusCode},
};
use serde_json::{Map, Value};

/// Request body as a JSON object.
///
/// Bodies without a JSON content type, empty bodies and arrays all read as an empty
/// object. Syntax errors and bare scalars are rejected as `AppError::MalformedJson`,
/// bodies over the configured limit as `AppError::PayloadTooLarge`.
#[derive(Debug, Default)]
pub struct JsonBody(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(&req) {
            return Ok(JsonBody::default());
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!(%rejection, "Failed to buffer request body");
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                AppError::MalformedJson
            }
        })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonBody::default());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(JsonBody(map)),
            Ok(Value::Array(_)) => Ok(JsonBody::default()),
            Ok(_) => Err(AppError::MalformedJson),
            Err(e) => {
                tracing::debug!(error = %e, "Rejecting malformed JSON body");
                Err(AppError::MalformedJson)
            }
        }
    }
}

fn has_json_content_type(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false)
}
