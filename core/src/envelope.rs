//! The `{data, errors, messages, time}` wrapper every endpoint responds with.
//!
//! # Design
//! A body is first parsed with the payload left as raw JSON, so that
//! application errors are reported even when `data` would not fit the
//! expected type. Only a clean envelope has its payload deserialized into
//! `T`; the same code serves list, scalar and object payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ClassifiedError, DecodeFault};
use crate::http::{HttpRequest, HttpResponse};

/// Uniform response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub errors: Vec<ApiError>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub messages: Vec<ApiMessage>,
    #[serde(default)]
    pub time: String,
}

/// Application-level rejection carried inside a 2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: i32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: String,
}

/// Informational note; never affects classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: String,
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode a success-status response into the payload of `Envelope<T>`.
///
/// Consumes the response; its body stream is released on every return path.
pub fn decode_envelope<T: DeserializeOwned>(
    request: HttpRequest,
    response: HttpResponse,
) -> Result<T, ClassifiedError> {
    let (meta, body) = response.into_parts();

    let text = match body.read_to_string() {
        Ok(text) => text,
        Err(err) => {
            warn!(%request, error = %err, "failed to read response body");
            return Err(ClassifiedError::DecodeFailure {
                request,
                response: meta,
                fault: DecodeFault::Read(err),
            });
        }
    };

    let envelope: Envelope<Value> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(%request, error = %err, "response body is not an envelope");
            return Err(ClassifiedError::DecodeFailure {
                request,
                response: meta,
                fault: DecodeFault::Parse(err),
            });
        }
    };

    if !envelope.errors.is_empty() {
        let keys: Vec<&str> = envelope.errors.iter().map(|e| e.key.as_str()).collect();
        warn!(%request, ?keys, "api rejected request");
        return Err(ClassifiedError::ApplicationError {
            request,
            errors: envelope.errors,
        });
    }

    let Some(data) = envelope.data else {
        warn!(%request, "envelope carried no data");
        return Err(ClassifiedError::EmptyPayloadFailure {
            request,
            response: meta,
        });
    };

    serde_json::from_value(data).map_err(|err| {
        warn!(%request, error = %err, "envelope data has an unexpected shape");
        ClassifiedError::DecodeFailure {
            request,
            response: meta,
            fault: DecodeFault::Parse(err),
        }
    })
}
