//! Client-facing error payload.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Serialize, Serializer};

/// Normalized error: an HTTP status and the messages explaining it, in the
/// order they were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    #[serde(serialize_with = "serialize_status")]
    status: StatusCode,
    messages: Vec<String>,
}

fn serialize_status<S: Serializer>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(status.as_u16())
}

impl ErrorResponse {
    /// Start a response with no messages. The classifier adds the failure's
    /// description if none is pushed.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            messages: Vec::new(),
        }
    }

    pub fn single(status: StatusCode, message: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.push(message);
        response
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_status_as_number() {
        let mut response = ErrorResponse::single(StatusCode::BAD_REQUEST, "name: too short");
        response.push("name: too short");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": 400,
                "messages": ["name: too short", "name: too short"],
            })
        );
    }
}
