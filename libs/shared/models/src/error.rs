use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl AppError {
    /// Classify a failed remote response by HTTP status.
    ///
    /// PostgREST reports failures as `{"message": ..., "details": ..., "hint": ...}`;
    /// when the body has that shape only the message is kept so it can be shown to a user.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_message(body);

        let error = match status {
            401 | 403 => AppError::Auth(message),
            404 => AppError::NotFound(message),
            400 | 422 => AppError::BadRequest(message),
            409 => AppError::Conflict(message),
            _ => AppError::ExternalService(message),
        };

        tracing::error!("Remote call failed ({}): {}", status, error);
        error
    }

    /// Human-readable text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalService(msg)
            | AppError::Decode(msg) => msg,
        }
    }
}

fn extract_message(body: &str) -> String {
    let trimmed = body.trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => map
            .get("message")
            .or_else(|| map.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| trimmed.to_string()),
        _ if trimmed.is_empty() => "empty response body".to_string(),
        _ => trimmed.to_string(),
    }
}
