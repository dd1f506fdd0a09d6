use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Handler error rendered as `{ "error": "<message>" }`.
#[derive(Debug)]
pub enum ApiError {
    Domain(rf_domain::Error),
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        use rf_domain::Error;
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Domain(e) => match e {
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::NotPermitted { .. } => StatusCode::CONFLICT,
                Error::InvalidAddress(_) => StatusCode::BAD_REQUEST,
                Error::Unreachable { .. } => StatusCode::BAD_GATEWAY,
                Error::Config(_)
                | Error::Io(_)
                | Error::Json(_)
                | Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<rf_domain::Error> for ApiError {
    fn from(e: rf_domain::Error) -> Self {
        Self::Domain(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(e) => e.fmt(f),
            Self::BadRequest(m) => f.write_str(m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
