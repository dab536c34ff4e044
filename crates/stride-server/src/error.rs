use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stride_core::StrideError;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Carries an explicit 400 through the `anyhow::Error` chain.
#[derive(Debug)]
struct BadRequestError(String);

impl std::fmt::Display for BadRequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BadRequestError {}

/// Carries an explicit 401 through the `anyhow::Error` chain.
#[derive(Debug)]
struct UnauthorizedError(String);

impl std::fmt::Display for UnauthorizedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for UnauthorizedError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError {
    pub error: anyhow::Error,
    /// Include the full error chain in 500 bodies.
    pub expose_details: bool,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::from(BadRequestError(msg.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::from(UnauthorizedError(msg.into()))
    }

    pub fn with_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    fn status(&self) -> StatusCode {
        if self.error.downcast_ref::<BadRequestError>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        if self.error.downcast_ref::<UnauthorizedError>().is_some() {
            return StatusCode::UNAUTHORIZED;
        }
        match self.error.downcast_ref::<StrideError>() {
            Some(StrideError::EmptyQuery) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status != StatusCode::INTERNAL_SERVER_ERROR {
            let body = serde_json::json!({ "error": self.error.to_string() });
            return (status, axum::Json(body)).into_response();
        }

        tracing::error!(error = %format!("{:#}", self.error), "request failed");
        let mut body = serde_json::json!({
            "error": "Interní chyba serveru",
            "message": self.error.to_string(),
        });
        if self.expose_details {
            body["details"] = serde_json::Value::String(format!("{:?}", self.error));
        }
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            error: err.into(),
            expose_details: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_oracle::OracleError;

    #[test]
    fn empty_query_maps_to_400() {
        let resp = AppError::from(StrideError::EmptyQuery).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let resp = AppError::bad_request("query is required").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let resp = AppError::unauthorized("missing user").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn oracle_failure_maps_to_500() {
        let err = StrideError::Oracle(OracleError::EmptyCompletion);
        let resp = AppError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn entity_not_found_maps_to_500() {
        let err = StrideError::EntityNotFound {
            entity: "goal",
            id: "g9".into(),
        };
        let resp = AppError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn plain_anyhow_maps_to_500() {
        let resp = AppError::from(anyhow::anyhow!("boom")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn details_follow_flag() {
        let hidden = AppError::from(anyhow::anyhow!("boom"));
        assert!(!hidden.expose_details);
        let shown = AppError::from(anyhow::anyhow!("boom")).with_details(true);
        assert!(shown.expose_details);
    }
}
