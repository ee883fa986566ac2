use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::store::Error;

/// Converts operation failures into HTTP responses. Store details are
/// logged but never leak into the body.
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    Unauthorized,
    ForbiddenOrigin,
    InvalidAction,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(Error::MissingInput(what)) => (
                StatusCode::BAD_REQUEST,
                format!("missing required input: {what}"),
            ),
            ApiError::Core(Error::Store(detail)) => {
                tracing::error!("store failure: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::ForbiddenOrigin => (
                StatusCode::FORBIDDEN,
                "forbidden: unauthorized origin".to_string(),
            ),
            ApiError::InvalidAction => (StatusCode::BAD_REQUEST, "invalid action".to_string()),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_the_documented_status_codes() {
        let cases = [
            (ApiError::Core(Error::MissingInput("url")), 400),
            (ApiError::Core(Error::Store("boom".into())), 500),
            (ApiError::Unauthorized, 401),
            (ApiError::ForbiddenOrigin, 403),
            (ApiError::InvalidAction, 400),
        ];
        for (err, code) in cases {
            assert_eq!(err.into_response().status().as_u16(), code);
        }
    }
}
