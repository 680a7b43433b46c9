use anyhow::{Error, anyhow};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application error carrying an HTTP status and an underlying cause.
///
/// Every error raised at the service layer is converted to the standard
/// JSON envelope `{timestamp, status, error, message}` in exactly one
/// place, the [`IntoResponse`] impl below.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow!("{}", message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow!("{}", message.into()))
    }

    /// Persistence-layer constraint violation surfacing after a race past
    /// an application-level check. Deliberately generic: the message does
    /// not reveal which constraint fired.
    pub fn conflict() -> Self {
        Self::new(
            StatusCode::CONFLICT,
            anyhow!("The request conflicts with an existing record"),
        )
    }

    pub fn bad_gateway<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_GATEWAY, err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "status": self.status.as_u16(),
            "error": self.status.canonical_reason().unwrap_or("Error"),
            "message": self.error.to_string(),
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_expected_status() {
        assert_eq!(
            AppError::not_found(anyhow!("Role not found")).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::bad_request(anyhow!("bad")).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::unauthorized("Invalid Credentials").status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::forbidden("Access denied").status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::conflict().status, StatusCode::CONFLICT);
        assert_eq!(
            AppError::bad_gateway(anyhow!("smtp refused")).status,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn blanket_conversion_is_internal() {
        let err: AppError = anyhow!("boom").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_message_is_generic() {
        let err = AppError::conflict();
        let message = err.error.to_string();
        assert!(!message.contains("unique"));
        assert!(!message.contains("constraint"));
    }
}
