use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::payments::PaymentError;
use crate::uploads::UploadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Unauthorized")]
    Forbidden,

    #[error("Todo not found")]
    NotFound,

    #[error("No files uploaded")]
    MissingUpload,

    #[error("Invalid file type")]
    UnsupportedFileType(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Username already exists")]
    Conflict,

    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    #[error("Failed to store uploaded file")]
    Upload(std::io::Error),

    #[error("{0}")]
    Payment(#[from] PaymentError),

    #[error("Internal server error")]
    Internal(String),
}

impl From<UploadError> for ApiError {
    fn from(e: UploadError) -> Self {
        match e {
            UploadError::UnsupportedFileType(name) => ApiError::UnsupportedFileType(name),
            UploadError::Io(e) => ApiError::Upload(e),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MissingUpload
            | ApiError::UnsupportedFileType(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Upload(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => tracing::error!(error = ?e, "database failure"),
            ApiError::Upload(e) => tracing::error!(error = ?e, "upload storage failure"),
            ApiError::Internal(detail) => tracing::error!(detail = %detail, "internal failure"),
            ApiError::Payment(e) => tracing::error!(error = %e, "payment provider failure"),
            ApiError::UnsupportedFileType(name) => {
                tracing::warn!(filename = %name, "rejected upload")
            }
            _ => {}
        }

        let body = serde_json::json!({ "message": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_expected_statuses() {
        assert_eq!(ApiError::Unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::MissingUpload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::UnsupportedFileType("a.exe".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Conflict.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn infrastructure_errors_are_distinct_from_business_errors() {
        assert_eq!(
            ApiError::Database(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Payment(PaymentError::Api {
                status: 400,
                message: "No such currency".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
