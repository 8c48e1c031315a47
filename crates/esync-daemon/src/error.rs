use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use esync_reconcile::ScanError;
use esync_store::StoreError;
use esync_trade::{TradeCommitError, ValidationError, ValidationFailure};
use thiserror::Error;

use crate::api_types::ErrorBody;

/// Error returned by every fallible handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Insufficient(ValidationFailure),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("upstream error: {0}")]
    BadGateway(String),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(m) => AppError::NotFound(m),
            StoreError::Rejected(m) => AppError::Conflict(m),
            other => AppError::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        AppError::ServiceUnavailable(e.to_string())
    }
}

impl From<TradeCommitError> for AppError {
    fn from(e: TradeCommitError) -> Self {
        match e {
            TradeCommitError::Invalid(m) => AppError::BadRequest(m),
            TradeCommitError::Store(s) => s.into(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Insufficient(f) => AppError::Insufficient(f),
            ValidationError::OrderNotFound(id) => AppError::NotFound(format!("order {id}")),
            e @ ValidationError::OrderNotActive { .. } => AppError::Conflict(e.to_string()),
            e @ ValidationError::NonPositiveAmount(_) => AppError::BadRequest(e.to_string()),
            ValidationError::Ledger(l) => AppError::ServiceUnavailable(l.to_string()),
            ValidationError::Store(s) => s.into(),
            e @ ValidationError::InvalidAmount(_) => AppError::BadGateway(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Insufficient(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_AMOUNT"),
            AppError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            AppError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let (available, required) = match &self {
            AppError::Insufficient(f) => (Some(f.available), Some(f.required)),
            _ => (None, None),
        };
        let body = ErrorBody {
            error: code.to_string(),
            message: self.to_string(),
            available,
            required,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        let s = |e: StoreError| AppError::from(e).into_response().status();
        assert_eq!(s(StoreError::NotFound("o".into())), StatusCode::NOT_FOUND);
        assert_eq!(s(StoreError::Rejected("dup".into())), StatusCode::CONFLICT);
        assert_eq!(
            s(StoreError::PermissionDenied("role".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn insufficient_is_unprocessable() {
        let e = AppError::from(ValidationError::Insufficient(ValidationFailure {
            available: Decimal::ONE,
            required: Decimal::TWO,
        }));
        assert_eq!(e.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_hides_detail() {
        let e = AppError::from(anyhow::anyhow!("secret connection string"));
        assert_eq!(e.to_string(), "internal server error");
    }
}
