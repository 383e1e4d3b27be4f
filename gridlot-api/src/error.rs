use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gridlot_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Core(CoreError),
    Internal(anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Core(err) => {
                let status = match &err {
                    CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                    CoreError::TierClosed(_)
                    | CoreError::SlotConflict
                    | CoreError::DuplicateOffer
                    | CoreError::BookingNotActive
                    | CoreError::AlreadyResolved => StatusCode::CONFLICT,
                    CoreError::Unauthorized => StatusCode::FORBIDDEN,
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::UpstreamPayment(_) => StatusCode::BAD_GATEWAY,
                    CoreError::Store(msg) => {
                        tracing::error!("storage failure: {}", msg);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "internal error" })),
                        )
                            .into_response();
                    }
                };
                (status, err.to_string())
            }
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
