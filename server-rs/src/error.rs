use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use booking_engine::BookingError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error(transparent)]
    Booking(#[from] BookingError),
}

fn booking_status(e: &BookingError) -> StatusCode {
    match e {
        BookingError::InvalidUnit(_)
        | BookingError::InvalidPlayerCount(_)
        | BookingError::InvalidDuration(_)
        | BookingError::DuplicateUnit(_)
        | BookingError::UnknownSlot(_)
        | BookingError::NoDeviceSelected
        | BookingError::CrossesMidnight(_) => StatusCode::BAD_REQUEST,
        BookingError::SlotFull(_)
        | BookingError::StaleAvailability { .. }
        | BookingError::CapacityExceeded { .. }
        | BookingError::InvalidTransition { .. }
        | BookingError::SubmissionInFlight
        | BookingError::NothingToRetry(_) => StatusCode::CONFLICT,
        BookingError::InvalidPromoCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, device) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
                None,
            ),
            AppError::Booking(e) => {
                let status = booking_status(e);
                if status.is_server_error() {
                    tracing::error!("Booking store error: {e}");
                }
                (status, e.to_string(), e.device())
            }
        };

        let body = match device {
            Some(device) => json!({ "error": message, "device": device }),
            None => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
