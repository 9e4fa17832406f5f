use api_types::{ErrorBody, InsufficientFundsBody};
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod fees;
mod gigs;
mod orders;
mod principal;
mod server;
mod wallet;
mod webhooks;

pub enum ServerError {
    Engine(EngineError),
    /// Malformed request the engine never saw.
    Generic(String),
    /// Failure that must surface as a 500, message already logged.
    Internal(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
        EngineError::InvalidStateTransition(_) => StatusCode::CONFLICT,
        EngineError::Concurrency(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::Gateway(_) => StatusCode::BAD_GATEWAY,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(EngineError::InsufficientFunds {
                required,
                available,
                shortfall,
            }) => {
                let body = InsufficientFundsBody {
                    error: format!(
                        "insufficient funds: required {required}, available {available}"
                    ),
                    required_minor: required.minor(),
                    available_minor: available.minor(),
                    shortfall_minor: shortfall.minor(),
                };
                return (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response();
            }
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn engine_validation_maps_to_422() {
        assert_eq!(
            status_of(EngineError::Validation("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn engine_not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn insufficient_funds_maps_to_402() {
        assert_eq!(
            status_of(EngineError::insufficient(2_500, 1_000)),
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[test]
    fn engine_unauthorized_maps_to_403() {
        assert_eq!(
            status_of(EngineError::Unauthorized("x".to_string())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn invalid_transition_maps_to_409() {
        assert_eq!(
            status_of(EngineError::InvalidStateTransition("x".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn concurrency_maps_to_503() {
        assert_eq!(
            status_of(EngineError::Concurrency("x".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn gateway_maps_to_502() {
        assert_eq!(
            status_of(EngineError::Gateway("x".to_string())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn database_maps_to_500() {
        assert_eq!(
            status_of(EngineError::Database(sea_orm::DbErr::Custom("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
