use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use woundrx_core::errors::{DomainError, InterfaceError};
use woundrx_core::service::RecommendationRequest;

use crate::bootstrap::SharedService;

#[derive(Clone)]
pub struct RecommendationState {
    service: SharedService,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

impl From<&InterfaceError> for ErrorBody {
    fn from(error: &InterfaceError) -> Self {
        Self {
            error: error.user_message().to_string(),
            detail: error.to_string(),
            correlation_id: error.correlation_id().to_string(),
        }
    }
}

pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/recommendations", post(recommend))
        .with_state(RecommendationState { service })
}

pub async fn recommend(
    State(state): State<RecommendationState>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let error = DomainError::InvalidRequest(rejection.body_text())
                .into_interface(Uuid::new_v4().to_string());
            warn!(
                event_name = "http.recommendations.rejected",
                correlation_id = %error.correlation_id(),
                error = %error,
                "recommendation request body rejected"
            );
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::from(&error))).into_response();
        }
    };

    let mut context = request.into_context();
    if context.product_request_id.is_none() {
        context.product_request_id = Some(Uuid::new_v4().to_string());
    }
    info!(
        event_name = "http.recommendations.received",
        correlation_id = %context.correlation_id(),
        wound_type = %context.wound_type,
        "recommendation request received"
    );

    let response = state.service.recommend(&context).await;
    let status = if response.success { StatusCode::OK } else { StatusCode::UNPROCESSABLE_ENTITY };
    (status, Json(response)).into_response()
}
