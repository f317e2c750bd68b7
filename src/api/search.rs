use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::SearchError;
use crate::models::{ErrorResponse, MessageResponse, SearchRequest};
use crate::search::pipeline::{run_search, SearchOutcome};
use crate::state::AppState;

/// Response headers carrying the hydration counts alongside the result array.
pub const RESULTS_REQUESTED_HEADER: &str = "x-results-requested";
pub const RESULTS_HYDRATED_HEADER: &str = "x-results-hydrated";

/// POST /api/search - Embed the query, find the 5 nearest hostels and
/// return their details.
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match run_search(&state, &req.query).await {
        Ok(SearchOutcome::NoMatches) => Json(MessageResponse::no_matches()).into_response(),
        Ok(SearchOutcome::Hits { hits, report }) => {
            let mut response = Json(hits).into_response();
            let headers = response.headers_mut();
            headers.insert(RESULTS_REQUESTED_HEADER, HeaderValue::from(report.requested));
            headers.insert(RESULTS_HYDRATED_HEADER, HeaderValue::from(report.hydrated));
            response
        }
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error_response(status, self.to_string())
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
