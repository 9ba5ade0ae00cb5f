// src/api/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use tracing::error;

use crate::utils::error::IdGateError;

impl ResponseError for IdGateError {
    fn status_code(&self) -> StatusCode {
        if self.is_internal() {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!("Internal error while handling request: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}
