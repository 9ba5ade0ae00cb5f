// src/api/handlers/verification.rs
use actix_multipart::Multipart;
use actix_web::{
    web::{self, Data},
    HttpResponse, Resource,
};
use serde::Serialize;
use tracing::info;

use crate::{
    api::multipart::{FormFields, UploadForm, UploadLimits},
    core::{
        identity::types::{MatchResult, VerificationRequest},
        services::verification::VerificationService,
    },
    utils::error::IdGateError,
};

const MISSING_FIELDS: &str = "Missing selfie, ID image, or user_id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub match_score: f64,
    pub approved: bool,
}

impl From<MatchResult> for MatchResponse {
    fn from(result: MatchResult) -> Self {
        Self {
            match_score: result.normalized_score,
            approved: result.approved,
        }
    }
}

const MATCH_FORM: FormFields = FormFields {
    files: &["selfie", "id_image"],
    texts: &["user_id"],
};

pub fn resource() -> Resource {
    web::resource("/match").route(web::post().to(face_match))
}

async fn face_match(
    service: Data<VerificationService>,
    limits: Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, IdGateError> {
    let mut form = UploadForm::collect(payload, **limits, MATCH_FORM).await?;

    let selfie = form.take_file("selfie");
    let id_image = form.take_file("id_image");
    let user_id = form.text("user_id").map(str::to_string);

    let (selfie, id_image, user_id) = match (selfie, id_image, user_id) {
        (Some(selfie), Some(id_image), Some(user_id)) => (selfie, id_image, user_id),
        _ => return Err(IdGateError::Validation(MISSING_FIELDS.into())),
    };

    let request = VerificationRequest::new(selfie, id_image, user_id)?;
    info!(user_id = %request.user_id, "Received face match request");

    let result = service.verify(request).await?;
    Ok(HttpResponse::Ok().json(MatchResponse::from(result)))
}
