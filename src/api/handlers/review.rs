// src/api/handlers/review.rs
use actix_multipart::Multipart;
use actix_web::{
    web::{self, Data},
    HttpResponse, Resource,
};
use tracing::info;

use crate::{
    api::multipart::{FormFields, UploadForm, UploadLimits},
    core::services::review::{KycSubmission, ReviewService},
    utils::error::IdGateError,
};

const KYC_FORM: FormFields = FormFields {
    files: &["id_front", "id_back", "selfie"],
    texts: &["user_id"],
};

pub fn resource() -> Resource {
    web::resource("/kyc").route(web::post().to(submit_kyc))
}

async fn submit_kyc(
    service: Data<ReviewService>,
    limits: Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, IdGateError> {
    let mut form = UploadForm::collect(payload, **limits, KYC_FORM).await?;

    let submission = match (
        form.take_file("id_front"),
        form.take_file("id_back"),
        form.take_file("selfie"),
        form.text("user_id"),
    ) {
        (Some(id_front), Some(id_back), Some(selfie), Some(user_id)) => KycSubmission {
            id_front,
            id_back,
            selfie,
            user_id: user_id.to_string(),
        },
        _ => {
            return Err(IdGateError::Validation(
                "All three images (front, back, selfie) and user_id are required".into(),
            ))
        }
    };

    info!(user_id = %submission.user_id, "Received KYC submission");
    let decision = service.review(submission).await?;
    Ok(HttpResponse::Ok().json(decision))
}
