// src/api/handlers/document.rs
use actix_multipart::Multipart;
use actix_web::{
    web::{self, Data},
    HttpResponse, Resource,
};

use crate::{
    api::multipart::{FormFields, UploadForm, UploadLimits},
    core::services::document::DocumentService,
    utils::error::IdGateError,
};

const OCR_FORM: FormFields = FormFields {
    files: &["id_front", "id_back"],
    texts: &[],
};

pub fn resource() -> Resource {
    web::resource("/ocr").route(web::post().to(extract_document))
}

async fn extract_document(
    service: Data<DocumentService>,
    limits: Data<UploadLimits>,
    payload: Multipart,
) -> Result<HttpResponse, IdGateError> {
    let mut form = UploadForm::collect(payload, **limits, OCR_FORM).await?;

    let (front, back) = match (form.take_file("id_front"), form.take_file("id_back")) {
        (Some(front), Some(back)) => (front, back),
        _ => return Err(IdGateError::Validation("Missing ID images".into())),
    };

    let outcome = service.extract_document_data(front, back).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
