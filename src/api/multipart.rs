// src/api/multipart.rs
use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use futures::StreamExt;
use tracing::debug;

use crate::{
    core::identity::types::ImageUpload,
    utils::error::{IdGateError, Result},
};

/// Upload limits shared with the handlers through app data.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_upload_bytes: usize,
}

/// The parts a handler reads. Anything else in the form is drained unread.
#[derive(Debug, Clone, Copy)]
pub struct FormFields {
    pub files: &'static [&'static str],
    pub texts: &'static [&'static str],
}

impl FormFields {
    pub fn expects(&self, name: &str) -> bool {
        self.files.contains(&name) || self.texts.contains(&name)
    }

    /// Total bytes a form may buffer: one full part per expected name.
    pub fn max_form_bytes(&self, limits: UploadLimits) -> usize {
        limits
            .max_upload_bytes
            .saturating_mul(self.files.len() + self.texts.len())
    }
}

/// A fully buffered multipart form. File parts (those with a filename) land
/// in `files`, everything else in `fields`.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, ImageUpload>,
    fields: HashMap<String, String>,
}

fn malformed(e: impl std::fmt::Display) -> IdGateError {
    IdGateError::Validation(format!("Malformed multipart body: {}", e))
}

async fn drain(field: &mut Field) -> Result<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(malformed)?;
    }
    Ok(())
}

impl UploadForm {
    pub async fn collect(
        mut payload: Multipart,
        limits: UploadLimits,
        expected: FormFields,
    ) -> Result<Self> {
        let max_form_bytes = expected.max_form_bytes(limits);
        let mut form = UploadForm::default();
        let mut buffered = 0usize;

        while let Some(item) = payload.next().await {
            let mut field = item.map_err(malformed)?;

            let disposition = field.content_disposition();
            let name = match disposition.get_name() {
                Some(name) if expected.expects(name) => name.to_string(),
                other => {
                    debug!(field = ?other, "Ignoring unexpected form part");
                    drain(&mut field).await?;
                    continue;
                }
            };
            let filename = disposition.get_filename().map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.essence_str().to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk.map_err(malformed)?;
                if bytes.len() + chunk.len() > limits.max_upload_bytes {
                    return Err(IdGateError::Validation(format!(
                        "Field {} exceeds the {} byte upload limit",
                        name, limits.max_upload_bytes
                    )));
                }
                if buffered + chunk.len() > max_form_bytes {
                    return Err(IdGateError::Validation(format!(
                        "Form exceeds the {} byte upload limit",
                        max_form_bytes
                    )));
                }
                buffered += chunk.len();
                bytes.extend_from_slice(&chunk);
            }

            if filename.is_some() {
                if let Some(content_type) = content_type.as_deref() {
                    if !content_type.starts_with("image/") {
                        return Err(IdGateError::Validation("Only images allowed".into()));
                    }
                }
                debug!(field = %name, size = bytes.len(), "Received upload");
                form.files.insert(
                    name,
                    ImageUpload {
                        filename,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let text = String::from_utf8(bytes)
                    .map_err(|_| IdGateError::Validation(format!("Field {} is not valid UTF-8", name)))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Option<ImageUpload> {
        self.files.remove(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
