//! Multipart form reading for the endpoints that take an image.

use std::collections::HashMap;

use axum::extract::Multipart;

use factha_infra::storage::image_content_type;

use crate::app::errors::ApiError;

/// An accepted image part.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Text fields plus at most one image, keyed by form field name.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl FormData {
    /// Drain `multipart`. Only the part named `file_field` may carry an image;
    /// an empty file part counts as no file.
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == file_field {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                let content_type = image_content_type(declared.as_deref(), &file_name)?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::validation(format!("{name} is required")))
    }

    pub fn take_file(&mut self) -> Option<UploadedFile> {
        self.file.take()
    }
}
