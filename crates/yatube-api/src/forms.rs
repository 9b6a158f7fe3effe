use std::collections::HashMap;

use axum::{
    Form,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use image::ImageFormat;

use crate::error::{ApiError, ValidationError};
use crate::media;
use crate::state::{AppState, with_db};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Raw post form as submitted, from either `multipart/form-data` (needed for
/// image uploads) or `application/x-www-form-urlencoded`.
#[derive(Debug, Default, Clone)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<UploadedFile>,
    /// The `image-clear` checkbox of the edit form.
    pub clear_image: bool,
}

/// What to do with a post's image on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace { data: Vec<u8>, format: ImageFormat },
}

/// A post form that passed validation.
#[derive(Debug, Clone)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: ImageChange,
}

fn is_checked(value: &str) -> bool {
    matches!(value, "on" | "true" | "1")
}

impl PostForm {
    fn set_field(&mut self, name: &str, value: String) {
        match name {
            "text" => self.text = value,
            "group" => self.group = Some(value),
            "image-clear" => self.clear_image = is_checked(&value),
            _ => {}
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = PostForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;
                // Browsers send an empty, unnamed part when no file was chosen
                if !(file_name.is_empty() && data.is_empty()) {
                    form.image = Some(UploadedFile {
                        file_name,
                        data: data.to_vec(),
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read field {}: {}", name, e)))?;
                form.set_field(&name, value);
            }
        }
        Ok(form)
    }

    fn from_fields(fields: HashMap<String, String>) -> Self {
        let mut form = PostForm::default();
        for (name, value) in fields {
            form.set_field(&name, value);
        }
        form
    }

    /// Check every field, collecting all errors. Image decoding happens on a
    /// blocking thread.
    pub async fn validate(self, state: &AppState) -> Result<CleanPost, ApiError> {
        let mut errors = ValidationError::default();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add_error("text", REQUIRED);
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => {
                    let exists = with_db(state, move |db| Ok(db.get_group_by_id(id)?.is_some())).await?;
                    if !exists {
                        errors.add_error("group", INVALID_CHOICE);
                    }
                    Some(id)
                }
                Err(_) => {
                    errors.add_error("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match self.image {
            Some(upload) if upload.data.is_empty() => {
                errors.add_error("image", EMPTY_FILE);
                ImageChange::Keep
            }
            Some(upload) => {
                let data = upload.data;
                let (data, format) = tokio::task::spawn_blocking(move || {
                    let format = media::validate_image(&data);
                    (data, format)
                })
                .await
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("image check failed: {}", e)))?;

                match format {
                    Some(format) => ImageChange::Replace { data, format },
                    None => {
                        errors.add_error("image", INVALID_IMAGE);
                        ImageChange::Keep
                    }
                }
            }
            None if self.clear_image => ImageChange::Clear,
            None => ImageChange::Keep,
        };

        errors.into_result()?;
        Ok(CleanPost {
            text,
            group_id,
            image,
        })
    }
}

const MULTIPART: &str = "multipart/form-data";

/// Media types compare case-insensitively.
fn is_multipart(content_type: &str) -> bool {
    content_type
        .get(..MULTIPART.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MULTIPART))
}

impl<S> FromRequest<S> for PostForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart_body = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_multipart);

        if multipart_body {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            PostForm::from_multipart(multipart).await
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            Ok(PostForm::from_fields(fields))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_fields_map_onto_form() {
        let fields = HashMap::from([
            ("text".to_string(), "hello".to_string()),
            ("group".to_string(), "3".to_string()),
            ("image-clear".to_string(), "on".to_string()),
            ("csrfmiddlewaretoken".to_string(), "x".to_string()),
        ]);
        let form = PostForm::from_fields(fields);
        assert_eq!(form.text, "hello");
        assert_eq!(form.group.as_deref(), Some("3"));
        assert!(form.clear_image);
        assert!(form.image.is_none());
    }

    #[test]
    fn multipart_detection_ignores_case() {
        assert!(is_multipart("multipart/form-data; boundary=x"));
        assert!(is_multipart("Multipart/Form-Data; boundary=x"));
        assert!(!is_multipart("application/x-www-form-urlencoded"));
        assert!(!is_multipart("multipart"));
    }
}
