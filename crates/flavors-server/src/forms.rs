//! Multipart form decoding for recipe submissions.

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;

use crate::error::ServerError;

/// Raw fields of a submission form, before any validation.
///
/// Blank text fields are `None` and empty file parts are treated as absent.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SubmissionForm {
    pub festival: Option<String>,
    pub dish: Option<String>,
    pub language: Option<String>,
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub auto_locate: bool,
    pub transcribe: bool,
    pub image: Option<Vec<u8>>,
    pub video: Option<Vec<u8>>,
    pub audio: Option<Vec<u8>>,
}

impl SubmissionForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();

            match name.as_str() {
                "image" | "video" | "audio" => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| read_error(&name, e))?;
                    let data = (!data.is_empty()).then(|| data.to_vec());
                    match name.as_str() {
                        "image" => form.image = data,
                        "video" => form.video = data,
                        _ => form.audio = data,
                    }
                }
                _ => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| read_error(&name, e))?;
                    form.set_text(&name, &text)?;
                }
            }
        }

        Ok(form)
    }

    fn set_text(&mut self, name: &str, value: &str) -> Result<(), ServerError> {
        let text = non_blank(value);
        match name {
            "festival" => self.festival = text,
            "dish" => self.dish = text,
            "language" => self.language = text,
            "ingredients" => self.ingredients = text,
            "instructions" => self.instructions = text,
            "description" => self.description = text,
            "latitude" => self.latitude = parse_coordinate(name, text.as_deref())?,
            "longitude" => self.longitude = parse_coordinate(name, text.as_deref())?,
            "auto_locate" => self.auto_locate = parse_flag(text.as_deref()),
            "transcribe" => self.transcribe = parse_flag(text.as_deref()),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
        Ok(())
    }
}

fn read_error(name: &str, e: MultipartError) -> ServerError {
    ServerError::BadRequest(format!("Failed to read {name}: {e}"))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_coordinate(name: &str, value: Option<&str>) -> Result<Option<f64>, ServerError> {
    value
        .map(|v| {
            v.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| ServerError::BadRequest(format!("{name} must be a number")))
        })
        .transpose()
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_ascii_lowercase).as_deref(),
        Some("true" | "1" | "on" | "yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_none() {
        let mut form = SubmissionForm::default();
        form.set_text("festival", "   ").unwrap();
        form.set_text("dish", " Modak ").unwrap();
        assert_eq!(form.festival, None);
        assert_eq!(form.dish.as_deref(), Some("Modak"));
    }

    #[test]
    fn coordinates_must_be_numbers() {
        let mut form = SubmissionForm::default();
        form.set_text("latitude", "18.52").unwrap();
        form.set_text("longitude", "").unwrap();
        assert_eq!(form.latitude, Some(18.52));
        assert_eq!(form.longitude, None);

        assert!(form.set_text("longitude", "east").is_err());
        assert!(form.set_text("longitude", "NaN").is_err());
    }

    #[test]
    fn flags() {
        for v in ["true", "1", "on", "YES"] {
            assert!(parse_flag(Some(v)), "{v}");
        }
        for v in ["false", "0", "off"] {
            assert!(!parse_flag(Some(v)), "{v}");
        }
        assert!(!parse_flag(None));
    }
}
