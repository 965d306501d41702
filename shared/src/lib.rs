use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// Raster formats the intake pipeline knows how to name. Whether a format is
/// accepted is decided by the configured allow-list, not by this enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter,
    IntoStaticStr, strum_macros::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    #[strum(to_string = "image/jpeg", serialize = "image/jpg")]
    Jpeg,
    #[serde(rename = "image/png")]
    #[strum(serialize = "image/png")]
    Png,
    #[serde(rename = "image/webp")]
    #[strum(serialize = "image/webp")]
    Webp,
    #[serde(rename = "image/gif")]
    #[strum(serialize = "image/gif")]
    Gif,
    #[serde(rename = "image/bmp")]
    #[strum(serialize = "image/bmp")]
    Bmp,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        self.into()
    }

    /// Short name shown to users, e.g. in "Please upload a JPG or PNG image."
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "JPG",
            MediaType::Png => "PNG",
            MediaType::Webp => "WebP",
            MediaType::Gif => "GIF",
            MediaType::Bmp => "BMP",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
            MediaType::Png => "png",
            MediaType::Webp => "webp",
            MediaType::Gif => "gif",
            MediaType::Bmp => "bmp",
        }
    }
}

/// Camera facing preference passed to the host's media devices.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FacingMode {
    User,
    #[default]
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Base64 (standard alphabet, padded) encoding of the image bytes.
    pub image_data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub condition_label: String,
    pub confidence_percent: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn media_type_parses_declared_mime_strings() {
        assert_eq!(MediaType::from_str("image/jpeg").unwrap(), MediaType::Jpeg);
        assert_eq!(MediaType::from_str("image/jpg").unwrap(), MediaType::Jpeg);
        assert_eq!(MediaType::from_str("IMAGE/PNG").unwrap(), MediaType::Png);
        assert!(MediaType::from_str("application/pdf").is_err());
        assert!(MediaType::from_str("").is_err());
    }

    #[test]
    fn media_type_serializes_as_mime() {
        let json = serde_json::to_string(&MediaType::Webp).unwrap();
        assert_eq!(json, "\"image/webp\"");
        assert_eq!(MediaType::Webp.mime(), "image/webp");
        assert_eq!(MediaType::Jpeg.to_string(), "image/jpeg");
    }

    #[test]
    fn analysis_response_uses_camel_case_and_optional_severity() {
        let resp: AnalysisResponse =
            serde_json::from_str(r#"{"conditionLabel":"Eczema","confidencePercent":94.5}"#)
                .unwrap();
        assert_eq!(resp.condition_label, "Eczema");
        assert_eq!(resp.confidence_percent, 94.5);
        assert_eq!(resp.severity, None);
    }

    #[test]
    fn facing_mode_defaults_to_environment() {
        assert_eq!(FacingMode::default(), FacingMode::Environment);
        assert_eq!(FacingMode::User.to_string(), "user");
    }
}
