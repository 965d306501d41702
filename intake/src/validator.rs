use std::str::FromStr;

use serde::Serialize;
use shared::MediaType;

use crate::config::AcceptPolicy;

/// What the host knows about a file before reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    /// Media type as declared by the host (e.g. `File.type`), possibly empty.
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintKind {
    Type,
    Size,
    /// The bytes could not be read after the metadata was accepted.
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationResult {
    violations: Vec<ConstraintViolation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    pub fn kinds(&self) -> Vec<ConstraintKind> {
        self.violations.iter().map(|v| v.kind).collect()
    }

    pub(crate) fn single(violation: ConstraintViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

/// Checks file metadata against the accept policy. Every constraint is
/// evaluated so that all violations are reported together, in declaration
/// order: type first, size second.
#[derive(Debug, Clone)]
pub struct FileValidator {
    allowed_types: Vec<MediaType>,
    max_file_bytes: u64,
}

impl FileValidator {
    pub fn new(policy: &AcceptPolicy) -> Self {
        Self {
            allowed_types: policy.allowed_types.clone(),
            max_file_bytes: policy.max_file_bytes,
        }
    }

    pub fn validate(&self, file: &FileMetadata) -> ValidationResult {
        let mut violations = Vec::new();

        if self.accepted_type(&file.mime_type).is_none() {
            violations.push(ConstraintViolation {
                kind: ConstraintKind::Type,
                message: self.type_message(),
            });
        }

        if let Some(violation) = self.check_size(file.size_bytes) {
            violations.push(violation);
        }

        ValidationResult { violations }
    }

    /// Like [`FileValidator::validate`], but yields the accepted media type
    /// when there are no violations.
    pub fn accept(&self, file: &FileMetadata) -> Result<MediaType, ValidationResult> {
        let validation = self.validate(file);
        match self.accepted_type(&file.mime_type) {
            Some(media_type) if validation.is_valid() => Ok(media_type),
            _ => Err(validation),
        }
    }

    /// The declared type, if it parses and is on the allow-list.
    pub fn accepted_type(&self, declared: &str) -> Option<MediaType> {
        MediaType::from_str(declared.trim())
            .ok()
            .filter(|media_type| self.allowed_types.contains(media_type))
    }

    pub fn check_size(&self, size_bytes: u64) -> Option<ConstraintViolation> {
        (size_bytes > self.max_file_bytes).then(|| ConstraintViolation {
            kind: ConstraintKind::Size,
            message: self.size_message(),
        })
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Value for an `<input type="file" accept=...>` attribute.
    pub fn accept_attribute(&self) -> String {
        self.allowed_types
            .iter()
            .map(MediaType::mime)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Human-readable list of accepted formats, e.g. "JPG, PNG, WebP".
    pub fn accepted_labels(&self) -> String {
        self.allowed_types
            .iter()
            .map(MediaType::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn max_size_label(&self) -> String {
        const MIB: u64 = 1024 * 1024;
        if self.max_file_bytes % MIB == 0 {
            format!("{}MB", self.max_file_bytes / MIB)
        } else {
            format!("{:.1}MB", self.max_file_bytes as f64 / MIB as f64)
        }
    }

    fn type_message(&self) -> String {
        let labels: Vec<&str> = self.allowed_types.iter().map(MediaType::label).collect();
        let list = match labels.as_slice() {
            [] => String::new(),
            [only] => only.to_string(),
            [first, second] => format!("{first} or {second}"),
            [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
        };
        format!("Please upload a {list} image.")
    }

    fn size_message(&self) -> String {
        format!("Image size must be less than {}.", self.max_size_label())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(&AcceptPolicy::default())
    }
}
