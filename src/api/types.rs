//! Wire types of the extraction service.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Stable course identifier.
///
/// The service sends ids as JSON numbers in some responses and strings in
/// others; both forms deserialize to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CourseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CourseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CourseId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self(text),
            Raw::Number(number) => Self(number.to_string()),
        })
    }
}

/// A course the user can export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    /// Server-side session lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

/// Result of exporting one course.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    #[serde(default)]
    pub course_id: Option<CourseId>,
    pub course_name: String,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub participant_count: Option<u64>,
    pub csv_filename: String,
    pub csv_base64: String,
    pub email_list_filename: String,
    pub email_list_base64: String,
}

/// Result of exporting every course as one archive.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractAllResponse {
    pub filename: String,
    pub base64: String,
    #[serde(default, rename = "courseCount")]
    pub course_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
