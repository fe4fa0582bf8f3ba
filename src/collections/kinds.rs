//! Payloads of the collections the admin panel manages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::ItemPayload;
use crate::error::{AppError, AppResult};

fn require_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input("missing_field".to_string(), format!("'{field}' is required")));
    }
    Ok(())
}

/// Portfolio project card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl ItemPayload for Project {
    fn validate(&self) -> AppResult<()> { require_text("title", &self.title) }
}

/// Offered service tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ItemPayload for Service {
    fn validate(&self) -> AppResult<()> { require_text("title", &self.title) }
}

/// Visitor testimonial submitted through the feedback form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub name: String,
    pub message: String,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl ItemPayload for FeedbackEntry {
    fn validate(&self) -> AppResult<()> {
        require_text("name", &self.name)?;
        require_text("message", &self.message)?;
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::invalid_input("rating_out_of_range".to_string(), format!("rating must be between 1 and 5, got {}", self.rating)));
        }
        Ok(())
    }
}

fn default_role() -> String { "admin".to_string() }

/// Admin account shown in the users panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl ItemPayload for UserSession {
    fn validate(&self) -> AppResult<()> {
        require_text("username", &self.username)?;
        require_text("role", &self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_requires_title() {
        let p: Project = serde_json::from_value(json!({"title": "  "})).unwrap();
        let err = p.validate().unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");
        assert_eq!(err.code_str(), "missing_field");
        let ok: Project = serde_json::from_value(json!({"title": "Site", "tags": ["rust"]})).unwrap();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.description, "");
    }

    #[test]
    fn feedback_rating_bounds() {
        let f: FeedbackEntry = serde_json::from_value(json!({"name": "Ann", "message": "great", "rating": 6})).unwrap();
        assert_eq!(f.validate().unwrap_err().code_str(), "rating_out_of_range");
        let f: FeedbackEntry = serde_json::from_value(json!({"name": "Ann", "message": "great", "rating": 5})).unwrap();
        assert!(f.validate().is_ok());
    }

    #[test]
    fn user_role_defaults_to_admin() {
        let u: UserSession = serde_json::from_value(json!({"username": "root"})).unwrap();
        assert_eq!(u.role, "admin");
        assert!(u.validate().is_ok());
    }
}
