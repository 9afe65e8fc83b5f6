//! Request DTOs for the demo service
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for creating or replacing an item (POST /items, PUT /items/:id)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    /// Item name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateItemRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if self.name.len() > 256 {
            return Some("Name exceeds maximum length of 256 characters".to_string());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_item_deserialize() {
        let json = r#"{"name": "widget"}"#;
        let req: CreateItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.name, "widget");
        assert!(req.description.is_none());
    }

    #[test]
    fn test_validate_empty_name() {
        let req = CreateItemRequest {
            name: "  ".to_string(),
            description: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = CreateItemRequest {
            name: "widget".to_string(),
            description: Some("blue".to_string()),
        };
        assert!(req.validate().is_none());
    }
}
