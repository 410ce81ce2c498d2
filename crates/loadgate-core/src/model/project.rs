use super::{normalize_name, random_name, ModelError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level grouping of tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Normalize before the first insert; an empty name gets a random one.
    pub fn prepare_create(&mut self) {
        if self.name.trim().is_empty() {
            self.name = random_name();
        }
        self.normalize();
    }

    /// Normalize before an update; an empty name keeps `stored_name`.
    pub fn prepare_update(&mut self, stored_name: &str) -> Result<(), ModelError> {
        if normalize_name(&self.name).is_empty() {
            self.name = stored_name.to_string();
        }
        self.normalize();
        if self.name.is_empty() {
            return Err(ModelError::EmptyName { kind: "project" });
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.name = normalize_name(&self.name);
        self.description = self.description.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_fills_random_name() {
        let mut p = Project::new("");
        p.prepare_create();
        assert_eq!(p.name.len(), 16);
        assert_eq!(p.name, p.name.to_lowercase());
    }

    #[test]
    fn create_normalizes_name_and_description() {
        let mut p = Project::new("Sample Project");
        p.description = "  some description \n".into();
        p.prepare_create();
        assert_eq!(p.name, "sampleproject");
        assert_eq!(p.description, "some description");
    }

    #[test]
    fn update_keeps_stored_name_when_blank() {
        let mut p = Project::new("   ");
        p.prepare_update("original").unwrap();
        assert_eq!(p.name, "original");

        let mut p = Project::new("");
        assert_eq!(
            p.prepare_update(""),
            Err(ModelError::EmptyName { kind: "project" })
        );
    }
}
