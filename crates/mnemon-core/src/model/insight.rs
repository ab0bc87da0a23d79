use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

pub const MAX_CONTENT_BYTES: usize = 8_000;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_BYTES: usize = 100;
pub const MAX_ENTITIES: usize = 50;
pub const MAX_ENTITY_BYTES: usize = 200;

/// Topic classification of an insight.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Preference,
    Decision,
    #[default]
    Fact,
    Insight,
    Context,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Preference => "preference",
            Category::Decision => "decision",
            Category::Fact => "fact",
            Category::Insight => "insight",
            Category::Context => "context",
            Category::General => "general",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "preference" => Ok(Category::Preference),
            "decision" => Ok(Category::Decision),
            "fact" => Ok(Category::Fact),
            "insight" => Ok(Category::Insight),
            "context" => Ok(Category::Context),
            "general" => Ok(Category::General),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A durable memory node: content plus the metadata the engine needs to
/// rank, link, and retain it.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub entities: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub embedding: Option<Vec<f64>>,
    #[serde(default)]
    pub effective_importance: f64,
}

impl Insight {
    /// Build a new insight, validating every bounded field.
    ///
    /// `id` is generated fresh; callers never choose it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        content: String,
        category: Category,
        importance: u8,
        tags: Vec<String>,
        entities: Vec<String>,
        source: String,
    ) -> Result<Self, ValidationError> {
        validate_content(&content)?;
        validate_importance(importance)?;
        validate_tags(&tags)?;
        validate_entities(&entities)?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            content,
            category,
            importance,
            tags,
            entities,
            source,
            access_count: 0,
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            deleted_at: None,
            embedding: None,
            effective_importance: super::base_weight(importance),
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_immune(&self) -> bool {
        super::is_immune(self.importance, self.access_count)
    }

    /// Days elapsed since `last_accessed_at`, falling back to
    /// `created_at` when the insight was never accessed.
    pub fn days_since_access(&self, now: DateTime<Utc>) -> f64 {
        let reference = self.last_accessed_at.unwrap_or(self.created_at);
        let secs = (now - reference).num_seconds().max(0) as f64;
        secs / 86_400.0
    }
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(ValidationError::ContentTooLong);
    }
    Ok(())
}

pub fn validate_importance(importance: u8) -> Result<(), ValidationError> {
    if !(1..=5).contains(&importance) {
        return Err(ValidationError::ImportanceOutOfRange(importance));
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::TooManyTags(tags.len()));
    }
    if tags.iter().any(|t| t.len() > MAX_TAG_BYTES) {
        return Err(ValidationError::TagTooLong);
    }
    Ok(())
}

pub fn validate_entities(entities: &[String]) -> Result<(), ValidationError> {
    if entities.len() > MAX_ENTITIES {
        return Err(ValidationError::TooManyEntities(entities.len()));
    }
    if entities.iter().any(|e| e.len() > MAX_ENTITY_BYTES) {
        return Err(ValidationError::EntityTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for c in [
            Category::Preference,
            Category::Decision,
            Category::Fact,
            Category::Insight,
            Category::Context,
            Category::General,
        ] {
            assert_eq!(Category::parse(c.as_str()).unwrap(), c);
        }
        assert!(Category::parse("narrative").is_err());
    }

    #[test]
    fn new_insight_validates_importance() {
        let err = Insight::new(
            "hi".into(),
            Category::Fact,
            9,
            vec![],
            vec![],
            "user".into(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::ImportanceOutOfRange(9));
    }

    #[test]
    fn new_insight_sets_effective_importance_from_base_weight() {
        let ins = Insight::new("hi".into(), Category::Fact, 5, vec![], vec![], "user".into()).unwrap();
        assert_eq!(ins.effective_importance, 1.0);
        assert!(!ins.is_deleted());
    }

    #[test]
    fn days_since_access_falls_back_to_created_at() {
        let mut ins =
            Insight::new("hi".into(), Category::Fact, 1, vec![], vec![], "user".into()).unwrap();
        ins.created_at = Utc::now() - chrono::Duration::days(2);
        let d = ins.days_since_access(Utc::now());
        assert!((d - 2.0).abs() < 0.01);
    }
}
