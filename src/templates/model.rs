//! Reusable subject/body pairs an operator can copy into a campaign.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaigns::model::require;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    /// HTML body, with the same `{{token}}` placeholders campaigns use.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    pub subject: String,
    pub content: String,
}

impl NewTemplate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("subject", &self.subject)?;
        require("content", &self.content)
    }

    pub fn into_template(self) -> EmailTemplate {
        let now = Utc::now();
        EmailTemplate {
            id: Uuid::new_v4(),
            name: self.name,
            subject: self.subject,
            content: self.content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit of a template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
}

impl TemplateUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("subject", &self.subject),
            ("content", &self.content),
        ] {
            if let Some(value) = value {
                require(field, value)?;
            }
        }
        Ok(())
    }

    pub fn apply_to(self, template: &mut EmailTemplate) {
        if let Some(name) = self.name {
            template.name = name;
        }
        if let Some(subject) = self.subject {
            template.subject = subject;
        }
        if let Some(content) = self.content {
            template.content = content;
        }
        template.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn welcome() -> NewTemplate {
        NewTemplate {
            name: "Welcome".into(),
            subject: "Hi {{name}}".into(),
            content: "<p>Welcome aboard</p>".into(),
        }
    }

    #[test]
    fn new_template_requires_all_fields() {
        assert!(welcome().validate().is_ok());
        let mut blank = welcome();
        blank.content = String::new();
        assert!(matches!(
            blank.validate(),
            Err(ValidationError::MissingField("content"))
        ));
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut template = welcome().into_template();
        let created = template.created_at;
        TemplateUpdate {
            name: Some("Welcome v2".into()),
            ..Default::default()
        }
        .apply_to(&mut template);

        assert_eq!(template.name, "Welcome v2");
        assert_eq!(template.subject, "Hi {{name}}");
        assert_eq!(template.created_at, created);
        assert!(template.updated_at >= created);
    }

    #[test]
    fn update_rejects_blank_values() {
        let update = TemplateUpdate {
            subject: Some("  ".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
