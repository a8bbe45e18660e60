//! Campaign data model — campaigns, recipient join rows, and edit payloads.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contacts::is_valid_email;
use crate::error::ValidationError;

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Completed,
    Paused,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Sending => "sending",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "sending" => Ok(Self::Sending),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

/// Delivery status of one recipient within one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
    Opened,
    Clicked,
    Bounced,
}

impl RecipientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Opened => "opened",
            Self::Clicked => "clicked",
            Self::Bounced => "bounced",
        }
    }
}

impl fmt::Display for RecipientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecipientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "opened" => Ok(Self::Opened),
            "clicked" => Ok(Self::Clicked),
            "bounced" => Ok(Self::Bounced),
            other => Err(format!("unknown recipient status: {other}")),
        }
    }
}

/// A message template plus delivery metadata and lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    /// Subject line template.
    pub subject: String,
    /// HTML body template.
    pub content: String,
    pub from_name: String,
    pub from_email: String,
    pub status: CampaignStatus,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub open_count: u32,
    pub click_count: u32,
    pub bounce_count: u32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Formatted sender mailbox, `Name <address>`.
    pub fn sender(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

/// Payload for creating a campaign. New campaigns always start in `draft`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCampaign {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub from_name: String,
    pub from_email: String,
}

impl NewCampaign {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("subject", &self.subject)?;
        require("content", &self.content)?;
        require("fromName", &self.from_name)?;
        require("fromEmail", &self.from_email)?;
        if !is_valid_email(self.from_email.trim()) {
            return Err(ValidationError::InvalidEmail(self.from_email.clone()));
        }
        Ok(())
    }

    pub fn into_campaign(self) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            name: self.name,
            subject: self.subject,
            content: self.content,
            from_name: self.from_name,
            from_email: self.from_email.trim().to_string(),
            status: CampaignStatus::Draft,
            total_recipients: 0,
            sent_count: 0,
            open_count: 0,
            click_count: 0,
            bounce_count: 0,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial edit of a campaign's content fields.
///
/// Status, counters and timestamps are not editable here; they only move
/// through the lifecycle operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub from_name: Option<String>,
    pub from_email: Option<String>,
}

impl CampaignUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.subject.is_none()
            && self.content.is_none()
            && self.from_name.is_none()
            && self.from_email.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(subject) = &self.subject {
            require("subject", subject)?;
        }
        if let Some(content) = &self.content {
            require("content", content)?;
        }
        if let Some(from_name) = &self.from_name {
            require("fromName", from_name)?;
        }
        if let Some(from_email) = &self.from_email {
            if !is_valid_email(from_email.trim()) {
                return Err(ValidationError::InvalidEmail(from_email.clone()));
            }
        }
        Ok(())
    }

    /// Apply the set fields onto `campaign`, bumping `updated_at`.
    pub fn apply_to(self, campaign: &mut Campaign) {
        if let Some(name) = self.name {
            campaign.name = name;
        }
        if let Some(subject) = self.subject {
            campaign.subject = subject;
        }
        if let Some(content) = self.content {
            campaign.content = content;
        }
        if let Some(from_name) = self.from_name {
            campaign.from_name = from_name;
        }
        if let Some(from_email) = self.from_email {
            campaign.from_email = from_email.trim().to_string();
        }
        campaign.updated_at = Utc::now();
    }
}

/// Join row linking a contact to a campaign, with its delivery status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignContact {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
}

impl CampaignContact {
    pub fn new(campaign_id: Uuid, contact_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id,
            contact_id,
            status: RecipientStatus::Pending,
            sent_at: None,
            opened_at: None,
            clicked_at: None,
        }
    }
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_campaign() -> NewCampaign {
        NewCampaign {
            name: "Spring launch".into(),
            subject: "Hi {{name}}".into(),
            content: "<p>Hello {{name}}</p>".into(),
            from_name: "Acme".into(),
            from_email: "news@acme.test".into(),
        }
    }

    #[test]
    fn new_campaign_starts_as_draft_with_zero_counters() {
        let campaign = new_campaign().into_campaign();
        assert_eq!(campaign.status, CampaignStatus::Draft);
        assert_eq!(campaign.total_recipients, 0);
        assert_eq!(campaign.sent_count, 0);
        assert!(campaign.started_at.is_none());
        assert_eq!(campaign.sender(), "Acme <news@acme.test>");
    }

    #[test]
    fn new_campaign_validation() {
        assert!(new_campaign().validate().is_ok());

        let mut missing = new_campaign();
        missing.subject = "   ".into();
        assert!(matches!(
            missing.validate(),
            Err(ValidationError::MissingField("subject"))
        ));

        let mut bad_sender = new_campaign();
        bad_sender.from_email = "acme".into();
        assert!(matches!(
            bad_sender.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn update_touches_only_set_fields() {
        let mut campaign = new_campaign().into_campaign();
        let before = campaign.clone();
        let update = CampaignUpdate {
            subject: Some("New subject".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut campaign);

        assert_eq!(campaign.subject, "New subject");
        assert_eq!(campaign.name, before.name);
        assert_eq!(campaign.status, before.status);
        assert!(campaign.updated_at >= before.updated_at);
    }

    #[test]
    fn update_rejects_status_field() {
        let parsed: Result<CampaignUpdate, _> =
            serde_json::from_str(r#"{"status":"completed"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Sending,
            CampaignStatus::Completed,
            CampaignStatus::Paused,
        ] {
            assert_eq!(status.as_str().parse::<CampaignStatus>().unwrap(), status);
        }
        assert!("archived".parse::<CampaignStatus>().is_err());
        assert_eq!("bounced".parse::<RecipientStatus>().unwrap(), RecipientStatus::Bounced);
    }

    #[test]
    fn campaign_json_is_camel_case() {
        let campaign = new_campaign().into_campaign();
        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(json["status"], "draft");
        assert_eq!(json["fromEmail"], "news@acme.test");
        assert_eq!(json["totalRecipients"], 0);
        assert!(json["startedAt"].is_null());
    }
}
