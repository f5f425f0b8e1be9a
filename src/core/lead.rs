//! Lead records and their backend projection
//!
//! A [`Lead`] is what the UI works with (camelCase on the wire, closed enums
//! for status, portfolio and source). A [`LeadRow`] is what the `leads` table
//! stores (snake_case columns, free text, plus `user_id` and `created_at`).
//! [`Lead::try_from`] projects a row onto the record and rejects values that
//! fall outside the closed enumerations.

use crate::core::error::UnknownVariant;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Format of every calendar date exchanged with the backend
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Position of a lead in the sales pipeline
///
/// The pipeline is a flat enumeration: any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Won,
    Lost,
}

impl LeadStatus {
    /// Every status, in pipeline display order
    pub const ALL: [LeadStatus; 6] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Proposal,
        LeadStatus::Won,
        LeadStatus::Lost,
    ];

    /// Column value
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }

    /// Human-readable label for tabs and badges
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "New",
            LeadStatus::Contacted => "Contacted",
            LeadStatus::Qualified => "Qualified",
            LeadStatus::Proposal => "Proposal",
            LeadStatus::Won => "Won",
            LeadStatus::Lost => "Lost",
        }
    }

    /// Won and lost leads need no further follow-up
    pub fn is_closed(&self) -> bool {
        matches!(self, LeadStatus::Won | LeadStatus::Lost)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Business unit a lead belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Portfolio {
    #[serde(rename = "Settlo Academy")]
    Academy,
    #[serde(rename = "Settlo Tech Solutions")]
    TechSolutions,
    #[serde(rename = "Settlo HR Solutions")]
    HrSolutions,
}

impl Portfolio {
    pub const ALL: [Portfolio; 3] = [
        Portfolio::Academy,
        Portfolio::TechSolutions,
        Portfolio::HrSolutions,
    ];

    /// Label stored in the `portfolio` column
    pub fn label(&self) -> &'static str {
        match self {
            Portfolio::Academy => "Settlo Academy",
            Portfolio::TechSolutions => "Settlo Tech Solutions",
            Portfolio::HrSolutions => "Settlo HR Solutions",
        }
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Portfolio {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Portfolio::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "portfolio",
                value: s.to_string(),
            })
    }
}

/// Channel a lead came in through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadSource {
    Website,
    Referral,
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Email Campaign")]
    EmailCampaign,
    #[serde(rename = "Cold Call")]
    ColdCall,
}

impl LeadSource {
    pub const ALL: [LeadSource; 5] = [
        LeadSource::Website,
        LeadSource::Referral,
        LeadSource::SocialMedia,
        LeadSource::EmailCampaign,
        LeadSource::ColdCall,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LeadSource::Website => "Website",
            LeadSource::Referral => "Referral",
            LeadSource::SocialMedia => "Social Media",
            LeadSource::EmailCampaign => "Email Campaign",
            LeadSource::ColdCall => "Cold Call",
        }
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LeadSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadSource::ALL
            .into_iter()
            .find(|source| source.label() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "lead source",
                value: s.to_string(),
            })
    }
}

/// A sales lead as seen by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Backend-assigned identifier
    pub id: String,
    pub name: String,
    pub organization: String,
    pub email: String,
    pub contact_number: String,
    pub portfolio: Portfolio,
    pub lead_type: String,
    pub lead_source: LeadSource,
    /// ISO 8601 calendar date (`YYYY-MM-DD`)
    pub next_follow_up: String,
    /// Free text, may carry a currency symbol and separators
    pub expected_revenue: String,
    pub lead_owner: String,
    pub requirements: String,
    pub status: LeadStatus,
}

impl Lead {
    /// Parsed `next_follow_up`, `None` when the stored text is not a date
    pub fn next_follow_up_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.next_follow_up, DATE_FORMAT).ok()
    }

    /// Everything but the id, e.g. to pre-fill an edit form
    pub fn to_draft(&self) -> LeadDraft {
        LeadDraft {
            name: self.name.clone(),
            organization: self.organization.clone(),
            email: self.email.clone(),
            contact_number: self.contact_number.clone(),
            portfolio: self.portfolio,
            lead_type: self.lead_type.clone(),
            lead_source: self.lead_source,
            next_follow_up: self.next_follow_up.clone(),
            expected_revenue: self.expected_revenue.clone(),
            lead_owner: self.lead_owner.clone(),
            requirements: self.requirements.clone(),
            status: self.status,
        }
    }
}

/// A lead without its identity: the payload of add and full-record update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub name: String,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub organization: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub contact_number: String,
    pub portfolio: Portfolio,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub lead_type: String,
    pub lead_source: LeadSource,
    #[validate(custom(function = "crate::core::validation::iso_date"))]
    pub next_follow_up: String,
    pub expected_revenue: String,
    #[validate(custom(function = "crate::core::validation::non_blank"))]
    pub lead_owner: String,
    pub requirements: String,
    #[serde(default)]
    pub status: LeadStatus,
}

impl LeadDraft {
    /// Column values for an insert or a full-record update
    pub fn to_columns(&self) -> LeadColumns {
        LeadColumns {
            name: self.name.clone(),
            organization: self.organization.clone(),
            email: self.email.clone(),
            contact_number: self.contact_number.clone(),
            portfolio: self.portfolio.label().to_string(),
            lead_type: self.lead_type.clone(),
            lead_source: self.lead_source.label().to_string(),
            next_follow_up: self.next_follow_up.clone(),
            expected_revenue: self.expected_revenue.clone(),
            lead_owner: self.lead_owner.clone(),
            requirements: self.requirements.clone(),
            status: self.status.as_str().to_string(),
        }
    }
}

/// Writable columns of the `leads` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadColumns {
    pub name: String,
    pub organization: String,
    pub email: String,
    pub contact_number: String,
    pub portfolio: String,
    pub lead_type: String,
    pub lead_source: String,
    pub next_follow_up: String,
    pub expected_revenue: String,
    pub lead_owner: String,
    pub requirements: String,
    pub status: String,
}

/// A full row of the `leads` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRow {
    pub id: String,
    /// Owner, set at creation and enforced by the backend
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub columns: LeadColumns,
}

impl TryFrom<LeadRow> for Lead {
    type Error = UnknownVariant;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        let LeadRow { id, columns, .. } = row;
        Ok(Lead {
            id,
            portfolio: columns.portfolio.parse()?,
            lead_source: columns.lead_source.parse()?,
            status: columns.status.parse()?,
            name: columns.name,
            organization: columns.organization,
            email: columns.email,
            contact_number: columns.contact_number,
            lead_type: columns.lead_type,
            next_follow_up: columns.next_follow_up,
            expected_revenue: columns.expected_revenue,
            lead_owner: columns.lead_owner,
            requirements: columns.requirements,
        })
    }
}
