use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::labels::{Category, Location};

/// Opaque report identifier assigned by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ReportId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ReportId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Whether the reporter lost the item or found it. Fixed at creation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportKind {
    Lost,
    Found,
}

/// Lifecycle position of a report. Only ever moves forward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Active,
    Matched,
    Returned,
}

impl ReportStatus {
    pub fn is_discoverable(self) -> bool {
        matches!(self, ReportStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub id: ReportId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub status: ReportStatus,
    pub reward_amount: Option<f64>,
    pub image_ref: Option<String>,
    pub contact: Option<String>,
    pub occurred_on: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ItemReport {
    /// Reward worth advertising: only on lost reports and only when positive.
    pub fn advertised_reward(&self) -> Option<f64> {
        match (self.kind, self.reward_amount) {
            (ReportKind::Lost, Some(amount)) if amount > 0.0 => Some(amount),
            _ => None,
        }
    }

    pub(crate) fn with_status(&self, status: ReportStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Input for a new report, before the catalog assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportDraft {
    pub kind: Option<ReportKind>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub location: String,
    pub reward_amount: Option<f64>,
    pub image_ref: Option<String>,
    pub contact: Option<String>,
    pub occurred_on: Option<Date>,
}

impl ReportDraft {
    pub fn new(
        kind: ReportKind,
        name: impl Into<String>,
        category: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some(kind),
            name: name.into(),
            category: category.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reward(mut self, amount: f64) -> Self {
        self.reward_amount = Some(amount);
        self
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    pub fn with_occurred_on(mut self, date: Date) -> Self {
        self.occurred_on = Some(date);
        self
    }

    /// First field that keeps the draft from being persisted, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if self.kind.is_none() {
            return Some("type");
        }
        if self.name.trim().is_empty() {
            return Some("name");
        }
        if self
            .description
            .as_deref()
            .map_or(true, |text| text.trim().is_empty())
        {
            return Some("description");
        }
        if self.category.trim().is_empty() || self.category.parse::<Category>().is_err() {
            return Some("category");
        }
        if self.location.trim().is_empty() || self.location.parse::<Location>().is_err() {
            return Some("location");
        }
        if let Some(amount) = self.reward_amount {
            if !amount.is_finite() || amount < 0.0 || self.kind == Some(ReportKind::Found) {
                return Some("reward_amount");
            }
        }
        None
    }

    /// Builds the persisted entity, refusing drafts that fail
    /// [`ReportDraft::invalid_field`].
    pub fn into_report(self, id: ReportId, created_at: OffsetDateTime) -> CatalogResult<ItemReport> {
        if let Some(field) = self.invalid_field() {
            return Err(CatalogError::ValidationFailed { field });
        }
        let Some(kind) = self.kind else {
            return Err(CatalogError::ValidationFailed { field: "type" });
        };
        Ok(ItemReport {
            id,
            name: self.name.trim().to_string(),
            description: self.description.map(|text| text.trim().to_string()),
            category: self.category.trim().to_string(),
            location: self.location.trim().to_string(),
            kind,
            status: ReportStatus::Active,
            reward_amount: self.reward_amount,
            image_ref: self.image_ref,
            contact: self.contact.filter(|value| !value.trim().is_empty()),
            occurred_on: self.occurred_on,
            created_at,
        })
    }
}
