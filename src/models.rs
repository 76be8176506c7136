use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Opaque id: creation time in hex followed by 32 random bits.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix: u32 = rand::thread_rng().r#gen();
        Self(format!("app-{:x}{:08x}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ApplicationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Screening,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Screening => "screening",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offer => "offer",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// Still waiting on the employer: applied, screening or interviewing.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Applied | ApplicationStatus::Screening | ApplicationStatus::Interview
        )
    }

    /// Every status may follow every other one. The pipeline is not guarded.
    pub fn can_transition_to(self, _next: ApplicationStatus) -> bool {
        true
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub user_id: String,
    #[serde(default)]
    pub job_id: Option<String>,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ApplicationStatus,
    pub applied_date: DateTime<Utc>,
    #[serde(default)]
    pub response_date: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followed_up: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Application {
    /// Rejects records whose fields would corrupt derived statistics.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if self.id.0.trim().is_empty() {
            return Err(ValidationError::Blank("id"));
        }
        if self.company.trim().is_empty() {
            return Err(ValidationError::Blank("company"));
        }
        if self.position.trim().is_empty() {
            return Err(ValidationError::Blank("position"));
        }
        if self.applied_date > now {
            return Err(ValidationError::AppliedInFuture(self.applied_date));
        }
        if let Some(response) = self.response_date {
            if response < self.applied_date {
                return Err(ValidationError::BeforeApplied("responseDate"));
            }
        } else if self.status != ApplicationStatus::Applied {
            return Err(ValidationError::MissingResponseDate(self.status));
        }
        if self.last_updated < self.applied_date {
            return Err(ValidationError::BeforeApplied("lastUpdated"));
        }
        if matches!(self.interview_date, Some(at) if at < self.applied_date) {
            return Err(ValidationError::BeforeApplied("interviewDate"));
        }
        Ok(())
    }

    /// Fractional days between `applied_date` and `now`.
    pub fn days_since_applied(&self, now: DateTime<Utc>) -> f64 {
        fractional_days(now - self.applied_date)
    }

    /// Adds tags not already present, keeping insertion order.
    pub fn merge_tags<I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = String>,
    {
        for tag in tags {
            let tag = tag.trim().to_string();
            if !tag.is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

pub fn fractional_days(delta: chrono::Duration) -> f64 {
    delta.num_milliseconds() as f64 / 86_400_000.0
}

/// Input for a brand new application; everything else is derived on creation.
#[derive(Debug, Clone, Default)]
pub struct NewApplication {
    pub user_id: String,
    pub job_id: Option<String>,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub applied_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl NewApplication {
    pub fn into_application(self, id: ApplicationId, now: DateTime<Utc>) -> Application {
        let applied_date = self.applied_date.unwrap_or(now);
        let mut application = Application {
            id,
            user_id: self.user_id,
            job_id: self.job_id,
            company: self.company.trim().to_string(),
            position: self.position.trim().to_string(),
            location: self.location,
            status: ApplicationStatus::Applied,
            applied_date,
            response_date: None,
            last_updated: applied_date,
            interview_date: None,
            followed_up: false,
            notes: self.notes,
            tags: Vec::new(),
        };
        application.merge_tags(self.tags);
        application
    }
}

/// Tracking event emitted on every status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub application_id: ApplicationId,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub at: DateTime<Utc>,
}

/// Parses RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::Timestamp(value.to_string()))
}
