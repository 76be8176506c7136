use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{TrackerError, ValidationError};
use crate::insights::{compute_insights, Insight};
use crate::models::{Application, ApplicationId, ApplicationStatus, NewApplication, StatusTransition};
use crate::reminders::{compute_reminders, Reminder};
use crate::stats::{compute_stats, StatsSummary};
use crate::store::ApplicationStore;

/// Owns the application status lifecycle and the metrics derived from it.
pub struct ApplicationTracker<S, C> {
    store: S,
    clock: C,
}

impl<S, C> ApplicationTracker<S, C>
where
    S: ApplicationStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validates and stores a new application in the `applied` state.
    pub fn create(&self, new: NewApplication) -> Result<Application, TrackerError> {
        let now = self.clock.now();
        let application = new.into_application(ApplicationId::generate(now), now);
        application.validate(now)?;
        self.store.put_application(&application)?;
        info!(
            id = %application.id,
            company = %application.company,
            position = %application.position,
            "application created"
        );
        Ok(application)
    }

    pub fn application(&self, id: &ApplicationId) -> Result<Application, TrackerError> {
        self.store
            .get_application(id)?
            .ok_or_else(|| TrackerError::NotFound(id.clone()))
    }

    pub fn applications(&self, user_id: &str) -> Result<Vec<Application>, TrackerError> {
        let mut applications = self.store.list_applications(user_id)?;
        applications.sort_by(|a, b| b.applied_date.cmp(&a.applied_date));
        Ok(applications)
    }

    /// Moves an application to `status`. The first move away from `applied`
    /// stamps `response_date`; later moves never touch it again.
    pub fn set_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Application, TrackerError> {
        let mut application = self.application(id)?;
        let now = self.clock.now();
        let from = application.status;
        debug_assert!(from.can_transition_to(status));

        if from == ApplicationStatus::Applied
            && status != ApplicationStatus::Applied
            && application.response_date.is_none()
        {
            application.response_date = Some(now);
        }
        application.status = status;
        application.last_updated = now;
        application.validate(now)?;

        let transition = StatusTransition {
            application_id: application.id.clone(),
            from,
            to: status,
            at: now,
        };
        self.store.put_with_transition(&application, &transition)?;
        info!(id = %application.id, from = %from, to = %status, "status changed");

        Ok(application)
    }

    pub fn mark_followed_up(&self, id: &ApplicationId) -> Result<Application, TrackerError> {
        let mut application = self.application(id)?;
        let now = self.clock.now();
        application.followed_up = true;
        application.last_updated = now;
        application.validate(now)?;
        self.store.put_application(&application)?;
        info!(id = %application.id, "marked as followed up");
        Ok(application)
    }

    pub fn schedule_interview(
        &self,
        id: &ApplicationId,
        at: DateTime<Utc>,
    ) -> Result<Application, TrackerError> {
        let mut application = self.application(id)?;
        if at < application.applied_date {
            return Err(ValidationError::BeforeApplied("interviewDate").into());
        }
        let now = self.clock.now();
        application.interview_date = Some(at);
        application.last_updated = now;
        application.validate(now)?;
        self.store.put_application(&application)?;
        info!(id = %application.id, at = %at, "interview scheduled");
        Ok(application)
    }

    /// Replaces notes when given and merges in any new tags.
    pub fn annotate(
        &self,
        id: &ApplicationId,
        notes: Option<String>,
        tags: Vec<String>,
    ) -> Result<Application, TrackerError> {
        let mut application = self.application(id)?;
        if let Some(notes) = notes {
            application.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }
        let now = self.clock.now();
        application.merge_tags(tags);
        application.last_updated = now;
        application.validate(now)?;
        self.store.put_application(&application)?;
        debug!(id = %application.id, tags = application.tags.len(), "annotated");
        Ok(application)
    }

    pub fn history(&self, id: &ApplicationId) -> Result<Vec<StatusTransition>, TrackerError> {
        let mut transitions = self.store.transitions(id)?;
        transitions.sort_by_key(|t| t.at);
        Ok(transitions)
    }

    pub fn stats(&self, user_id: &str) -> Result<StatsSummary, TrackerError> {
        let applications = self.store.list_applications(user_id)?;
        Ok(compute_stats(&applications, self.clock.now()))
    }

    pub fn reminders(&self, user_id: &str) -> Result<Vec<Reminder>, TrackerError> {
        let applications = self.store.list_applications(user_id)?;
        Ok(compute_reminders(&applications, self.clock.now()))
    }

    pub fn insights(&self, user_id: &str, limit: usize) -> Result<Vec<Insight>, TrackerError> {
        let stats = self.stats(user_id)?;
        Ok(compute_insights(&stats, limit))
    }

    /// Writes a batch of records after every one of them has validated.
    /// A record may not move the `applied_date` of one already stored, or
    /// of an earlier record in the same batch.
    pub fn import(&self, applications: &[Application]) -> Result<usize, TrackerError> {
        let now = self.clock.now();
        let mut seen: HashMap<&ApplicationId, DateTime<Utc>> = HashMap::new();
        for application in applications {
            application.validate(now)?;
            let applied = match seen.get(&application.id) {
                Some(applied) => Some(*applied),
                None => self
                    .store
                    .get_application(&application.id)?
                    .map(|stored| stored.applied_date),
            };
            if applied.is_some_and(|applied| applied != application.applied_date) {
                return Err(ValidationError::AppliedDateChanged(application.id.clone()).into());
            }
            seen.insert(&application.id, application.applied_date);
        }
        self.store.put_all(applications)?;
        info!(count = applications.len(), "applications imported");
        Ok(applications.len())
    }
}
