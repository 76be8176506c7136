use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{fractional_days, Application, ApplicationId, ApplicationStatus};

pub const FOLLOW_UP_MIN_DAYS: f64 = 7.0;
pub const FOLLOW_UP_MAX_DAYS: f64 = 14.0;
pub const FOLLOW_UP_HIGH_AFTER_DAYS: f64 = 10.0;
pub const INTERVIEW_LOOKAHEAD_DAYS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    FollowUp,
    Interview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub application_id: ApplicationId,
    pub kind: ReminderKind,
    pub priority: Priority,
    pub company: String,
    pub position: String,
    pub message: String,
    pub due: DateTime<Utc>,
}

/// Still `applied`, 7 to 14 days (inclusive) since applying.
pub fn is_unanswered_in_window(app: &Application, now: DateTime<Utc>) -> bool {
    if app.status != ApplicationStatus::Applied {
        return false;
    }
    let days = app.days_since_applied(now);
    (FOLLOW_UP_MIN_DAYS..=FOLLOW_UP_MAX_DAYS).contains(&days)
}

/// Unanswered in the window and not yet followed up.
pub fn is_follow_up_due(app: &Application, now: DateTime<Utc>) -> bool {
    !app.followed_up && is_unanswered_in_window(app, now)
}

fn follow_up(app: &Application, now: DateTime<Utc>) -> Option<Reminder> {
    if !is_follow_up_due(app, now) {
        return None;
    }
    let days = app.days_since_applied(now);
    let priority = if days > FOLLOW_UP_HIGH_AFTER_DAYS {
        Priority::High
    } else {
        Priority::Medium
    };
    Some(Reminder {
        application_id: app.id.clone(),
        kind: ReminderKind::FollowUp,
        priority,
        company: app.company.clone(),
        position: app.position.clone(),
        message: format!(
            "Follow up with {} about {} ({} days since applying)",
            app.company,
            app.position,
            days.floor() as i64
        ),
        due: now,
    })
}

fn interview(app: &Application, now: DateTime<Utc>) -> Option<Reminder> {
    if app.status != ApplicationStatus::Interview {
        return None;
    }
    let at = app.interview_date?;
    let days_until = fractional_days(at - now);
    if days_until <= 0.0 || days_until > INTERVIEW_LOOKAHEAD_DAYS {
        return None;
    }
    Some(Reminder {
        application_id: app.id.clone(),
        kind: ReminderKind::Interview,
        priority: Priority::High,
        company: app.company.clone(),
        position: app.position.clone(),
        message: format!(
            "Interview with {} for {} at {}",
            app.company,
            app.position,
            at.format("%Y-%m-%d %H:%M UTC")
        ),
        due: at,
    })
}

/// Follow-up and upcoming-interview reminders, high priority first.
pub fn compute_reminders(applications: &[Application], now: DateTime<Utc>) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = applications
        .iter()
        .flat_map(|app| [follow_up(app, now), interview(app, now)])
        .flatten()
        .collect();
    reminders.sort_by_key(|reminder| reminder.priority);
    reminders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewApplication;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap()
    }

    fn applied(id: &str, age: Duration) -> Application {
        NewApplication {
            user_id: "dana".to_string(),
            company: format!("{id} Corp"),
            position: "Backend Engineer".to_string(),
            applied_date: Some(now() - age),
            ..Default::default()
        }
        .into_application(ApplicationId::from(id), now())
    }

    fn days(d: f64) -> Duration {
        Duration::milliseconds((d * 86_400_000.0).round() as i64)
    }

    #[test]
    fn test_follow_up_window_boundaries() {
        assert!(!is_follow_up_due(&applied("a", days(6.99)), now()));
        assert!(is_follow_up_due(&applied("b", days(7.0)), now()));
        assert!(is_follow_up_due(&applied("c", days(14.0)), now()));
        assert!(!is_follow_up_due(&applied("d", days(14.01)), now()));
    }

    #[test]
    fn test_follow_up_priority_by_age() {
        let reminders = compute_reminders(&[applied("eight", days(8.0))], now());
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].priority, Priority::Medium);
        assert_eq!(reminders[0].kind, ReminderKind::FollowUp);

        let reminders = compute_reminders(&[applied("eleven", days(11.0))], now());
        assert_eq!(reminders[0].priority, Priority::High);

        let reminders = compute_reminders(&[applied("ten", days(10.0))], now());
        assert_eq!(reminders[0].priority, Priority::Medium);
    }

    #[test]
    fn test_followed_up_applications_are_skipped() {
        let mut app = applied("done", days(9.0));
        app.followed_up = true;
        assert!(compute_reminders(&[app], now()).is_empty());
    }

    #[test]
    fn test_responded_applications_get_no_follow_up() {
        let mut app = applied("screened", days(9.0));
        app.status = ApplicationStatus::Screening;
        app.response_date = Some(now() - days(1.0));
        assert!(compute_reminders(&[app], now()).is_empty());
    }

    #[test]
    fn test_interview_reminder_window() {
        let mut tomorrow = applied("tomorrow", days(20.0));
        tomorrow.status = ApplicationStatus::Interview;
        tomorrow.response_date = Some(now() - days(10.0));
        tomorrow.interview_date = Some(now() + Duration::hours(20));

        let mut later = tomorrow.clone();
        later.id = ApplicationId::from("later");
        later.interview_date = Some(now() + Duration::hours(30));

        let mut past = tomorrow.clone();
        past.id = ApplicationId::from("past");
        past.interview_date = Some(now() - Duration::hours(1));

        let reminders = compute_reminders(&[tomorrow, later, past], now());
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].application_id, ApplicationId::from("tomorrow"));
        assert_eq!(reminders[0].kind, ReminderKind::Interview);
        assert_eq!(reminders[0].priority, Priority::High);
    }

    #[test]
    fn test_interview_exactly_one_day_out_is_included() {
        let mut app = applied("edge", days(20.0));
        app.status = ApplicationStatus::Interview;
        app.response_date = Some(now() - days(10.0));
        app.interview_date = Some(now() + Duration::days(1));
        assert_eq!(compute_reminders(&[app], now()).len(), 1);
    }

    #[test]
    fn test_high_priority_sorted_first_and_stable() {
        let apps = vec![
            applied("m1", days(8.0)),
            applied("h1", days(12.0)),
            applied("m2", days(9.0)),
            applied("h2", days(13.0)),
        ];
        let ids: Vec<String> = compute_reminders(&apps, now())
            .into_iter()
            .map(|r| r.application_id.0)
            .collect();
        assert_eq!(ids, vec!["h1", "h2", "m1", "m2"]);
    }
}
