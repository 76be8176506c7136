use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{fractional_days, Application, ApplicationStatus};
use crate::reminders::is_unanswered_in_window;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Increase,
    Decrease,
}

/// Applications this week against the week before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WeeklyChange {
    pub direction: Direction,
    pub value: usize,
}

/// Everything the dashboard and applications views derive from a user's list.
/// `Default` is the zeroed summary shown when the store cannot be read.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total: usize,
    pub active_count: usize,
    pub interviews: usize,
    pub offers: usize,
    pub response_rate: u32,
    pub interview_rate: u32,
    pub offer_rate: u32,
    pub avg_response_time: i64,
    pub weekly_change: WeeklyChange,
    /// Applied 7 to 14 days ago with no response, followed up or not.
    pub follow_up_due: usize,
    pub by_status: BTreeMap<ApplicationStatus, usize>,
}

/// Whole-number percentage, 0 for an empty denominator, never above 100.
fn percentage(count: usize, of: usize) -> u32 {
    if of == 0 {
        return 0;
    }
    let pct = (count as f64 / of as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

fn weekly_change(applications: &[Application], now: DateTime<Utc>) -> WeeklyChange {
    let week_start = now - Duration::days(7);
    let prior_start = now - Duration::days(14);

    let current = applications
        .iter()
        .filter(|app| app.applied_date >= week_start && app.applied_date < now)
        .count();
    let prior = applications
        .iter()
        .filter(|app| app.applied_date >= prior_start && app.applied_date < week_start)
        .count();

    WeeklyChange {
        direction: if current >= prior {
            Direction::Increase
        } else {
            Direction::Decrease
        },
        value: current.abs_diff(prior),
    }
}

fn average_response_days(applications: &[Application]) -> i64 {
    let spans: Vec<f64> = applications
        .iter()
        .filter_map(|app| {
            app.response_date
                .map(|responded| fractional_days(responded - app.applied_date))
        })
        .collect();
    if spans.is_empty() {
        return 0;
    }
    (spans.iter().sum::<f64>() / spans.len() as f64).round() as i64
}

pub fn compute_stats(applications: &[Application], now: DateTime<Utc>) -> StatsSummary {
    let total = applications.len();
    let mut by_status: BTreeMap<ApplicationStatus, usize> = BTreeMap::new();
    for app in applications {
        *by_status.entry(app.status).or_default() += 1;
    }
    let count = |status: ApplicationStatus| by_status.get(&status).copied().unwrap_or(0);

    let responded = total - count(ApplicationStatus::Applied);
    let interviews = count(ApplicationStatus::Interview);
    let offers = count(ApplicationStatus::Offer);
    let active_count = applications.iter().filter(|app| app.status.is_active()).count();

    StatsSummary {
        total,
        active_count,
        interviews,
        offers,
        response_rate: percentage(responded, total),
        interview_rate: percentage(interviews, total),
        offer_rate: percentage(offers, interviews),
        avg_response_time: average_response_days(applications),
        weekly_change: weekly_change(applications, now),
        follow_up_due: applications
            .iter()
            .filter(|app| is_unanswered_in_window(app, now))
            .count(),
        by_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationId, NewApplication};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn app(id: &str, age_days: i64, status: ApplicationStatus) -> Application {
        let mut app = NewApplication {
            user_id: "dana".to_string(),
            company: "Initech".to_string(),
            position: "SRE".to_string(),
            applied_date: Some(now() - Duration::days(age_days)),
            ..Default::default()
        }
        .into_application(ApplicationId::from(id), now());
        if status != ApplicationStatus::Applied {
            app.status = status;
            app.response_date = Some(app.applied_date + Duration::days(1));
        }
        app
    }

    #[test]
    fn test_two_application_scenario() {
        let fresh = app("fresh", 3, ApplicationStatus::Applied);
        let mut interviewing = app("interviewing", 10, ApplicationStatus::Interview);
        interviewing.response_date = Some(now() - Duration::days(8));

        let stats = compute_stats(&[fresh, interviewing], now());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active_count, 2);
        assert_eq!(stats.response_rate, 50);
        assert_eq!(stats.interview_rate, 50);
        assert_eq!(stats.offer_rate, 0);
        assert_eq!(stats.avg_response_time, 2);
    }

    #[test]
    fn test_empty_collection_is_all_zero() {
        let stats = compute_stats(&[], now());
        assert_eq!(stats, StatsSummary::default());
        assert_eq!(
            stats.weekly_change,
            WeeklyChange {
                direction: Direction::Increase,
                value: 0
            }
        );
    }

    #[test]
    fn test_offer_rate_with_interview_but_no_offers() {
        let mut apps: Vec<Application> = (0..9)
            .map(|i| app(&format!("a{i}"), 20, ApplicationStatus::Applied))
            .collect();
        apps.push(app("int", 20, ApplicationStatus::Interview));

        let stats = compute_stats(&apps, now());
        assert_eq!(stats.total, 10);
        assert_eq!(stats.interviews, 1);
        assert_eq!(stats.offer_rate, 0);
        assert_eq!(stats.interview_rate, 10);
    }

    #[test]
    fn test_offer_rate_is_clamped() {
        let apps = vec![
            app("o1", 30, ApplicationStatus::Offer),
            app("o2", 30, ApplicationStatus::Offer),
            app("i1", 30, ApplicationStatus::Interview),
        ];
        let stats = compute_stats(&apps, now());
        assert_eq!(stats.offer_rate, 100);
    }

    #[test]
    fn test_rates_bounded_and_active_not_above_total() {
        let apps = vec![
            app("a", 1, ApplicationStatus::Applied),
            app("s", 2, ApplicationStatus::Screening),
            app("r", 3, ApplicationStatus::Rejected),
            app("w", 4, ApplicationStatus::Withdrawn),
            app("o", 5, ApplicationStatus::Offer),
        ];
        let stats = compute_stats(&apps, now());
        for rate in [stats.response_rate, stats.interview_rate, stats.offer_rate] {
            assert!(rate <= 100);
        }
        assert_eq!(stats.active_count, 2);
        assert!(stats.active_count <= stats.total);
        assert_eq!(stats.response_rate, 80);
        assert_eq!(stats.by_status.get(&ApplicationStatus::Rejected), Some(&1));
    }

    #[test]
    fn test_weekly_change_directions() {
        let apps = vec![
            app("this-week", 2, ApplicationStatus::Applied),
            app("last-1", 8, ApplicationStatus::Applied),
            app("last-2", 9, ApplicationStatus::Applied),
            app("last-3", 13, ApplicationStatus::Applied),
            app("old", 30, ApplicationStatus::Applied),
        ];
        let change = compute_stats(&apps, now()).weekly_change;
        assert_eq!(change.direction, Direction::Decrease);
        assert_eq!(change.value, 2);

        let tie = vec![
            app("this-week", 2, ApplicationStatus::Applied),
            app("last", 8, ApplicationStatus::Applied),
        ];
        let change = compute_stats(&tie, now()).weekly_change;
        assert_eq!(change.direction, Direction::Increase);
        assert_eq!(change.value, 0);
    }

    #[test]
    fn test_week_boundary_belongs_to_current_week() {
        let apps = vec![app("edge", 7, ApplicationStatus::Applied)];
        let change = compute_stats(&apps, now()).weekly_change;
        assert_eq!(change.direction, Direction::Increase);
        assert_eq!(change.value, 1);
    }

    #[test]
    fn test_follow_up_due_counted() {
        let apps = vec![
            app("due", 9, ApplicationStatus::Applied),
            app("young", 2, ApplicationStatus::Applied),
            app("answered", 9, ApplicationStatus::Screening),
        ];
        assert_eq!(compute_stats(&apps, now()).follow_up_due, 1);
    }

    #[test]
    fn test_follow_up_due_ignores_followed_up_flag() {
        let mut nudged = app("nudged", 9, ApplicationStatus::Applied);
        nudged.followed_up = true;
        let stats = compute_stats(&[nudged], now());
        assert_eq!(stats.follow_up_due, 1);

        let insights = crate::insights::compute_insights(&stats, 5);
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, crate::insights::InsightKind::FollowUp);
    }
}
