use serde::Serialize;

use crate::reminders::Priority;
use crate::stats::{Direction, StatsSummary};

pub const LIST_INSIGHT_LIMIT: usize = 3;
pub const DASHBOARD_INSIGHT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightKind {
    ImproveResponseRate,
    InterviewMomentum,
    FollowUp,
    PaceSlowing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub priority: Priority,
    pub title: String,
    pub message: String,
}

// Rules run in this order; a stable sort on priority keeps it within a tier.
fn rules(stats: &StatsSummary) -> Vec<Insight> {
    let mut insights = Vec::new();

    if stats.response_rate < 20 && stats.total > 5 {
        insights.push(Insight {
            kind: InsightKind::ImproveResponseRate,
            priority: Priority::High,
            title: "Improve your response rate".to_string(),
            message: format!(
                "Only {}% of your {} applications have heard back. Tailor your resume to each \
                 posting and target roles that closely match your experience.",
                stats.response_rate, stats.total
            ),
        });
    }

    if stats.interview_rate > 25 && stats.interviews > 0 {
        insights.push(Insight {
            kind: InsightKind::InterviewMomentum,
            priority: Priority::Low,
            title: "Strong interview rate".to_string(),
            message: format!(
                "{}% of your applications reached the interview stage. Keep applying to \
                 similar roles.",
                stats.interview_rate
            ),
        });
    }

    if stats.follow_up_due > 0 {
        insights.push(Insight {
            kind: InsightKind::FollowUp,
            priority: Priority::Medium,
            title: "Time to follow up".to_string(),
            message: format!(
                "{} application{} sent 7 to 14 days ago {} had no response yet. A short \
                 follow-up note can move them forward.",
                stats.follow_up_due,
                if stats.follow_up_due == 1 { "" } else { "s" },
                if stats.follow_up_due == 1 { "has" } else { "have" }
            ),
        });
    }

    let change = stats.weekly_change;
    if change.direction == Direction::Decrease && change.value > 3 {
        insights.push(Insight {
            kind: InsightKind::PaceSlowing,
            priority: Priority::Medium,
            title: "Application pace is slowing".to_string(),
            message: format!(
                "You sent {} fewer applications this week than last week. Set a daily target \
                 to keep your pipeline full.",
                change.value
            ),
        });
    }

    insights
}

/// Advisory messages for a summary, at most `limit`, high priority first.
pub fn compute_insights(stats: &StatsSummary, limit: usize) -> Vec<Insight> {
    let mut insights = rules(stats);
    insights.sort_by_key(|insight| insight.priority);
    insights.truncate(limit);
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::WeeklyChange;

    fn kinds(insights: &[Insight]) -> Vec<InsightKind> {
        insights.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_no_insights_for_empty_summary() {
        assert!(compute_insights(&StatsSummary::default(), DASHBOARD_INSIGHT_LIMIT).is_empty());
    }

    #[test]
    fn test_low_response_rate_needs_more_than_five() {
        let mut stats = StatsSummary {
            total: 5,
            response_rate: 0,
            ..Default::default()
        };
        assert!(compute_insights(&stats, 5).is_empty());

        stats.total = 6;
        assert_eq!(
            kinds(&compute_insights(&stats, 5)),
            vec![InsightKind::ImproveResponseRate]
        );
    }

    #[test]
    fn test_interview_momentum_requires_an_interview() {
        let stats = StatsSummary {
            total: 3,
            interviews: 0,
            interview_rate: 40,
            ..Default::default()
        };
        assert!(compute_insights(&stats, 5).is_empty());

        let stats = StatsSummary {
            interviews: 2,
            ..stats
        };
        assert_eq!(
            kinds(&compute_insights(&stats, 5)),
            vec![InsightKind::InterviewMomentum]
        );
    }

    #[test]
    fn test_pace_slowing_only_beyond_three() {
        let mut stats = StatsSummary {
            weekly_change: WeeklyChange {
                direction: Direction::Decrease,
                value: 3,
            },
            ..Default::default()
        };
        assert!(compute_insights(&stats, 5).is_empty());

        stats.weekly_change.value = 4;
        assert_eq!(kinds(&compute_insights(&stats, 5)), vec![InsightKind::PaceSlowing]);
    }

    #[test]
    fn test_priority_order_and_truncation() {
        let stats = StatsSummary {
            total: 10,
            interviews: 3,
            response_rate: 10,
            interview_rate: 30,
            follow_up_due: 2,
            weekly_change: WeeklyChange {
                direction: Direction::Decrease,
                value: 5,
            },
            ..Default::default()
        };

        let all = compute_insights(&stats, DASHBOARD_INSIGHT_LIMIT);
        assert_eq!(
            kinds(&all),
            vec![
                InsightKind::ImproveResponseRate,
                InsightKind::FollowUp,
                InsightKind::PaceSlowing,
                InsightKind::InterviewMomentum,
            ]
        );

        let top = compute_insights(&stats, LIST_INSIGHT_LIMIT);
        assert_eq!(top.len(), 3);
        assert_eq!(top[2].kind, InsightKind::PaceSlowing);
        assert!(top[1].message.contains("2 applications"));
    }
}
