use super::status::GeneralStatus;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const DEFAULT_OVERDUE_AFTER_DAYS: i64 = 3;
pub const TREND_WINDOW_DAYS: i64 = 7;

/// Pending applicants become overdue once they have waited strictly longer than `threshold`.
pub fn is_overdue(
    general: GeneralStatus,
    submitted_at: DateTime<Utc>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    general == GeneralStatus::Pending && now.signed_duration_since(submitted_at) > threshold
}

/// Which bucket the last week of submissions was compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendBaseline {
    PreviousWeek,
    OlderThanWeek,
}

impl TrendBaseline {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreviousWeek => "previous 7 days",
            Self::OlderThanWeek => "older than 7 days",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionTrend {
    pub last_7_days: usize,
    pub baseline: TrendBaseline,
    pub baseline_count: usize,
    pub change_pct: f64,
}

/// Week-over-week change in submissions.
///
/// Submissions in `(now - 7d, now]` are compared against `(now - 14d, now - 7d]`; when that
/// window is empty everything at or before `now - 7d` is used instead. Future timestamps are
/// ignored.
pub fn submission_trend<I>(submissions: I, now: DateTime<Utc>) -> SubmissionTrend
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let window = Duration::days(TREND_WINDOW_DAYS);
    let week_start = now - window;
    let previous_start = week_start - window;

    let mut recent = 0usize;
    let mut previous = 0usize;
    let mut older = 0usize;

    for submitted_at in submissions {
        if submitted_at > now {
            continue;
        }
        if submitted_at > week_start {
            recent += 1;
        } else {
            older += 1;
            if submitted_at > previous_start {
                previous += 1;
            }
        }
    }

    let (baseline, baseline_count) = if previous > 0 {
        (TrendBaseline::PreviousWeek, previous)
    } else {
        (TrendBaseline::OlderThanWeek, older)
    };

    SubmissionTrend {
        last_7_days: recent,
        baseline,
        baseline_count,
        change_pct: percentage_change(recent, baseline_count),
    }
}

fn percentage_change(current: usize, baseline: usize) -> f64 {
    if baseline == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    (current as f64 - baseline as f64) / baseline as f64 * 100.0
}
