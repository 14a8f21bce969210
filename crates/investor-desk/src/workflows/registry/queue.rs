use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::{Applicant, ApplicantStatusView};
use crate::workflows::verification::{
    submission_trend, GeneralStatus, InternalStatus, SubmissionTrend,
};

#[derive(Debug, Clone, Serialize)]
pub struct GeneralStatusCount {
    pub status: GeneralStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InternalStatusCount {
    pub status: InternalStatus,
    pub status_label: &'static str,
    pub count: usize,
}

/// Dashboard view of the verification queue at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub evaluated_at: DateTime<Utc>,
    pub total: usize,
    pub general: Vec<GeneralStatusCount>,
    pub internal: Vec<InternalStatusCount>,
    pub overdue: Vec<ApplicantStatusView>,
    pub trend: SubmissionTrend,
}

impl QueueSnapshot {
    pub fn build(applicants: &[Applicant], now: DateTime<Utc>, overdue_after: Duration) -> Self {
        let mut internal_counts: HashMap<InternalStatus, usize> = HashMap::new();
        let mut overdue = Vec::new();

        for applicant in applicants {
            let view = applicant.status_view(now, overdue_after);
            *internal_counts.entry(view.internal_status).or_default() += 1;
            if view.overdue {
                overdue.push(view);
            }
        }

        let general = GeneralStatus::ordered()
            .into_iter()
            .map(|status| GeneralStatusCount {
                status,
                status_label: status.label(),
                count: internal_counts
                    .iter()
                    .filter(|(internal, _)| internal.general() == status)
                    .map(|(_, count)| *count)
                    .sum(),
            })
            .collect();

        let internal = InternalStatus::ALL
            .into_iter()
            .filter_map(|status| {
                internal_counts
                    .get(&status)
                    .map(|count| InternalStatusCount {
                        status,
                        status_label: status.label(),
                        count: *count,
                    })
            })
            .collect();

        overdue.sort_by_key(|view| view.submitted_at);

        Self {
            evaluated_at: now,
            total: applicants.len(),
            general,
            internal,
            overdue,
            trend: submission_trend(applicants.iter().map(|a| a.submitted_at), now),
        }
    }

    pub fn count(&self, status: GeneralStatus) -> usize {
        self.general
            .iter()
            .find(|entry| entry.status == status)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}
