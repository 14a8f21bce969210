use crate::infra::parse_instant;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use investor_desk::error::AppError;
use investor_desk::workflows::registry::{
    Applicant, ApplicantCsvImporter, QueueSnapshot, WorkflowPolicy,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct QueueReportArgs {
    /// Registry CSV export to summarize
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Evaluation instant (RFC 3339, defaults to now)
    #[arg(long, value_parser = parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Days a pending applicant may wait before being flagged overdue
    #[arg(long)]
    pub(crate) overdue_after_days: Option<i64>,
    /// Include a per-applicant listing in the output
    #[arg(long)]
    pub(crate) list: bool,
}

pub(crate) fn run_queue_report(args: QueueReportArgs) -> Result<(), AppError> {
    let QueueReportArgs {
        csv,
        now,
        overdue_after_days,
        list,
    } = args;

    let now = now.unwrap_or_else(Utc::now);
    let overdue_after = Duration::days(
        overdue_after_days.unwrap_or_else(|| WorkflowPolicy::default().overdue_after_days),
    );

    let applicants = ApplicantCsvImporter::from_path(&csv)?;
    let snapshot = QueueSnapshot::build(&applicants, now, overdue_after);

    print!("{}", render_queue_report(&snapshot, &applicants, overdue_after, list));
    Ok(())
}

pub(crate) fn render_queue_report(
    snapshot: &QueueSnapshot,
    applicants: &[Applicant],
    overdue_after: Duration,
    list: bool,
) -> String {
    let mut out = String::new();
    out.push_str("Verification queue\n");
    out.push_str(&format!(
        "Evaluated {} across {} applicant(s)\n",
        snapshot.evaluated_at.to_rfc3339(),
        snapshot.total
    ));

    out.push_str("\nBy status\n");
    for entry in &snapshot.general {
        out.push_str(&format!("- {}: {}\n", entry.status_label, entry.count));
    }

    out.push_str("\nWorkflow breakdown\n");
    for entry in &snapshot.internal {
        out.push_str(&format!("- {}: {}\n", entry.status_label, entry.count));
    }

    let trend = &snapshot.trend;
    out.push_str(&format!(
        "\nSubmissions: {} in the last 7 days vs {} ({}), {:+.1}%\n",
        trend.last_7_days,
        trend.baseline_count,
        trend.baseline.label(),
        trend.change_pct
    ));

    if snapshot.overdue.is_empty() {
        out.push_str(&format!(
            "\nOverdue (> {} days pending): none\n",
            overdue_after.num_days()
        ));
    } else {
        out.push_str(&format!(
            "\nOverdue (> {} days pending)\n",
            overdue_after.num_days()
        ));
        for view in &snapshot.overdue {
            out.push_str(&format!(
                "- {} {} <{}>: {} since {}\n",
                view.applicant_id,
                view.name,
                view.email,
                view.internal_status_label,
                view.submitted_at.date_naive()
            ));
        }
    }

    if list {
        out.push_str("\nApplicants\n");
        for applicant in applicants {
            let view = applicant.status_view(snapshot.evaluated_at, overdue_after);
            out.push_str(&format!(
                "- {} | {} | {} | {} | {}\n",
                view.applicant_id,
                view.name,
                view.registration_status,
                view.internal_status,
                view.general_status
            ));
        }
    }

    out
}
