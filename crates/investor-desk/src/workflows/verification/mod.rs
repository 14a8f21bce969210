//! Shareholdings verification: recorded progress, status derivation, and queue metrics.

pub mod domain;
pub mod metrics;
mod resolver;
mod status;

pub use domain::{
    lockout_period, AutomatedMatchStep, MatchResult, OneTimeCode, OptInStep, RecordedInstant,
    ReviewStep, ShareholdingSubmission, ShareholdingsVerificationState, Terminal,
    LOCKOUT_PERIOD_DAYS,
};
pub use metrics::{is_overdue, submission_trend, SubmissionTrend, TrendBaseline};
pub use resolver::{resolve_general_status, resolve_internal_status};
pub use status::{GeneralStatus, InternalStatus};
