use super::domain::{MatchResult, ShareholdingsVerificationState, Terminal};
use super::status::{GeneralStatus, InternalStatus};
use chrono::{DateTime, Utc};

/// Derive the workflow status of an applicant from their recorded verification progress.
///
/// Rules are evaluated in order and the first match wins. Every input, including a missing or
/// inconsistent record, maps to a status.
pub fn resolve_internal_status(
    state: Option<&ShareholdingsVerificationState>,
    now: DateTime<Utc>,
) -> InternalStatus {
    let Some(state) = state else {
        return InternalStatus::EmailVerificationPending;
    };

    match state.wants_verification() {
        Some(false) => return InternalStatus::ShareholdingsDeclined,
        Some(true) if !state.shareholding_submitted() => {
            return InternalStatus::RegistrationPending
        }
        _ => {}
    }

    if state.active_lock(now).is_some() {
        return InternalStatus::LockedFor7Days;
    }

    match state.automated_result() {
        Some(MatchResult::NoMatch) => return InternalStatus::ResubmissionRequired,
        Some(MatchResult::Match) if state.step4.is_none() => {
            return InternalStatus::AwaitingIroReview
        }
        _ => {}
    }

    match state.review_result() {
        Some(MatchResult::Match) => match &state.terminal {
            Terminal::Verified { .. } => InternalStatus::Verified,
            Terminal::CodeIssued(code) if code.is_active(now) => InternalStatus::CodeSent,
            Terminal::CodeIssued(_) | Terminal::Unresolved => InternalStatus::AwaitingCodeIssuance,
        },
        Some(MatchResult::NoMatch) => InternalStatus::ShareholdingsDeclined,
        None => InternalStatus::InProgress,
    }
}

pub fn resolve_general_status(
    state: Option<&ShareholdingsVerificationState>,
    now: DateTime<Utc>,
) -> GeneralStatus {
    resolve_internal_status(state, now).general()
}
