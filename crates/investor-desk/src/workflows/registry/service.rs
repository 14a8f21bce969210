use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    Applicant, ApplicantId, ApplicantStatusView, RegistrationRequest, RegistrationStatus,
    ShareholdingDetails,
};
use super::queue::QueueSnapshot;
use super::repository::{
    ApplicantRepository, Invitation, InvitationSender, InvitationTemplate, NotificationError,
    RepositoryError,
};
use crate::workflows::verification::{
    lockout_period, metrics::DEFAULT_OVERDUE_AFTER_DAYS, GeneralStatus, MatchResult, OneTimeCode,
    OptInStep, RecordedInstant, ReviewStep, ShareholdingSubmission,
    ShareholdingsVerificationState, Terminal,
};

/// Thresholds driving lockout, code issuance, and queue aging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    pub overdue_after_days: i64,
    pub max_failed_matches: u32,
    pub code_attempts: u32,
    pub code_ttl_minutes: i64,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            overdue_after_days: DEFAULT_OVERDUE_AFTER_DAYS,
            max_failed_matches: 3,
            code_attempts: 3,
            code_ttl_minutes: 30,
        }
    }
}

impl WorkflowPolicy {
    pub fn overdue_threshold(&self) -> Duration {
        Duration::days(self.overdue_after_days)
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::minutes(self.code_ttl_minutes)
    }
}

/// Service applying verification steps to applicants held in the document store.
pub struct VerificationService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    policy: WorkflowPolicy,
}

static APPLICANT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_applicant_id() -> ApplicantId {
    let id = APPLICANT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicantId(format!("inv-{id:06}"))
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

impl<R, N> VerificationService<R, N>
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, policy: WorkflowPolicy) -> Self {
        Self {
            repository,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn status_view(&self, applicant: &Applicant, now: DateTime<Utc>) -> ApplicantStatusView {
        applicant.status_view(now, self.policy.overdue_threshold())
    }

    /// Register a new investor and send the onboarding invitation. A failed send is logged and
    /// does not undo the registration.
    pub fn register(
        &self,
        request: RegistrationRequest,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        let RegistrationRequest {
            name,
            email,
            phone,
            documents,
        } = request;

        if name.trim().is_empty() || !email.contains('@') {
            return Err(VerificationServiceError::InvalidRegistration);
        }

        let mut applicant = Applicant {
            id: next_applicant_id(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone,
            registration_status: RegistrationStatus::Pending,
            submitted_at: now,
            last_activity_at: Some(now),
            documents,
            verification: None,
        };

        // Imported records may already hold ids from the sequence.
        let stored = loop {
            match self.repository.insert(applicant.clone()) {
                Err(RepositoryError::Conflict) => {
                    debug!(applicant = %applicant.id, "applicant id already taken");
                    applicant.id = next_applicant_id();
                }
                result => break result?,
            }
        };
        info!(applicant = %stored.id, "investor registered");

        let mut details = BTreeMap::new();
        details.insert("name".to_string(), stored.name.clone());
        let invitation = Invitation {
            template: InvitationTemplate::OnboardingInvitation,
            applicant_id: stored.id.clone(),
            recipient: stored.email.clone(),
            details,
        };
        if let Err(error) = self.notifier.send(invitation) {
            warn!(applicant = %stored.id, %error, "onboarding invitation not sent");
        }

        Ok(stored)
    }

    /// Import an applicant record as-is, e.g. when seeding from a registry export.
    pub fn import(&self, applicant: Applicant) -> Result<Applicant, VerificationServiceError> {
        let stored = self.repository.insert(applicant)?;
        debug!(applicant = %stored.id, "applicant imported");
        Ok(stored)
    }

    /// Start the verification record once the applicant confirmed their email address.
    pub fn confirm_email(
        &self,
        id: &ApplicantId,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        self.mutate(id, now, |applicant| {
            applicant.verification.get_or_insert_with(Default::default);
            Ok(())
        })
    }

    pub fn record_opt_in(
        &self,
        id: &ApplicantId,
        wants_verification: bool,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        self.mutate(id, now, |applicant| {
            let state = started(applicant)?;
            if state.shareholding_submitted() {
                return Err(invalid("shareholding details already submitted"));
            }
            state.step1 = Some(OptInStep {
                wants_verification: Some(wants_verification),
            });
            Ok(())
        })
    }

    /// Record (or replace) the shareholding details. A re-submission discards later results but
    /// keeps the failure counter and any active lock.
    pub fn submit_shareholding(
        &self,
        id: &ApplicantId,
        details: ShareholdingDetails,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        if details.shareholding_id.trim().is_empty() {
            return Err(invalid("shareholding id is required"));
        }

        self.mutate(id, now, |applicant| {
            let state = started(applicant)?;
            if state.wants_verification() != Some(true) {
                return Err(invalid("applicant has not opted in to verification"));
            }
            ensure_unlocked(state, now)?;

            state.step2 = Some(ShareholdingSubmission {
                shareholding_id: details.shareholding_id.trim().to_string(),
                company_name: details.company_name,
                submitted_at: Some(now.into()),
            });
            if let Some(step3) = state.step3.as_mut() {
                step3.last_result = None;
            }
            state.step4 = None;
            state.terminal = Terminal::Unresolved;
            Ok(())
        })
    }

    /// Apply the automated registry match. Reaching the failure limit locks the applicant.
    pub fn record_automated_match(
        &self,
        id: &ApplicantId,
        result: MatchResult,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        let max_failed = self.policy.max_failed_matches.max(1);

        self.mutate(id, now, |applicant| {
            let applicant_id = applicant.id.clone();
            let state = started(applicant)?;
            if state.step2.is_none() {
                return Err(invalid("shareholding details not submitted"));
            }
            ensure_unlocked(state, now)?;
            if state.automated_result().is_some() {
                return Err(invalid("awaiting resubmission of shareholding details"));
            }

            let step3 = state.step3.get_or_insert_with(Default::default);
            step3.last_result = Some(result);
            match result {
                MatchResult::Match => {
                    step3.failed_attempts = 0;
                    step3.locked_until = None;
                }
                MatchResult::NoMatch => {
                    step3.failed_attempts += 1;
                    if step3.failed_attempts >= max_failed {
                        let until = now + lockout_period();
                        step3.locked_until = Some(until.into());
                        step3.failed_attempts = 0;
                        warn!(applicant = %applicant_id, %until, "verification locked after repeated failed matches");
                    }
                }
            }
            state.step4 = None;
            state.terminal = Terminal::Unresolved;
            Ok(())
        })
    }

    /// Record the IRO decision on an automatically matched shareholding.
    pub fn record_review(
        &self,
        id: &ApplicantId,
        result: MatchResult,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        self.mutate(id, now, |applicant| {
            let state = started(applicant)?;
            ensure_unlocked(state, now)?;
            if state.automated_result() != Some(MatchResult::Match) {
                return Err(invalid("automated match has not succeeded"));
            }
            if matches!(state.terminal, Terminal::Verified { .. }) {
                return Err(invalid("applicant already verified"));
            }

            state.step4 = Some(ReviewStep {
                last_result: Some(result),
                reviewed_by: Some(reviewer.to_string()),
                reviewed_at: Some(now.into()),
            });
            state.terminal = Terminal::Unresolved;
            Ok(())
        })
    }

    /// Issue a fresh one-time code, replacing any previous one, and email it. The stored record is
    /// restored when the email cannot be sent.
    pub fn issue_code(
        &self,
        id: &ApplicantId,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        let code = generate_code();
        let expires_at = now + self.policy.code_ttl();
        let attempts = self.policy.code_attempts.max(1);

        let previous = self.load(id)?;
        let applicant = self.mutate(id, now, |applicant| {
            let state = started(applicant)?;
            if state.review_result() != Some(MatchResult::Match) {
                return Err(invalid("reviewer has not approved the shareholding"));
            }
            if matches!(state.terminal, Terminal::Verified { .. }) {
                return Err(invalid("applicant already verified"));
            }

            state.terminal = Terminal::CodeIssued(OneTimeCode {
                code: code.clone(),
                attempts_remaining: attempts,
                issued_at: Some(now.into()),
                expires_at: Some(expires_at.into()),
                invalidated_at: None,
            });
            Ok(())
        })?;

        let mut details = BTreeMap::new();
        details.insert("code".to_string(), code);
        details.insert("expires_at".to_string(), RecordedInstant::from(expires_at).0);
        let sent = self.notifier.send(Invitation {
            template: InvitationTemplate::VerificationCode,
            applicant_id: applicant.id.clone(),
            recipient: applicant.email.clone(),
            details,
        });
        if let Err(error) = sent {
            warn!(
                applicant = %applicant.id,
                %error,
                "verification code not sent, keeping previous record"
            );
            self.repository.update(previous)?;
            return Err(error.into());
        }
        info!(applicant = %applicant.id, "verification code issued");

        Ok(applicant)
    }

    /// Check a code entered by the applicant. A mismatch spends one attempt; the last attempt
    /// invalidates the code.
    pub fn confirm_code(
        &self,
        id: &ApplicantId,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        let mut applicant = self.load(id)?;
        let state = started(&mut applicant)?;

        let Terminal::CodeIssued(code) = &mut state.terminal else {
            return Err(invalid("no active verification code"));
        };
        if !code.is_active(now) {
            return Err(invalid("no active verification code"));
        }

        let outcome = if !code.code.is_empty() && code.code == submitted.trim() {
            state.terminal = Terminal::Verified { at: now.into() };
            Ok(())
        } else {
            code.attempts_remaining = code.attempts_remaining.saturating_sub(1);
            if code.attempts_remaining == 0 {
                code.invalidated_at = Some(now.into());
            }
            Err(VerificationServiceError::CodeRejected {
                attempts_remaining: code.attempts_remaining,
            })
        };

        applicant.last_activity_at = Some(now);
        self.repository.update(applicant.clone())?;
        outcome?;

        info!(applicant = %applicant.id, "shareholdings verified");
        Ok(applicant)
    }

    pub fn set_registration_status(
        &self,
        id: &ApplicantId,
        status: RegistrationStatus,
        now: DateTime<Utc>,
    ) -> Result<Applicant, VerificationServiceError> {
        self.mutate(id, now, |applicant| {
            applicant.registration_status = status;
            Ok(())
        })
    }

    pub fn get(&self, id: &ApplicantId) -> Result<Applicant, VerificationServiceError> {
        self.load(id)
    }

    /// Applicants ordered by submission time, optionally restricted to one dashboard bucket.
    pub fn list(
        &self,
        filter: Option<GeneralStatus>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Applicant>, VerificationServiceError> {
        let mut applicants: Vec<Applicant> = self
            .repository
            .all()?
            .into_iter()
            .filter(|applicant| filter.map_or(true, |bucket| applicant.general_status(now) == bucket))
            .collect();
        applicants.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(applicants)
    }

    pub fn queue(&self, now: DateTime<Utc>) -> Result<QueueSnapshot, VerificationServiceError> {
        let applicants = self.list(None, now)?;
        Ok(QueueSnapshot::build(
            &applicants,
            now,
            self.policy.overdue_threshold(),
        ))
    }

    fn load(&self, id: &ApplicantId) -> Result<Applicant, VerificationServiceError> {
        let applicant = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(applicant)
    }

    fn mutate<F>(
        &self,
        id: &ApplicantId,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<Applicant, VerificationServiceError>
    where
        F: FnOnce(&mut Applicant) -> Result<(), VerificationServiceError>,
    {
        let mut applicant = self.load(id)?;
        apply(&mut applicant)?;
        applicant.last_activity_at = Some(now);
        self.repository.update(applicant.clone())?;
        debug!(
            applicant = %applicant.id,
            status = %applicant.internal_status(now),
            "verification record updated"
        );
        Ok(applicant)
    }
}

fn started(
    applicant: &mut Applicant,
) -> Result<&mut ShareholdingsVerificationState, VerificationServiceError> {
    applicant
        .verification
        .as_mut()
        .ok_or_else(|| invalid("email address not confirmed"))
}

fn ensure_unlocked(
    state: &ShareholdingsVerificationState,
    now: DateTime<Utc>,
) -> Result<(), VerificationServiceError> {
    match state.active_lock(now) {
        Some(until) => Err(VerificationServiceError::Locked { until }),
        None => Ok(()),
    }
}

fn invalid(reason: &'static str) -> VerificationServiceError {
    VerificationServiceError::InvalidTransition { reason }
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationServiceError {
    #[error("registration requires a name and a valid email address")]
    InvalidRegistration,
    #[error("invalid verification step: {reason}")]
    InvalidTransition { reason: &'static str },
    #[error("verification locked until {until}")]
    Locked { until: DateTime<Utc> },
    #[error("verification code rejected ({attempts_remaining} attempt(s) remaining)")]
    CodeRejected { attempts_remaining: u32 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
}
