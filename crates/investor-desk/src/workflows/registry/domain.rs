use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::verification::{
    is_overdue, resolve_internal_status, GeneralStatus, InternalStatus,
    ShareholdingsVerificationState, Terminal,
};

/// Identifier wrapper for registered investors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicantId(pub String);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reviewer-facing registration decision, independent of shareholdings verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
    FurtherInfo,
}

impl RegistrationStatus {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::FurtherInfo => "FURTHER_INFO",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            "FURTHER_INFO" => Some(Self::FurtherInfo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identification,
    ShareholdingStatement,
    ProofOfAddress,
    Misc,
}

/// Pointer to an uploaded document held by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub name: String,
    pub category: DocumentCategory,
    pub storage_key: String,
}

/// Registered investor as persisted in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub registration_status: RegistrationStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<DocumentReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<ShareholdingsVerificationState>,
}

impl Applicant {
    pub fn internal_status(&self, now: DateTime<Utc>) -> InternalStatus {
        resolve_internal_status(self.verification.as_ref(), now)
    }

    pub fn general_status(&self, now: DateTime<Utc>) -> GeneralStatus {
        self.internal_status(now).general()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        is_overdue(self.general_status(now), self.submitted_at, now, threshold)
    }

    pub fn status_view(&self, now: DateTime<Utc>, overdue_after: Duration) -> ApplicantStatusView {
        let internal = self.internal_status(now);
        let general = internal.general();
        let state = self.verification.as_ref();

        ApplicantStatusView {
            applicant_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            registration_status: self.registration_status.code(),
            internal_status: internal,
            internal_status_label: internal.label(),
            general_status: general,
            overdue: is_overdue(general, self.submitted_at, now, overdue_after),
            submitted_at: self.submitted_at,
            locked_until: state.and_then(|state| state.active_lock(now)),
            code_attempts_remaining: state.and_then(|state| match &state.terminal {
                Terminal::CodeIssued(code) if code.is_active(now) => Some(code.attempts_remaining),
                _ => None,
            }),
        }
    }
}

/// Sanitized status of an applicant for list and detail responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantStatusView {
    pub applicant_id: ApplicantId,
    pub name: String,
    pub email: String,
    pub registration_status: &'static str,
    pub internal_status: InternalStatus,
    pub internal_status_label: &'static str,
    pub general_status: GeneralStatus,
    pub overdue: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_attempts_remaining: Option<u32>,
}

/// Intake payload for a new investor registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentReference>,
}

/// Shareholding details supplied at step 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareholdingDetails {
    pub shareholding_id: String,
    #[serde(default)]
    pub company_name: Option<String>,
}
