use serde::{Deserialize, Serialize};
use std::fmt;

/// Fine-grained position of an applicant in the shareholdings verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
    EmailVerificationPending,
    ShareholdingsDeclined,
    RegistrationPending,
    #[serde(rename = "LOCKED_FOR_7_DAYS")]
    LockedFor7Days,
    ResubmissionRequired,
    AwaitingIroReview,
    AwaitingCodeIssuance,
    CodeSent,
    Verified,
    InProgress,
}

impl InternalStatus {
    pub const ALL: [Self; 10] = [
        Self::EmailVerificationPending,
        Self::ShareholdingsDeclined,
        Self::RegistrationPending,
        Self::LockedFor7Days,
        Self::ResubmissionRequired,
        Self::AwaitingIroReview,
        Self::AwaitingCodeIssuance,
        Self::CodeSent,
        Self::Verified,
        Self::InProgress,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::EmailVerificationPending => "EMAIL_VERIFICATION_PENDING",
            Self::ShareholdingsDeclined => "SHAREHOLDINGS_DECLINED",
            Self::RegistrationPending => "REGISTRATION_PENDING",
            Self::LockedFor7Days => "LOCKED_FOR_7_DAYS",
            Self::ResubmissionRequired => "RESUBMISSION_REQUIRED",
            Self::AwaitingIroReview => "AWAITING_IRO_REVIEW",
            Self::AwaitingCodeIssuance => "AWAITING_CODE_ISSUANCE",
            Self::CodeSent => "CODE_SENT",
            Self::Verified => "VERIFIED",
            Self::InProgress => "IN_PROGRESS",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::EmailVerificationPending => "Email verification pending",
            Self::ShareholdingsDeclined => "Shareholdings declined",
            Self::RegistrationPending => "Registration pending",
            Self::LockedFor7Days => "Locked for 7 days",
            Self::ResubmissionRequired => "Resubmission required",
            Self::AwaitingIroReview => "Awaiting IRO review",
            Self::AwaitingCodeIssuance => "Awaiting code issuance",
            Self::CodeSent => "Code sent",
            Self::Verified => "Verified",
            Self::InProgress => "In progress",
        }
    }

    /// Dashboard bucket for this status.
    pub const fn general(self) -> GeneralStatus {
        match self {
            Self::EmailVerificationPending | Self::ShareholdingsDeclined => {
                GeneralStatus::Unverified
            }
            Self::RegistrationPending
            | Self::LockedFor7Days
            | Self::ResubmissionRequired
            | Self::AwaitingIroReview
            | Self::AwaitingCodeIssuance
            | Self::CodeSent
            | Self::InProgress => GeneralStatus::Pending,
            Self::Verified => GeneralStatus::Verified,
        }
    }
}

impl fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Three-bucket projection used for queue filtering and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeneralStatus {
    Unverified,
    Pending,
    Verified,
}

impl GeneralStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Unverified, Self::Pending, Self::Verified]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Pending => "PENDING",
            Self::Verified => "VERIFIED",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Unverified => "Unverified",
            Self::Pending => "Pending",
            Self::Verified => "Verified",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unverified" => Some(Self::Unverified),
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }
}

impl fmt::Display for GeneralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
