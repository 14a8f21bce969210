use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Applicant, ApplicantId};

/// Document store abstraction so the service can be exercised without a hosted backend.
pub trait ApplicantRepository: Send + Sync {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError>;
    fn update(&self, applicant: Applicant) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn all(&self) -> Result<Vec<Applicant>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("applicant already exists")]
    Conflict,
    #[error("applicant not found")]
    NotFound,
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound email hook (onboarding invitations and verification codes).
pub trait InvitationSender: Send + Sync {
    fn send(&self, invitation: Invitation) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationTemplate {
    OnboardingInvitation,
    VerificationCode,
}

impl InvitationTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnboardingInvitation => "onboarding_invitation",
            Self::VerificationCode => "verification_code",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub template: InvitationTemplate,
    pub applicant_id: ApplicantId,
    pub recipient: String,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
}
