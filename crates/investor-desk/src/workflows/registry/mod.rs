//! Investor registry: applicant records, the verification workflow service, and its HTTP surface.

pub mod domain;
pub mod import;
pub mod queue;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Applicant, ApplicantId, ApplicantStatusView, DocumentCategory, DocumentReference,
    RegistrationRequest, RegistrationStatus, ShareholdingDetails,
};
pub use import::{ApplicantCsvImporter, ApplicantImportError};
pub use queue::{GeneralStatusCount, InternalStatusCount, QueueSnapshot};
pub use repository::{
    ApplicantRepository, Invitation, InvitationSender, InvitationTemplate, NotificationError,
    RepositoryError,
};
pub use router::registry_router;
pub use service::{VerificationService, VerificationServiceError, WorkflowPolicy};
