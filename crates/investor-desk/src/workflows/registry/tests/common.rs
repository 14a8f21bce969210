use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::registry::domain::{
    Applicant, ApplicantId, RegistrationRequest, ShareholdingDetails,
};
use crate::workflows::registry::repository::{
    ApplicantRepository, Invitation, InvitationSender, InvitationTemplate, NotificationError,
    RepositoryError,
};
use crate::workflows::registry::router::registry_router;
use crate::workflows::registry::service::{VerificationService, WorkflowPolicy};
use crate::workflows::verification::MatchResult;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 14, 10, 0, 0).unwrap()
}

pub(super) fn registration() -> RegistrationRequest {
    RegistrationRequest {
        name: "Mary Jackson".to_string(),
        email: "mary@example.com".to_string(),
        phone: Some("+1 555 0199".to_string()),
        documents: Vec::new(),
    }
}

pub(super) fn details() -> ShareholdingDetails {
    ShareholdingDetails {
        shareholding_id: "SH-1187".to_string(),
        company_name: Some("Langley Aeronautics".to_string()),
    }
}

pub(super) fn policy() -> WorkflowPolicy {
    WorkflowPolicy {
        overdue_after_days: 3,
        max_failed_matches: 3,
        code_attempts: 2,
        code_ttl_minutes: 15,
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<ApplicantId, Applicant>>,
}

impl ApplicantRepository for MemoryRepository {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut guard = self.records.lock().unwrap();
        if guard.contains_key(&applicant.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(applicant.id.clone(), applicant.clone());
        Ok(applicant)
    }

    fn update(&self, applicant: Applicant) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().unwrap();
        match guard.get_mut(&applicant.id) {
            Some(existing) => {
                *existing = applicant;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch(&self, id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    fn all(&self) -> Result<Vec<Applicant>, RepositoryError> {
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }
}

pub(super) struct UnavailableRepository;

impl ApplicantRepository for UnavailableRepository {
    fn insert(&self, _applicant: Applicant) -> Result<Applicant, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn update(&self, _applicant: Applicant) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Applicant>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryOutbox {
    sent: Mutex<Vec<Invitation>>,
}

impl InvitationSender for MemoryOutbox {
    fn send(&self, invitation: Invitation) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(invitation);
        Ok(())
    }
}

impl MemoryOutbox {
    pub(super) fn sent(&self) -> Vec<Invitation> {
        self.sent.lock().unwrap().clone()
    }

    pub(super) fn last_code(&self) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|invitation| invitation.template == InvitationTemplate::VerificationCode)
            .and_then(|invitation| invitation.details.get("code").cloned())
    }
}

pub(super) struct FailingOutbox;

impl InvitationSender for FailingOutbox {
    fn send(&self, _invitation: Invitation) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

pub(super) type TestService = VerificationService<MemoryRepository, MemoryOutbox>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryOutbox>) {
    let repository = Arc::new(MemoryRepository::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let service = VerificationService::new(repository.clone(), outbox.clone(), policy());
    (service, repository, outbox)
}

/// Register an applicant and walk them up to an approved IRO review.
pub(super) fn reviewed_applicant(service: &TestService) -> Applicant {
    let applicant = service
        .register(registration(), now())
        .expect("registration succeeds");
    let id = applicant.id.clone();
    service.confirm_email(&id, now()).expect("email confirmed");
    service.record_opt_in(&id, true, now()).expect("opt in");
    service
        .submit_shareholding(&id, details(), now())
        .expect("details submitted");
    service
        .record_automated_match(&id, MatchResult::Match, now())
        .expect("automated match");
    service
        .record_review(&id, MatchResult::Match, "iro@example.com", now())
        .expect("review recorded")
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    registry_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
