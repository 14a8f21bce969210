use chrono::{DateTime, Utc};
use investor_desk::workflows::registry::{
    Applicant, ApplicantId, ApplicantRepository, Invitation, InvitationSender, NotificationError,
    RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicantRepository {
    records: Arc<Mutex<HashMap<ApplicantId, Applicant>>>,
}

impl InMemoryApplicantRepository {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<ApplicantId, Applicant>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn insert(&self, applicant: Applicant) -> Result<Applicant, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&applicant.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(applicant.id.clone(), applicant.clone());
        Ok(applicant)
    }

    fn update(&self, applicant: Applicant) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&applicant.id) {
            guard.insert(applicant.id.clone(), applicant);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<Applicant>, RepositoryError> {
        Ok(self.guard()?.values().cloned().collect())
    }
}

/// Outbox standing in for the email service; every message is kept and logged.
#[derive(Default, Clone)]
pub(crate) struct InMemoryInvitationOutbox {
    sent: Arc<Mutex<Vec<Invitation>>>,
}

impl InvitationSender for InMemoryInvitationOutbox {
    fn send(&self, invitation: Invitation) -> Result<(), NotificationError> {
        info!(
            template = invitation.template.label(),
            applicant = %invitation.applicant_id,
            recipient = %invitation.recipient,
            "invitation queued"
        );
        let mut guard = self
            .sent
            .lock()
            .map_err(|_| NotificationError::Transport("outbox mutex poisoned".to_string()))?;
        guard.push(invitation);
        Ok(())
    }
}

impl InMemoryInvitationOutbox {
    #[cfg(test)]
    pub(crate) fn sent(&self) -> Vec<Invitation> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
