use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    Applicant, ApplicantId, RegistrationRequest, RegistrationStatus, ShareholdingDetails,
};
use super::repository::{ApplicantRepository, InvitationSender, RepositoryError};
use super::service::{VerificationService, VerificationServiceError};
use crate::workflows::verification::{GeneralStatus, MatchResult};

type SharedService<R, N> = Arc<VerificationService<R, N>>;

/// Router exposing registration, verification steps, and the review queue.
pub fn registry_router<R, N>(service: SharedService<R, N>) -> Router
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    Router::new()
        .route(
            "/api/v1/applicants",
            post(register_handler::<R, N>).get(list_handler::<R, N>),
        )
        .route("/api/v1/applicants/:applicant_id", get(status_handler::<R, N>))
        .route(
            "/api/v1/applicants/:applicant_id/registration-status",
            put(registration_status_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/email",
            post(confirm_email_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/opt-in",
            post(opt_in_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/shareholding",
            post(shareholding_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/automated-match",
            post(automated_match_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/review",
            post(review_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/code",
            post(issue_code_handler::<R, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/verification/code/confirm",
            post(confirm_code_handler::<R, N>),
        )
        .route("/api/v1/dashboard/queue", get(queue_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptInRequest {
    pub(crate) wants_verification: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MatchRequest {
    pub(crate) result: MatchResult,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) result: MatchResult,
    pub(crate) reviewer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CodeConfirmation {
    pub(crate) code: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistrationStatusRequest {
    pub(crate) status: RegistrationStatus,
}

pub(crate) async fn register_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Json(request): Json<RegistrationRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let now = Utc::now();
    match service.register(request, now) {
        Ok(applicant) => (
            StatusCode::CREATED,
            Json(service.status_view(&applicant, now)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let filter = match query.status.as_deref() {
        None => None,
        Some(raw) => match GeneralStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                let payload = json!({
                    "error": format!("unknown status filter '{raw}'"),
                });
                return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
            }
        },
    };

    let now = Utc::now();
    match service.list(filter, now) {
        Ok(applicants) => {
            let views: Vec<_> = applicants
                .iter()
                .map(|applicant| service.status_view(applicant, now))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(&service, service.get(&id))
}

pub(crate) async fn registration_status_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(request): Json<RegistrationStatusRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(
        &service,
        service.set_registration_status(&id, request.status, Utc::now()),
    )
}

pub(crate) async fn confirm_email_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(&service, service.confirm_email(&id, Utc::now()))
}

pub(crate) async fn opt_in_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(request): Json<OptInRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(
        &service,
        service.record_opt_in(&id, request.wants_verification, Utc::now()),
    )
}

pub(crate) async fn shareholding_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(details): Json<ShareholdingDetails>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(
        &service,
        service.submit_shareholding(&id, details, Utc::now()),
    )
}

pub(crate) async fn automated_match_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(request): Json<MatchRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(
        &service,
        service.record_automated_match(&id, request.result, Utc::now()),
    )
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(
        &service,
        service.record_review(&id, request.result, &request.reviewer, Utc::now()),
    )
}

pub(crate) async fn issue_code_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(&service, service.issue_code(&id, Utc::now()))
}

pub(crate) async fn confirm_code_handler<R, N>(
    State(service): State<SharedService<R, N>>,
    Path(applicant_id): Path<String>,
    Json(request): Json<CodeConfirmation>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    let id = ApplicantId(applicant_id);
    respond(&service, service.confirm_code(&id, &request.code, Utc::now()))
}

pub(crate) async fn queue_handler<R, N>(State(service): State<SharedService<R, N>>) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    match service.queue(Utc::now()) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

fn respond<R, N>(
    service: &VerificationService<R, N>,
    result: Result<Applicant, VerificationServiceError>,
) -> Response
where
    R: ApplicantRepository + 'static,
    N: InvitationSender + 'static,
{
    match result {
        Ok(applicant) => {
            let view = service.status_view(&applicant, Utc::now());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: VerificationServiceError) -> Response {
    let status = match &error {
        VerificationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VerificationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        VerificationServiceError::InvalidRegistration
        | VerificationServiceError::InvalidTransition { .. }
        | VerificationServiceError::CodeRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        VerificationServiceError::Locked { .. } => StatusCode::LOCKED,
        VerificationServiceError::Repository(RepositoryError::Unavailable(_))
        | VerificationServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
