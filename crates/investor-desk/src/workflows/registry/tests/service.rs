use super::common::*;
use chrono::Duration;
use std::sync::Arc;

use crate::workflows::registry::domain::{ApplicantId, RegistrationStatus};
use crate::workflows::registry::repository::{ApplicantRepository, InvitationTemplate};
use crate::workflows::registry::service::{VerificationService, VerificationServiceError};
use crate::workflows::verification::{
    GeneralStatus, InternalStatus, MatchResult, Terminal, LOCKOUT_PERIOD_DAYS,
};

#[test]
fn register_stores_applicant_and_sends_invitation() {
    let (service, repository, outbox) = build_service();

    let applicant = service
        .register(registration(), now())
        .expect("registration succeeds");

    let stored = repository
        .fetch(&applicant.id)
        .expect("fetch succeeds")
        .expect("applicant stored");
    assert_eq!(stored.registration_status, RegistrationStatus::Pending);
    assert!(stored.verification.is_none());
    assert_eq!(
        stored.internal_status(now()),
        InternalStatus::EmailVerificationPending
    );

    let sent = outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, InvitationTemplate::OnboardingInvitation);
    assert_eq!(sent[0].recipient, "mary@example.com");
}

#[test]
fn register_rejects_missing_email() {
    let (service, _, outbox) = build_service();
    let mut request = registration();
    request.email = "not-an-address".to_string();

    match service.register(request, now()) {
        Err(VerificationServiceError::InvalidRegistration) => {}
        other => panic!("expected invalid registration, got {other:?}"),
    }
    assert!(outbox.sent().is_empty());
}

#[test]
fn steps_require_confirmed_email() {
    let (service, _, _) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");

    match service.record_opt_in(&applicant.id, true, now()) {
        Err(VerificationServiceError::InvalidTransition { reason }) => {
            assert!(reason.contains("email"));
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn opting_out_declines_verification() {
    let (service, _, _) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");
    service
        .confirm_email(&applicant.id, now())
        .expect("email confirmed");

    let declined = service
        .record_opt_in(&applicant.id, false, now())
        .expect("opt out recorded");
    assert_eq!(
        declined.internal_status(now()),
        InternalStatus::ShareholdingsDeclined
    );
    assert_eq!(declined.general_status(now()), GeneralStatus::Unverified);

    match service.submit_shareholding(&applicant.id, details(), now()) {
        Err(VerificationServiceError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn full_workflow_reaches_verified() {
    let (service, _, outbox) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");
    let id = applicant.id.clone();

    let confirmed = service.confirm_email(&id, now()).expect("email confirmed");
    assert_eq!(confirmed.internal_status(now()), InternalStatus::InProgress);

    let opted_in = service.record_opt_in(&id, true, now()).expect("opt in");
    assert_eq!(
        opted_in.internal_status(now()),
        InternalStatus::RegistrationPending
    );

    service
        .submit_shareholding(&id, details(), now())
        .expect("details submitted");
    let matched = service
        .record_automated_match(&id, MatchResult::Match, now())
        .expect("automated match");
    assert_eq!(
        matched.internal_status(now()),
        InternalStatus::AwaitingIroReview
    );

    let reviewed = service
        .record_review(&id, MatchResult::Match, "iro@example.com", now())
        .expect("review");
    assert_eq!(
        reviewed.internal_status(now()),
        InternalStatus::AwaitingCodeIssuance
    );

    let issued = service.issue_code(&id, now()).expect("code issued");
    assert_eq!(issued.internal_status(now()), InternalStatus::CodeSent);

    let code = outbox.last_code().expect("code emailed");
    assert_eq!(code.len(), 6);

    let verified = service
        .confirm_code(&id, &code, now() + Duration::minutes(5))
        .expect("code accepted");
    assert_eq!(verified.internal_status(now()), InternalStatus::Verified);
    assert_eq!(verified.general_status(now()), GeneralStatus::Verified);
}

#[test]
fn repeated_failed_matches_lock_for_seven_days() {
    let (service, repository, _) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");
    let id = applicant.id.clone();
    service.confirm_email(&id, now()).expect("email confirmed");
    service.record_opt_in(&id, true, now()).expect("opt in");
    service
        .submit_shareholding(&id, details(), now())
        .expect("details submitted");

    let first = service
        .record_automated_match(&id, MatchResult::NoMatch, now())
        .expect("first failure");
    assert_eq!(
        first.internal_status(now()),
        InternalStatus::ResubmissionRequired
    );

    service
        .submit_shareholding(&id, details(), now())
        .expect("resubmitted");
    service
        .record_automated_match(&id, MatchResult::NoMatch, now())
        .expect("second failure");
    service
        .submit_shareholding(&id, details(), now())
        .expect("resubmitted again");
    let locked = service
        .record_automated_match(&id, MatchResult::NoMatch, now())
        .expect("third failure");

    assert_eq!(locked.internal_status(now()), InternalStatus::LockedFor7Days);
    let view = service.status_view(&locked, now());
    assert_eq!(
        view.locked_until,
        Some(now() + Duration::days(LOCKOUT_PERIOD_DAYS))
    );

    match service.submit_shareholding(&id, details(), now() + Duration::days(1)) {
        Err(VerificationServiceError::Locked { until }) => {
            assert_eq!(until, now() + Duration::days(LOCKOUT_PERIOD_DAYS));
        }
        other => panic!("expected lock, got {other:?}"),
    }

    let after_lock = now() + Duration::days(LOCKOUT_PERIOD_DAYS);
    let stored = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("applicant stored");
    assert_eq!(
        stored.internal_status(after_lock),
        InternalStatus::ResubmissionRequired
    );
    service
        .submit_shareholding(&id, details(), after_lock)
        .expect("resubmission allowed after lock");
}

#[test]
fn review_requires_successful_automated_match() {
    let (service, _, _) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");
    let id = applicant.id.clone();
    service.confirm_email(&id, now()).expect("email confirmed");
    service.record_opt_in(&id, true, now()).expect("opt in");
    service
        .submit_shareholding(&id, details(), now())
        .expect("details submitted");

    match service.record_review(&id, MatchResult::Match, "iro@example.com", now()) {
        Err(VerificationServiceError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn rejected_review_declines_and_blocks_code_issuance() {
    let (service, _, _) = build_service();
    let applicant = reviewed_applicant(&service);
    let declined = service
        .record_review(&applicant.id, MatchResult::NoMatch, "iro@example.com", now())
        .expect("review replaced");
    assert_eq!(
        declined.internal_status(now()),
        InternalStatus::ShareholdingsDeclined
    );

    match service.issue_code(&applicant.id, now()) {
        Err(VerificationServiceError::InvalidTransition { .. }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn wrong_codes_spend_attempts_until_invalidated() {
    let (service, repository, outbox) = build_service();
    let applicant = reviewed_applicant(&service);
    service.issue_code(&applicant.id, now()).expect("code issued");
    let code = outbox.last_code().expect("code emailed");
    let wrong = if code == "000000" { "111111" } else { "000000" };

    match service.confirm_code(&applicant.id, wrong, now()) {
        Err(VerificationServiceError::CodeRejected { attempts_remaining }) => {
            assert_eq!(attempts_remaining, 1);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    match service.confirm_code(&applicant.id, wrong, now()) {
        Err(VerificationServiceError::CodeRejected { attempts_remaining }) => {
            assert_eq!(attempts_remaining, 0);
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    let stored = repository
        .fetch(&applicant.id)
        .expect("fetch succeeds")
        .expect("applicant stored");
    match &stored.verification.as_ref().expect("state").terminal {
        Terminal::CodeIssued(code) => assert!(code.invalidated_at.is_some()),
        other => panic!("expected issued code, got {other:?}"),
    }
    assert_eq!(
        stored.internal_status(now()),
        InternalStatus::AwaitingCodeIssuance
    );

    match service.confirm_code(&applicant.id, &code, now()) {
        Err(VerificationServiceError::InvalidTransition { .. }) => {}
        other => panic!("expected spent code to be refused, got {other:?}"),
    }
}

#[test]
fn expired_code_is_refused() {
    let (service, _, outbox) = build_service();
    let applicant = reviewed_applicant(&service);
    service.issue_code(&applicant.id, now()).expect("code issued");
    let code = outbox.last_code().expect("code emailed");

    let later = now() + Duration::minutes(policy().code_ttl_minutes);
    match service.confirm_code(&applicant.id, &code, later) {
        Err(VerificationServiceError::InvalidTransition { .. }) => {}
        other => panic!("expected expired code to be refused, got {other:?}"),
    }

    let reissued = service.issue_code(&applicant.id, later).expect("reissued");
    assert_eq!(reissued.internal_status(later), InternalStatus::CodeSent);
}

#[test]
fn list_filters_by_general_status() {
    let (service, _, _) = build_service();
    let pending = reviewed_applicant(&service);
    let unverified = service.register(registration(), now()).expect("registered");

    let only_pending = service
        .list(Some(GeneralStatus::Pending), now())
        .expect("list succeeds");
    assert_eq!(only_pending.len(), 1);
    assert_eq!(only_pending[0].id, pending.id);

    let only_unverified = service
        .list(Some(GeneralStatus::Unverified), now())
        .expect("list succeeds");
    assert_eq!(only_unverified.len(), 1);
    assert_eq!(only_unverified[0].id, unverified.id);

    assert_eq!(service.list(None, now()).expect("list").len(), 2);
}

#[test]
fn queue_counts_overdue_pending_applicants() {
    let (service, _, _) = build_service();
    reviewed_applicant(&service);
    service.register(registration(), now()).expect("registered");

    let later = now() + Duration::days(4);
    let snapshot = service.queue(later).expect("queue builds");
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.count(GeneralStatus::Pending), 1);
    assert_eq!(snapshot.count(GeneralStatus::Unverified), 1);
    assert_eq!(snapshot.count(GeneralStatus::Verified), 0);
    assert_eq!(snapshot.overdue.len(), 1);
    assert_eq!(
        snapshot.overdue[0].internal_status,
        InternalStatus::AwaitingCodeIssuance
    );
    assert_eq!(snapshot.trend.last_7_days, 2);
}

#[test]
fn get_propagates_not_found() {
    let (service, _, _) = build_service();
    match service.get(&ApplicantId("inv-missing".to_string())) {
        Err(VerificationServiceError::Repository(
            crate::workflows::registry::repository::RepositoryError::NotFound,
        )) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn matching_again_requires_resubmitted_details() {
    let (service, _, _) = build_service();
    let applicant = service.register(registration(), now()).expect("registered");
    let id = applicant.id.clone();
    service.confirm_email(&id, now()).expect("email confirmed");
    service.record_opt_in(&id, true, now()).expect("opt in");
    service
        .submit_shareholding(&id, details(), now())
        .expect("details submitted");
    service
        .record_automated_match(&id, MatchResult::NoMatch, now())
        .expect("first failure");

    match service.record_automated_match(&id, MatchResult::Match, now()) {
        Err(VerificationServiceError::InvalidTransition { reason }) => {
            assert!(reason.contains("resubmission"));
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert_eq!(
        service.get(&id).expect("stored").internal_status(now()),
        InternalStatus::ResubmissionRequired
    );

    service
        .submit_shareholding(&id, details(), now())
        .expect("resubmitted");
    let matched = service
        .record_automated_match(&id, MatchResult::Match, now())
        .expect("match after resubmission");
    assert_eq!(
        matched.internal_status(now()),
        InternalStatus::AwaitingIroReview
    );
}

#[test]
fn undeliverable_invitation_keeps_single_registration() {
    let repository = Arc::new(MemoryRepository::default());
    let service = VerificationService::new(repository.clone(), Arc::new(FailingOutbox), policy());

    let applicant = service
        .register(registration(), now())
        .expect("registration survives email failure");

    let stored = repository.all().expect("list succeeds");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, applicant.id);
}

#[test]
fn undeliverable_code_leaves_record_untouched() {
    let repository = Arc::new(MemoryRepository::default());
    let service = VerificationService::new(repository.clone(), Arc::new(FailingOutbox), policy());
    let applicant = service.register(registration(), now()).expect("registered");
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
        .expect("review recorded");

    match service.issue_code(&id, now()) {
        Err(VerificationServiceError::Notification(_)) => {}
        other => panic!("expected notification failure, got {other:?}"),
    }

    let stored = repository
        .fetch(&id)
        .expect("fetch succeeds")
        .expect("applicant stored");
    assert_eq!(
        stored.verification.as_ref().expect("state").terminal,
        Terminal::Unresolved
    );
    assert_eq!(
        stored.internal_status(now()),
        InternalStatus::AwaitingCodeIssuance
    );
}

#[test]
fn register_skips_ids_taken_by_imported_records() {
    let (service, repository, _) = build_service();
    let first_id = service
        .register(registration(), now())
        .expect("registered")
        .id;
    let last: u64 = first_id
        .0
        .trim_start_matches("inv-")
        .parse()
        .expect("numeric id");

    let mut imported = Vec::new();
    for offset in 1..=25 {
        let mut seeded = service
            .get(&first_id)
            .expect("template applicant stored");
        seeded.id = ApplicantId(format!("inv-{:06}", last + offset));
        service.import(seeded.clone()).expect("seeded applicant stored");
        imported.push(seeded.id);
    }

    let fresh = service
        .register(registration(), now())
        .expect("registration after seeding");
    assert!(!imported.contains(&fresh.id));
    assert_eq!(repository.all().expect("list succeeds").len(), 27);
}
