//! Registry export import (one CSV row per applicant).
//!
//! Verification timestamps are copied verbatim so that malformed values behave exactly as they
//! would when read back from the document store.

mod parser;

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::domain::{Applicant, ApplicantId, RegistrationStatus};
use crate::workflows::verification::domain::parse_instant;
use crate::workflows::verification::{
    AutomatedMatchStep, MatchResult, OneTimeCode, OptInStep, RecordedInstant, ReviewStep,
    ShareholdingSubmission, ShareholdingsVerificationState, Terminal,
};
use parser::{parse_flag, RegistryRow};

#[derive(Debug, thiserror::Error)]
pub enum ApplicantImportError {
    #[error("failed to read registry export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid registry CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidField {
        row: usize,
        column: &'static str,
        value: String,
    },
}

pub struct ApplicantCsvImporter;

impl ApplicantCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Applicant>, ApplicantImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Applicant>, ApplicantImportError> {
        parser::parse_rows(reader)?
            .into_iter()
            .enumerate()
            .map(|(index, row)| RowContext { row: index + 1 }.applicant(row))
            .collect()
    }
}

struct RowContext {
    row: usize,
}

impl RowContext {
    fn applicant(&self, row: RegistryRow) -> Result<Applicant, ApplicantImportError> {
        let registration_status = match row.registration_status.as_deref() {
            Some(raw) => RegistrationStatus::parse(raw)
                .ok_or_else(|| self.invalid("Registration Status", raw))?,
            None => RegistrationStatus::Pending,
        };
        let submitted_at = self.instant("Submitted At", &row.submitted_at)?;
        let last_activity_at = row
            .last_activity
            .as_deref()
            .map(|raw| self.instant("Last Activity", raw))
            .transpose()?;
        let verification = self.verification(&row)?;

        Ok(Applicant {
            id: ApplicantId(row.applicant_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            registration_status,
            submitted_at,
            last_activity_at,
            documents: Vec::new(),
            verification,
        })
    }

    fn verification(
        &self,
        row: &RegistryRow,
    ) -> Result<Option<ShareholdingsVerificationState>, ApplicantImportError> {
        let confirmed = match row.email_confirmed.as_deref() {
            Some(raw) => parse_flag(raw).ok_or_else(|| self.invalid("Email Confirmed", raw))?,
            None => false,
        };
        if !confirmed && !row.has_verification_data() {
            return Ok(None);
        }

        let step1 = row
            .wants_verification
            .as_deref()
            .map(|raw| {
                parse_flag(raw)
                    .map(|wants| OptInStep {
                        wants_verification: Some(wants),
                    })
                    .ok_or_else(|| self.invalid("Wants Verification", raw))
            })
            .transpose()?;

        if let (Some(company), None) = (&row.company, &row.shareholding_id) {
            return Err(self.invalid("Company", company));
        }
        if let (Some(reviewer), None) = (&row.reviewed_by, &row.review_result) {
            return Err(self.invalid("Reviewed By", reviewer));
        }

        let step2 = row
            .shareholding_id
            .as_ref()
            .map(|shareholding_id| ShareholdingSubmission {
                shareholding_id: shareholding_id.clone(),
                company_name: row.company.clone(),
                submitted_at: None,
            });

        let automated = self.match_result("Match Result", row.match_result.as_deref())?;
        let failed_attempts = match row.failed_attempts.as_deref() {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| self.invalid("Failed Attempts", raw))?,
            None => 0,
        };
        let step3 = if automated.is_some() || row.locked_until.is_some() || failed_attempts > 0 {
            Some(AutomatedMatchStep {
                last_result: automated,
                failed_attempts,
                locked_until: row.locked_until.clone().map(RecordedInstant),
            })
        } else {
            None
        };

        let review = self.match_result("Review Result", row.review_result.as_deref())?;
        let step4 = review.map(|result| ReviewStep {
            last_result: Some(result),
            reviewed_by: row.reviewed_by.clone(),
            reviewed_at: None,
        });

        Ok(Some(ShareholdingsVerificationState {
            step1,
            step2,
            step3,
            step4,
            terminal: self.terminal(row)?,
        }))
    }

    fn terminal(&self, row: &RegistryRow) -> Result<Terminal, ApplicantImportError> {
        if let Some(at) = &row.verified_at {
            return Ok(Terminal::Verified {
                at: RecordedInstant(at.clone()),
            });
        }

        let code_recorded = row.code_attempts_remaining.is_some()
            || row.code_expires_at.is_some()
            || row.code_invalidated_at.is_some();
        if !code_recorded {
            return Ok(Terminal::Unresolved);
        }

        let attempts_remaining = match row.code_attempts_remaining.as_deref() {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| self.invalid("Code Attempts Remaining", raw))?,
            None => 0,
        };

        Ok(Terminal::CodeIssued(OneTimeCode {
            code: String::new(),
            attempts_remaining,
            issued_at: None,
            expires_at: row.code_expires_at.clone().map(RecordedInstant),
            invalidated_at: row.code_invalidated_at.clone().map(RecordedInstant),
        }))
    }

    fn match_result(
        &self,
        column: &'static str,
        raw: Option<&str>,
    ) -> Result<Option<MatchResult>, ApplicantImportError> {
        raw.map(|value| MatchResult::parse(value).ok_or_else(|| self.invalid(column, value)))
            .transpose()
    }

    fn instant(&self, column: &'static str, raw: &str) -> Result<DateTime<Utc>, ApplicantImportError> {
        parse_instant(raw).ok_or_else(|| self.invalid(column, raw))
    }

    fn invalid(&self, column: &'static str, value: &str) -> ApplicantImportError {
        ApplicantImportError::InvalidField {
            row: self.row,
            column,
            value: value.to_string(),
        }
    }
}
