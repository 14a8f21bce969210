use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Length of the lock applied after repeated failed automated matches.
pub const LOCKOUT_PERIOD_DAYS: i64 = 7;

pub fn lockout_period() -> Duration {
    Duration::days(LOCKOUT_PERIOD_DAYS)
}

/// Instant as persisted in the document store, kept verbatim so malformed values survive a
/// round trip and can be evaluated leniently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordedInstant(pub String);

impl RecordedInstant {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        parse_instant(&self.0)
    }

    /// An instant is reached once it is at or before `now`. Unparseable values are never reached.
    pub fn is_reached(&self, now: DateTime<Utc>) -> bool {
        self.parse().map(|at| at <= now).unwrap_or(false)
    }
}

impl From<DateTime<Utc>> for RecordedInstant {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

pub(crate) fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Outcome of a shareholding cross-reference, automated or manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchResult {
    Match,
    NoMatch,
}

impl MatchResult {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::NoMatch => "NO_MATCH",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "MATCH" => Some(Self::Match),
            "NO_MATCH" | "NOMATCH" => Some(Self::NoMatch),
            _ => None,
        }
    }
}

/// Verification progress recorded for a single applicant.
///
/// Each step is only recorded once the preceding step allowed it, so the fields describe a
/// progression rather than independent flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareholdingsVerificationState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step1: Option<OptInStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step2: Option<ShareholdingSubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step3: Option<AutomatedMatchStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step4: Option<ReviewStep>,
    #[serde(default)]
    pub terminal: Terminal,
}

impl ShareholdingsVerificationState {
    pub fn wants_verification(&self) -> Option<bool> {
        self.step1.as_ref().and_then(|step| step.wants_verification)
    }

    /// Shareholding details count as submitted when step 2 exists or any later step was recorded.
    pub fn shareholding_submitted(&self) -> bool {
        self.step2.is_some() || self.step3.is_some() || self.step4.is_some()
    }

    /// End of the active lock, if the automated match step is currently locked at `now`.
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.step3.as_ref().and_then(|step| step.active_lock(now))
    }

    pub fn automated_result(&self) -> Option<MatchResult> {
        self.step3.as_ref().and_then(|step| step.last_result)
    }

    pub fn review_result(&self) -> Option<MatchResult> {
        self.step4.as_ref().and_then(|step| step.last_result)
    }
}

/// Step 1: the applicant opted in to, or out of, shareholding verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptInStep {
    #[serde(default)]
    pub wants_verification: Option<bool>,
}

/// Step 2: shareholding identifier and company information supplied by the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareholdingSubmission {
    pub shareholding_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<RecordedInstant>,
}

/// Step 3: automated registry match plus the lock applied after repeated failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatedMatchStep {
    #[serde(default)]
    pub last_result: Option<MatchResult>,
    #[serde(default)]
    pub failed_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<RecordedInstant>,
}

impl AutomatedMatchStep {
    /// The lock holds while `locked_until` lies strictly after `now`; unparseable values never lock.
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.locked_until
            .as_ref()
            .and_then(RecordedInstant::parse)
            .filter(|until| *until > now)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.active_lock(now).is_some()
    }
}

/// Step 4: manual decision by an investor relations officer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStep {
    #[serde(default)]
    pub last_result: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<RecordedInstant>,
}

/// Final gate after a successful review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terminal {
    #[default]
    Unresolved,
    CodeIssued(OneTimeCode),
    Verified { at: RecordedInstant },
}

/// One-time confirmation code sent to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTimeCode {
    #[serde(default)]
    pub code: String,
    pub attempts_remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<RecordedInstant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<RecordedInstant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<RecordedInstant>,
}

impl OneTimeCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .as_ref()
            .map(|at| at.is_reached(now))
            .unwrap_or(false)
    }

    pub fn is_invalidated(&self, now: DateTime<Utc>) -> bool {
        self.invalidated_at
            .as_ref()
            .map(|at| at.is_reached(now))
            .unwrap_or(false)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.attempts_remaining > 0 && !self.is_expired(now) && !self.is_invalidated(now)
    }
}
