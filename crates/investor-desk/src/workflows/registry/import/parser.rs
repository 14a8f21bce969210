use serde::{Deserialize, Deserializer};
use std::io::Read;

/// One row of the registry export with every cell still raw.
#[derive(Debug, Deserialize)]
pub(crate) struct RegistryRow {
    #[serde(rename = "Applicant ID")]
    pub(crate) applicant_id: String,
    #[serde(rename = "Name")]
    pub(crate) name: String,
    #[serde(rename = "Email")]
    pub(crate) email: String,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    pub(crate) phone: Option<String>,
    #[serde(
        rename = "Registration Status",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) registration_status: Option<String>,
    #[serde(rename = "Submitted At")]
    pub(crate) submitted_at: String,
    #[serde(
        rename = "Last Activity",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) last_activity: Option<String>,
    #[serde(
        rename = "Email Confirmed",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) email_confirmed: Option<String>,
    #[serde(
        rename = "Wants Verification",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) wants_verification: Option<String>,
    #[serde(
        rename = "Shareholding ID",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) shareholding_id: Option<String>,
    #[serde(rename = "Company", default, deserialize_with = "empty_string_as_none")]
    pub(crate) company: Option<String>,
    #[serde(
        rename = "Match Result",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) match_result: Option<String>,
    #[serde(
        rename = "Failed Attempts",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) failed_attempts: Option<String>,
    #[serde(
        rename = "Locked Until",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) locked_until: Option<String>,
    #[serde(
        rename = "Review Result",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) review_result: Option<String>,
    #[serde(
        rename = "Reviewed By",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) reviewed_by: Option<String>,
    #[serde(
        rename = "Code Attempts Remaining",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) code_attempts_remaining: Option<String>,
    #[serde(
        rename = "Code Expires At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) code_expires_at: Option<String>,
    #[serde(
        rename = "Code Invalidated At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) code_invalidated_at: Option<String>,
    #[serde(
        rename = "Verified At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    pub(crate) verified_at: Option<String>,
}

impl RegistryRow {
    /// Whether any verification column carries data.
    pub(crate) fn has_verification_data(&self) -> bool {
        [
            &self.wants_verification,
            &self.shareholding_id,
            &self.company,
            &self.match_result,
            &self.failed_attempts,
            &self.locked_until,
            &self.review_result,
            &self.reviewed_by,
            &self.code_attempts_remaining,
            &self.code_expires_at,
            &self.code_invalidated_at,
            &self.verified_at,
        ]
        .iter()
        .any(|cell| cell.is_some())
    }
}

pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<RegistryRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader.deserialize::<RegistryRow>().collect()
}

pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
