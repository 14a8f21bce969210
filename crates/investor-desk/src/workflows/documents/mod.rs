//! Intake of supporting documents uploaded alongside a registration. Uploads are rendered as
//! markdown so reviewers can read them next to the applicant record.

mod markdown;
pub mod router;

pub use markdown::csv_to_markdown;
pub use router::documents_router;

use serde::Serialize;
use tracing::info;

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Csv,
    Pdf,
    Image,
}

impl DocumentKind {
    /// Detect the upload kind from its file name, falling back to the declared content type.
    pub fn detect(file_name: &str, content_type: &str) -> Option<Self> {
        let name = file_name.trim().to_ascii_lowercase();
        let content_type = content_type.trim().to_ascii_lowercase();

        if name.ends_with(".csv") || content_type.contains("csv") {
            Some(Self::Csv)
        } else if name.ends_with(".pdf") || content_type.contains("pdf") {
            Some(Self::Pdf)
        } else if [".png", ".jpg", ".jpeg"]
            .iter()
            .any(|extension| name.ends_with(extension))
            || matches!(
                content_type.as_str(),
                "image/png" | "image/jpeg" | "image/jpg"
            )
        {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Pdf => "PDF",
            Self::Image => "image",
        }
    }

    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
            Self::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_type: &'static str,
    pub file_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    pub markdown: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentParseError {
    #[error("file size exceeds the 10MB limit ({size} bytes uploaded)")]
    TooLarge { size: usize },
    #[error("only PNG, JPG, CSV, and PDF files are accepted")]
    Unsupported,
    #[error("{kind} conversion is not available; upload a CSV export instead")]
    ConversionUnavailable { kind: &'static str },
    #[error("CSV upload is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Convert an uploaded document to markdown. Only CSV uploads are converted; PDF and image
/// uploads are recognised and refused.
pub fn parse_document(
    file_name: &str,
    content_type: &str,
    content: &[u8],
) -> Result<ParsedDocument, DocumentParseError> {
    if content.len() > MAX_DOCUMENT_BYTES {
        return Err(DocumentParseError::TooLarge {
            size: content.len(),
        });
    }

    let kind =
        DocumentKind::detect(file_name, content_type).ok_or(DocumentParseError::Unsupported)?;
    let markdown = match kind {
        DocumentKind::Csv => csv_to_markdown(std::str::from_utf8(content)?)?,
        DocumentKind::Pdf | DocumentKind::Image => {
            return Err(DocumentParseError::ConversionUnavailable { kind: kind.label() })
        }
    };

    info!(
        file_name,
        file_type = kind.media_type(),
        size = content.len(),
        "document parsed"
    );

    Ok(ParsedDocument {
        markdown,
        metadata: DocumentMetadata {
            file_name: file_name.to_string(),
            file_type: kind.media_type(),
            file_size: content.len(),
        },
    })
}
